//! Tool settings with TOML persistence
//!
//! The default file lives at `~/.config/meshbake/config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use meshbake_assets::{CompressionQuality, TextureFailurePolicy};
use meshbake_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub pipeline: PipelineConfig,
    pub textures: TextureSettings,
}

/// How textures are written next to the mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    /// Decode and re-encode as PNG instead of copying the source bytes
    pub encode: bool,
    pub quality: CompressionQuality,
    pub on_failure: TextureFailurePolicy,
}

impl ToolSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("meshbake"))
    }

    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load the default settings file, or return defaults if it is missing
    /// or unreadable
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load an explicit settings file. Any failure is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = Self::parse(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbake_pipeline::PartitionerKind;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = ToolSettings::parse(
            r#"
            [pipeline]
            meshlets = true

            [pipeline.meshlet]
            partitioner = "meshopt"
            max_triangles = 64

            [textures]
            on_failure = "skip"
            "#,
        )
        .unwrap();

        assert!(settings.pipeline.merge);
        assert!(settings.pipeline.optimize);
        assert!(settings.pipeline.meshlets);
        assert_eq!(settings.pipeline.meshlet.partitioner, PartitionerKind::Meshopt);
        assert_eq!(settings.pipeline.meshlet.max_triangles, 64);
        assert_eq!(settings.pipeline.meshlet.max_vertices, 64);
        assert!(!settings.textures.encode);
        assert_eq!(settings.textures.on_failure, TextureFailurePolicy::Skip);
        assert_eq!(settings.textures.quality, CompressionQuality::Fast);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ToolSettings::parse("").unwrap(), ToolSettings::default());
    }

    #[test]
    fn test_printed_settings_parse_back() {
        let mut settings = ToolSettings::default();
        settings.pipeline.meshlet.cone_weight = 0.25;
        settings.textures.quality = CompressionQuality::Best;
        let text = settings.to_toml().unwrap();
        assert_eq!(ToolSettings::parse(&text).unwrap(), settings);
    }

    #[test]
    fn test_unknown_enum_value_is_an_error() {
        let err = ToolSettings::parse("[pipeline.meshlet]\npartitioner = \"metis\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("meshbake-settings-missing").join("config.toml");
        assert!(ToolSettings::load_from(&path).is_err());
    }
}
