use std::path::PathBuf;

use clap::{ArgAction, Parser};
use meshbake_assets::TextureFailurePolicy;
use meshbake_pipeline::PartitionerKind;
use tracing::Level;

use crate::settings::ToolSettings;

#[derive(Parser, Debug)]
#[command(name = "meshbake", version, about = "Convert glTF meshes into GPU-ready meshlet buffers")]
pub struct Cli {
    /// Source .gltf or .glb file
    #[arg(short, long, required_unless_present = "print_config")]
    pub input: Option<PathBuf>,

    /// Destination mesh file
    #[arg(short, long, required_unless_present = "print_config")]
    pub output: Option<PathBuf>,

    /// Directory for texture files (defaults to the output file's directory)
    #[arg(long)]
    pub texture_dir: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Merge submeshes that share a material
    #[arg(long)]
    pub merge: Option<bool>,

    /// Deduplicate and reorder vertices and triangles
    #[arg(long)]
    pub optimize: Option<bool>,

    /// Build meshlets
    #[arg(long)]
    pub meshlets: Option<bool>,

    /// Cluster partitioning algorithm
    #[arg(long, value_enum)]
    pub partitioner: Option<Partitioner>,

    /// Re-encode textures as PNG instead of copying them
    #[arg(long)]
    pub encode_textures: bool,

    /// Warn about textures that fail to write instead of aborting
    #[arg(long)]
    pub skip_failed_textures: bool,

    /// Fail when meshlets do not reproduce the index buffer
    #[arg(long)]
    pub strict: bool,

    /// Also write a JSON summary of the layout
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Read the written mesh file back and compare it with what was written
    #[arg(long)]
    pub verify: bool,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(long)]
    pub quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Partitioner {
    Scan,
    Meshopt,
}

impl From<Partitioner> for PartitionerKind {
    fn from(partitioner: Partitioner) -> Self {
        match partitioner {
            Partitioner::Scan => PartitionerKind::Scan,
            Partitioner::Meshopt => PartitionerKind::Meshopt,
        }
    }
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            return Level::WARN;
        }
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Command-line flags take precedence over the settings file.
    pub fn apply(&self, settings: &mut ToolSettings) {
        let pipeline = &mut settings.pipeline;
        if let Some(merge) = self.merge {
            pipeline.merge = merge;
        }
        if let Some(optimize) = self.optimize {
            pipeline.optimize = optimize;
        }
        if let Some(meshlets) = self.meshlets {
            pipeline.meshlets = meshlets;
        }
        if let Some(partitioner) = self.partitioner {
            pipeline.meshlet.partitioner = partitioner.into();
        }
        if self.strict {
            pipeline.meshlet.strict_index_check = true;
        }
        if self.encode_textures {
            settings.textures.encode = true;
        }
        if self.skip_failed_textures {
            settings.textures.on_failure = TextureFailurePolicy::Skip;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("meshbake").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = parse(&[
            "-i",
            "scene.glb",
            "-o",
            "scene.mesh",
            "--merge",
            "false",
            "--meshlets",
            "true",
            "--partitioner",
            "meshopt",
            "--strict",
            "--skip-failed-textures",
        ]);
        let mut settings = ToolSettings::default();
        cli.apply(&mut settings);

        assert!(!settings.pipeline.merge);
        assert!(settings.pipeline.optimize);
        assert!(settings.pipeline.meshlets);
        assert_eq!(settings.pipeline.meshlet.partitioner, PartitionerKind::Meshopt);
        assert!(settings.pipeline.meshlet.strict_index_check);
        assert_eq!(settings.textures.on_failure, TextureFailurePolicy::Skip);
        assert!(!settings.textures.encode);
    }

    #[test]
    fn test_absent_flags_keep_file_values() {
        let cli = parse(&["-i", "a.gltf", "-o", "a.mesh"]);
        let mut settings = ToolSettings::default();
        settings.pipeline.optimize = false;
        settings.textures.encode = true;
        cli.apply(&mut settings);
        assert!(!settings.pipeline.optimize);
        assert!(settings.textures.encode);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(parse(&["-i", "a", "-o", "b"]).log_level(), Level::INFO);
        assert_eq!(parse(&["-i", "a", "-o", "b", "-v"]).log_level(), Level::DEBUG);
        assert_eq!(parse(&["-i", "a", "-o", "b", "-vv"]).log_level(), Level::TRACE);
        assert_eq!(parse(&["-i", "a", "-o", "b", "--quiet"]).log_level(), Level::WARN);
    }

    #[test]
    fn test_input_and_output_are_required() {
        assert!(Cli::try_parse_from(["meshbake", "-i", "a.glb"]).is_err());
        assert!(Cli::try_parse_from(["meshbake", "--print-config"]).is_ok());
    }
}
