use std::fs;
use std::path::{Component, Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use meshbake_core::{Texture, TextureKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AssetError;

/// Compression effort for re-encoded textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionQuality {
    #[default]
    Fast,
    Best,
}

/// What to do when a single texture cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFailurePolicy {
    /// Fail the whole conversion.
    #[default]
    Abort,
    /// Log a warning and continue with the remaining textures.
    Skip,
}

/// Flags handed to the encoder for one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureEncodeOptions {
    pub srgb: bool,
    pub normal_map: bool,
    pub quality: CompressionQuality,
}

impl TextureEncodeOptions {
    /// Derive flags from the material slot that first referenced the texture.
    /// Unreferenced textures are treated as color data.
    pub fn for_texture(texture: &Texture, quality: CompressionQuality) -> Self {
        Self {
            srgb: texture.kind.map_or(true, TextureKind::is_srgb),
            normal_map: texture.kind == Some(TextureKind::Normal),
            quality,
        }
    }
}

/// Place a texture inside `out_dir`. Names come from the source asset, so
/// anything other than a single plain file name is refused.
fn texture_path(out_dir: &Path, name: &str) -> Result<PathBuf, AssetError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(file)), None) => Ok(out_dir.join(file)),
        _ => Err(AssetError::TextureEncodeFailed(
            name.to_string(),
            "texture name must be a plain file name".into(),
        )),
    }
}

/// Writes one texture payload into an output directory.
pub trait TextureEncoder {
    /// Returns the path of the written file.
    fn encode(
        &self,
        texture: &Texture,
        options: &TextureEncodeOptions,
        out_dir: &Path,
    ) -> Result<PathBuf, AssetError>;
}

/// Writes the source bytes unchanged under the texture's name.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawTextureWriter;

impl TextureEncoder for RawTextureWriter {
    fn encode(
        &self,
        texture: &Texture,
        _options: &TextureEncodeOptions,
        out_dir: &Path,
    ) -> Result<PathBuf, AssetError> {
        let path = texture_path(out_dir, &texture.name)?;
        fs::write(&path, &texture.binary).map_err(|e| AssetError::Io(path.clone(), e))?;
        Ok(path)
    }
}

/// Decodes the payload and re-encodes it as RGBA8 PNG.
///
/// Normal maps are renormalized texel by texel. PNG has no color-space tag,
/// so the sRGB flag only shows up in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngTextureEncoder;

impl TextureEncoder for PngTextureEncoder {
    fn encode(
        &self,
        texture: &Texture,
        options: &TextureEncodeOptions,
        out_dir: &Path,
    ) -> Result<PathBuf, AssetError> {
        let path = texture_path(out_dir, &texture.name)?.with_extension("png");
        let failed = |e: image::ImageError| AssetError::TextureEncodeFailed(texture.name.clone(), e.to_string());

        let mut rgba = image::load_from_memory(&texture.binary).map_err(failed)?.to_rgba8();
        if options.normal_map {
            for pixel in rgba.pixels_mut() {
                renormalize(&mut pixel.0);
            }
        }

        let (width, height) = rgba.dimensions();
        let compression = match options.quality {
            CompressionQuality::Fast => CompressionType::Fast,
            CompressionQuality::Best => CompressionType::Best,
        };
        let mut encoded = Vec::new();
        PngEncoder::new_with_quality(&mut encoded, compression, FilterType::Adaptive)
            .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(failed)?;

        fs::write(&path, &encoded).map_err(|e| AssetError::Io(path.clone(), e))?;

        debug!(
            "Encoded '{}' {}x{} (srgb: {}, normal map: {}) -> {}",
            texture.name,
            width,
            height,
            options.srgb,
            options.normal_map,
            path.display()
        );
        Ok(path)
    }
}

/// Rescale an RGB-encoded unit vector back to length one. Alpha is untouched.
fn renormalize(texel: &mut [u8; 4]) {
    let decode = |c: u8| c as f32 / 255.0 * 2.0 - 1.0;
    let (x, y, z) = (decode(texel[0]), decode(texel[1]), decode(texel[2]));
    let length = (x * x + y * y + z * z).sqrt();
    if length <= f32::EPSILON {
        return;
    }
    let encode = |c: f32| (((c / length) + 1.0) * 0.5 * 255.0).round().clamp(0.0, 255.0) as u8;
    texel[0] = encode(x);
    texel[1] = encode(y);
    texel[2] = encode(z);
}

/// Result of writing a texture set.
#[derive(Debug, Default)]
pub struct TextureOutput {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

/// Write every texture through `encoder`. Textures are independent of each
/// other, so a skipped one never affects the rest.
pub fn write_textures(
    textures: &[Texture],
    encoder: &dyn TextureEncoder,
    out_dir: &Path,
    quality: CompressionQuality,
    policy: TextureFailurePolicy,
) -> Result<TextureOutput, AssetError> {
    let mut output = TextureOutput::default();
    if textures.is_empty() {
        return Ok(output);
    }

    fs::create_dir_all(out_dir).map_err(|e| AssetError::Io(out_dir.to_path_buf(), e))?;

    for texture in textures {
        let options = TextureEncodeOptions::for_texture(texture, quality);
        match encoder.encode(texture, &options, out_dir) {
            Ok(path) => output.written.push(path),
            Err(e) if policy == TextureFailurePolicy::Skip => {
                warn!("Skipping texture '{}': {}", texture.name, e);
                output.skipped.push(texture.name.clone());
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Wrote {} textures to {} ({} skipped)",
        output.written.len(),
        out_dir.display(),
        output.skipped.len()
    );
    Ok(output)
}
