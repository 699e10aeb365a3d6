//! Meshbake - glTF to meshlet buffer converter
//!
//! Loads a glTF 2.0 asset, merges, optimizes and clusters its geometry, and
//! writes a single mesh record plus the referenced textures.

mod cli;
mod output;
mod settings;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use meshbake_assets::{write_textures, PngTextureEncoder, RawTextureWriter, TextureEncoder};
use meshbake_pipeline::MeshLayout;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use cli::Cli;
use settings::ToolSettings;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let mut settings = match &cli.config {
        Some(path) => ToolSettings::load_from(path)?,
        None => ToolSettings::load_default(),
    };
    cli.apply(&mut settings);

    if cli.print_config {
        print!("{}", settings.to_toml().context("Failed to serialize settings")?);
        return Ok(());
    }

    let (Some(input), Some(output)) = (cli.input.as_deref(), cli.output.as_deref()) else {
        anyhow::bail!("Both --input and --output are required");
    };

    run(&cli, &settings, input, output)
}

fn run(cli: &Cli, settings: &ToolSettings, input: &Path, output: &Path) -> Result<()> {
    info!("Converting {}", input.display());

    let conversion = meshbake_pipeline::convert_file(input, &settings.pipeline)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    let report = &conversion.report;
    if report.mismatched_submeshes > 0 {
        info!(
            "{} submeshes have meshlets in a different order than their index buffer",
            report.mismatched_submeshes
        );
    }

    // Everything that can fail runs before the mesh record is written, so an
    // aborted run never leaves a mesh file behind.
    let texture_dir = match &cli.texture_dir {
        Some(dir) => dir.clone(),
        None => output.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let encoder: &dyn TextureEncoder = if settings.textures.encode {
        &PngTextureEncoder
    } else {
        &RawTextureWriter
    };
    write_textures(
        &conversion.mesh.textures,
        encoder,
        &texture_dir,
        settings.textures.quality,
        settings.textures.on_failure,
    )
    .context("Failed to write textures")?;

    if let Some(path) = &cli.summary {
        output::write_summary(path, &conversion.layout)?;
    }

    output::write_mesh(output, &conversion.layout)?;
    if cli.verify {
        if let Err(e) = verify(output, &conversion.layout) {
            let _ = std::fs::remove_file(output);
            return Err(e);
        }
    }

    info!(
        "Done: {} -> {} ({} vertices, {} triangles, {} meshlets)",
        input.display(),
        output.display(),
        report.vertices_out,
        report.triangles,
        report.meshlets
    );
    Ok(())
}

/// Read the written record back and compare it with the in-memory layout.
fn verify(path: &Path, layout: &MeshLayout) -> Result<()> {
    let written = output::read_mesh(path)?;
    anyhow::ensure!(
        written == *layout,
        "Mesh file {} does not read back identically",
        path.display()
    );
    info!("Verified {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("meshbake-run-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// A .glb holding one triangle and one unreferenced embedded image.
    fn triangle_glb(image: &[u8]) -> Vec<u8> {
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            p.iter().for_each(|f| bin.extend_from_slice(&f.to_le_bytes()));
        }
        let image_offset = bin.len();
        bin.extend_from_slice(image);
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let json = format!(
            r#"{{
                "asset": {{"version": "2.0"}},
                "buffers": [{{"byteLength": {}}}],
                "bufferViews": [
                    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
                    {{"buffer": 0, "byteOffset": {}, "byteLength": {}}}
                ],
                "accessors": [
                    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0]}}
                ],
                "images": [{{"bufferView": 1, "mimeType": "image/png"}}],
                "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}}}]}}]
            }}"#,
            bin.len(),
            image_offset,
            image.len()
        );
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    fn parse(dir: &Path, extra: &[&str]) -> (Cli, PathBuf, PathBuf) {
        let input = dir.join("triangle.glb");
        let output = dir.join("out").join("triangle.mesh");
        let mut args = vec![
            "meshbake".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        args.extend(extra.iter().map(|a| a.to_string()));
        (Cli::try_parse_from(args).unwrap(), input, output)
    }

    #[test]
    fn test_texture_failure_leaves_no_mesh_file() {
        let dir = temp_dir("abort");
        let summary = dir.join("triangle.json");
        let (cli, input, output) = parse(&dir, &["--encode-textures", "--summary", summary.to_str().unwrap()]);
        fs::write(&input, triangle_glb(b"notapng!")).unwrap();
        let mut settings = ToolSettings::default();
        cli.apply(&mut settings);

        let err = run(&cli, &settings, &input, &output).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to write textures"));
        assert!(!output.exists());
        assert!(!summary.exists());
    }

    #[test]
    fn test_successful_run_writes_everything() {
        let dir = temp_dir("ok");
        let summary = dir.join("triangle.json");
        let (cli, input, output) = parse(
            &dir,
            &["--meshlets", "true", "--verify", "--summary", summary.to_str().unwrap()],
        );
        fs::write(&input, triangle_glb(b"notapng!")).unwrap();
        let mut settings = ToolSettings::default();
        cli.apply(&mut settings);

        run(&cli, &settings, &input, &output).unwrap();

        let layout = output::read_mesh(&output).unwrap();
        assert_eq!(layout.vertex_count(), 3);
        assert_eq!(layout.meshlet_count(), 1);
        assert_eq!(fs::read(dir.join("out").join("image0.png")).unwrap(), b"notapng!");
        assert!(summary.exists());
    }
}
