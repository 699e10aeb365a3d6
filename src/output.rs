//! Writing the converted mesh record and its JSON summary

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use meshbake_pipeline::MeshLayout;
use tracing::info;

/// Create the parent directory of `path` if needed
fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Serialize the layout fully in memory, then write it in one call so a
/// failed run never leaves a truncated file behind.
pub fn write_mesh(path: &Path, layout: &MeshLayout) -> Result<()> {
    let bytes = layout.to_bytes().context("Failed to serialize mesh record")?;
    ensure_parent(path)?;
    fs::write(path, &bytes).with_context(|| format!("Failed to write mesh file {}", path.display()))?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub fn read_mesh(path: &Path) -> Result<MeshLayout> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read mesh file {}", path.display()))?;
    MeshLayout::from_bytes(&bytes).with_context(|| format!("Failed to decode mesh file {}", path.display()))
}

pub fn write_summary(path: &Path, layout: &MeshLayout) -> Result<()> {
    let json = layout.summary_json().context("Failed to serialize summary")?;
    ensure_parent(path)?;
    fs::write(path, json).with_context(|| format!("Failed to write summary {}", path.display()))?;
    info!("Wrote summary to {}", path.display());
    Ok(())
}
