use std::path::Path;

use meshbake_core::{Mesh, MeshError};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::layout::MeshLayout;
use crate::meshlet::build_meshlets;
use crate::merge::merge_submeshes;
use crate::optimize::optimize_submeshes;

/// Counters gathered while processing one mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub submeshes_in: usize,
    pub submeshes_out: usize,
    pub vertices_in: usize,
    pub vertices_out: usize,
    pub triangles: usize,
    pub meshlets: usize,
    /// Submeshes whose meshlets do not reproduce the index buffer.
    pub mismatched_submeshes: usize,
}

/// Run the enabled stages in order: merge, optimize, meshlets.
///
/// Mesh bounds are recomputed afterwards since merging and deduplication
/// change the vertex set the bounds were taken over.
pub fn process(mesh: &mut Mesh, config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    let mut report = PipelineReport {
        submeshes_in: mesh.submeshes.len(),
        vertices_in: mesh.vertex_count(),
        ..Default::default()
    };

    if config.merge {
        let count = merge_submeshes(&mut mesh.submeshes);
        if count == 0 {
            return Err(PipelineError::EmptyMerge);
        }
        info!("Merged {} submeshes into {}", report.submeshes_in, count);
    } else if mesh.submeshes.is_empty() {
        return Err(PipelineError::EmptyMesh);
    }

    if config.optimize {
        optimize_submeshes(&mut mesh.submeshes);
    }

    if config.meshlets {
        config.meshlet.validate()?;
        let limits = config.meshlet.limits();
        let partitioner = config.meshlet.partitioner();
        for (i, submesh) in mesh.submeshes.iter_mut().enumerate() {
            let stats = build_meshlets(
                submesh,
                i,
                partitioner.as_ref(),
                &limits,
                config.meshlet.strict_index_check,
            )?;
            report.meshlets += stats.meshlets;
            if stats.index_mismatches > 0 {
                report.mismatched_submeshes += 1;
            }
        }
        info!(
            "Built {} meshlets (max {} vertices, {} triangles)",
            report.meshlets, limits.max_vertices, limits.max_triangles
        );
    }

    mesh.update_bounds().map_err(MeshError::from)?;

    report.submeshes_out = mesh.submeshes.len();
    report.vertices_out = mesh.vertex_count();
    report.triangles = mesh.triangle_count();
    Ok(report)
}

/// A loaded, processed and flattened asset.
#[derive(Debug)]
pub struct Conversion {
    pub mesh: Mesh,
    pub layout: MeshLayout,
    pub report: PipelineReport,
}

/// Load a glTF file and take it through every enabled stage.
pub fn convert_file(path: &Path, config: &PipelineConfig) -> Result<Conversion, PipelineError> {
    let mut mesh = meshbake_assets::load_gltf(path)?;
    let report = process(&mut mesh, config)?;
    let layout = MeshLayout::assemble(&mesh)?;
    info!(
        "Converted {}: {} submeshes, {} vertices, {} triangles, {} meshlets",
        path.display(),
        report.submeshes_out,
        report.vertices_out,
        report.triangles,
        report.meshlets
    );
    Ok(Conversion { mesh, layout, report })
}
