use voxcast_core::{CoarseCombine, GridConfig, TrackedLight, VoxcastError};

use crate::backend::CascadeBackend;
use crate::publish::GiGlobals;
use crate::resources::CascadeResources;
use crate::trace::trace;
use crate::voxelize::voxelize;

/// What one refresh did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshOutcome {
    /// The configuration is inactive; no GPU work was issued and any
    /// previous publication was withdrawn.
    Idle,
    Rebuilt {
        globals: GiGlobals,
        /// Whether the volumes were (re)allocated for this refresh.
        reallocated: bool,
    },
}

impl RefreshOutcome {
    pub fn globals(&self) -> Option<&GiGlobals> {
        match self {
            RefreshOutcome::Idle => None,
            RefreshOutcome::Rebuilt { globals, .. } => Some(globals),
        }
    }
}

/// Run one full refresh: ensure volumes, voxelize, trace, publish.
///
/// Consumers only see the publication made at the end, after both stages
/// have been submitted. Any refresh that does not get that far, idle or
/// failed, retracts the previous publication: its volumes may already be
/// gone.
pub fn refresh<B: CascadeBackend>(
    backend: &mut B,
    resources: &mut CascadeResources<B::Volume>,
    config: &GridConfig,
    combine: CoarseCombine,
    light: &TrackedLight,
) -> Result<RefreshOutcome, VoxcastError> {
    let outcome = rebuild(backend, resources, config, combine, light);
    if !matches!(outcome, Ok(RefreshOutcome::Rebuilt { .. })) {
        backend.retract();
    }
    outcome
}

fn rebuild<B: CascadeBackend>(
    backend: &mut B,
    resources: &mut CascadeResources<B::Volume>,
    config: &GridConfig,
    combine: CoarseCombine,
    light: &TrackedLight,
) -> Result<RefreshOutcome, VoxcastError> {
    let Some(parts) = resources.ensure_parts(backend, config)? else {
        return Ok(RefreshOutcome::Idle);
    };
    let volumes = parts.volumes;

    let world_to_voxel = voxelize(backend, config, light, parts.projection, &volumes.geometry)?;
    trace(backend, config, combine, &volumes.geometry, &volumes.light);

    let globals = GiGlobals::new(config, world_to_voxel);
    backend.publish(&globals, &volumes.light);
    log::debug!(
        "Refreshed {} cascades at {}^3 (reallocated: {})",
        config.cascade_count,
        config.resolution,
        parts.reallocated
    );

    Ok(RefreshOutcome::Rebuilt {
        globals,
        reallocated: parts.reallocated,
    })
}
