use voxcast_core::{CoarseCombine, DispatchSize, GridConfig};

use crate::backend::{CascadeBackend, CascadeParams, KernelBinding};
use crate::kernels::Kernel;

/// Fill every cascade slab of the light volume from the geometry volume.
///
/// Each cascade reads its own geometry slab plus the coarsest slab, so the
/// geometry volume must be complete before this runs. All dispatches go out
/// in a single submission.
pub fn trace<B: CascadeBackend>(
    backend: &mut B,
    config: &GridConfig,
    combine: CoarseCombine,
    geometry: &B::Volume,
    light: &B::Volume,
) {
    let Some(coarsest) = config.coarsest() else {
        return;
    };

    let n = config.resolution;
    let params = CascadeParams::new(config).with_combine(combine);
    let size = DispatchSize::cube(n, Kernel::Trace.group_width());
    let coarsest_base = coarsest.slab_base(n);

    for cascade in config.cascades() {
        backend.dispatch(
            KernelBinding::Trace { geometry, light },
            params.with_bases(cascade.slab_base(n), coarsest_base),
            size,
        );
    }
    backend.flush();
}

#[cfg(test)]
mod tests {
    use voxcast_core::VolumeExtent;

    use super::*;
    use crate::backend::VolumeRole;
    use crate::test_harness::{Event, RecordingBackend};

    fn traced(config: &GridConfig, combine: CoarseCombine) -> RecordingBackend {
        let mut backend = RecordingBackend::new();
        let extent =
            VolumeExtent::for_grid(config.resolution.max(1), config.cascade_count.max(1)).unwrap();
        let geometry = backend.create_volume(VolumeRole::Geometry, extent).unwrap();
        let light = backend.create_volume(VolumeRole::Light, extent).unwrap();
        backend.clear();
        trace(&mut backend, config, combine, &geometry, &light);
        std::mem::forget((geometry, light));
        backend
    }

    #[test]
    fn test_every_cascade_reads_coarsest() {
        let config = GridConfig::new(8, 3, 1.0);
        let backend = traced(&config, CoarseCombine::Multiply);

        let bases: Vec<(u32, u32)> = backend
            .dispatches()
            .into_iter()
            .map(|(kernel, params, _)| {
                assert_eq!(kernel, Kernel::Trace);
                (params.cascade_base, params.cascade_base_aux)
            })
            .collect();
        assert_eq!(bases, vec![(0, 16), (8, 16), (16, 16)]);
    }

    #[test]
    fn test_single_submission_after_dispatches() {
        let config = GridConfig::new(4, 4, 1.0);
        let backend = traced(&config, CoarseCombine::Multiply);
        let events = backend.events();
        assert_eq!(events.len(), 5);
        assert_eq!(events.last(), Some(&Event::Flush));
        assert_eq!(backend.count(|e| *e == Event::Flush), 1);
    }

    #[test]
    fn test_combine_policy_reaches_kernel() {
        let config = GridConfig::new(4, 2, 1.0);
        let backend = traced(&config, CoarseCombine::Max);
        for (_, params, _) in backend.dispatches() {
            assert_eq!(params.coarse_combine, CoarseCombine::Max.shader_id());
        }
    }

    #[test]
    fn test_zero_cascades_skips_trace() {
        let config = GridConfig::new(4, 0, 1.0);
        let backend = traced(&config, CoarseCombine::Multiply);
        assert!(backend.events().is_empty());
    }
}
