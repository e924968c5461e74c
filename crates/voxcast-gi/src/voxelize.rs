use glam::Mat4;
use voxcast_core::{DispatchSize, GridConfig, ProjectionDevice, TrackedLight, VoxcastError};

use crate::backend::{CascadeBackend, CascadeParams, KernelBinding};
use crate::kernels::Kernel;

/// Rebuild every cascade slab of the geometry volume and return the
/// world-to-voxel transform for the refresh.
///
/// Cascades are built finest first: `RepackAndUpscale` for cascade `i` reads
/// the slab written for `i - 1`. Each iteration owns its scratch buffer and
/// raster target, which are released when the iteration ends.
pub fn voxelize<B: CascadeBackend>(
    backend: &mut B,
    config: &GridConfig,
    light: &TrackedLight,
    projection: &mut ProjectionDevice,
    geometry: &B::Volume,
) -> Result<Mat4, VoxcastError> {
    projection.set_culling_mask(config.culling_mask);
    projection.track(light);

    let n = config.resolution;
    let base_params = CascadeParams::new(config);
    let clear_size = DispatchSize::linear(config.cells_per_cascade(), Kernel::Clear.group_width());
    let slab_size = DispatchSize::cube(n, Kernel::RepackLevel0.group_width());

    for cascade in config.cascades() {
        projection.set_box_extent(cascade.half_extent(config));

        let scratch = backend.create_scratch(n)?;
        backend.dispatch(
            KernelBinding::Clear { scratch: &scratch },
            base_params,
            clear_size,
        );

        backend.rasterize(&scratch, projection);

        match cascade.previous() {
            None => backend.dispatch(
                KernelBinding::RepackLevel0 {
                    scratch: &scratch,
                    geometry,
                },
                base_params.with_bases(cascade.slab_base(n), 0),
                slab_size,
            ),
            Some(previous) => backend.dispatch(
                KernelBinding::RepackAndUpscale {
                    scratch: &scratch,
                    geometry,
                },
                base_params.with_bases(cascade.slab_base(n), previous.slab_base(n)),
                slab_size,
            ),
        }

        // The scratch buffer is destroyed on drop; its commands go out first.
        backend.flush();
    }

    Ok(projection.world_to_voxel(config))
}
