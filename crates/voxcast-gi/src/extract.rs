use voxcast_core::{Cascade, DispatchSize, GridConfig, VoxcastError};

use crate::backend::{CascadeBackend, CascadeParams};
use crate::kernels::Kernel;

/// Read one cascade slab of `volume` back to the host.
///
/// Returns `resolution^3` values, x fastest, then y, then z. Blocks until the
/// copy is complete. Out-of-range cascades clamp to the coarsest one; an
/// inactive configuration yields an empty vector.
pub fn extract<B: CascadeBackend>(
    backend: &mut B,
    config: &GridConfig,
    volume: &B::Volume,
    cascade: Cascade,
) -> Result<Vec<f32>, VoxcastError> {
    let Some(coarsest) = config.coarsest() else {
        return Ok(Vec::new());
    };
    if !config.is_active() {
        return Ok(Vec::new());
    }
    let cascade = Cascade(cascade.0.min(coarsest.0));

    let n = config.resolution;
    let params = CascadeParams::new(config).with_bases(cascade.slab_base(n), 0);
    let size = DispatchSize::cube(n, Kernel::DebugExtract.group_width());
    let values = backend.extract(volume, params, size)?;

    let expected = config.cells_per_cascade() as usize;
    if values.len() != expected {
        return Err(VoxcastError::ReadbackFailed(format!(
            "expected {expected} values, got {}",
            values.len()
        )));
    }
    Ok(values)
}

/// Linear index of voxel `(x, y, z)` in an extracted slab.
pub fn slab_index(resolution: u32, x: u32, y: u32, z: u32) -> usize {
    let n = resolution as usize;
    x as usize + y as usize * n + z as usize * n * n
}

/// Voxel coordinates of linear index `index` in an extracted slab.
pub fn slab_coords(resolution: u32, index: usize) -> [u32; 3] {
    let n = resolution as usize;
    [
        (index % n) as u32,
        ((index / n) % n) as u32,
        (index / (n * n)) as u32,
    ]
}

#[cfg(test)]
mod tests {
    use voxcast_core::VolumeExtent;

    use super::*;
    use crate::backend::VolumeRole;
    use crate::test_harness::{Event, RecordingBackend};

    #[test]
    fn test_extract_reads_requested_slab() {
        let mut backend = RecordingBackend::new();
        let config = GridConfig::new(4, 3, 1.0);
        let volume = backend
            .create_volume(VolumeRole::Light, VolumeExtent::for_grid(4, 3).unwrap())
            .unwrap();

        let values = extract(&mut backend, &config, &volume, Cascade(1)).unwrap();
        assert_eq!(values.len(), 64);
        assert!(backend.events().contains(&Event::Extract {
            role: VolumeRole::Light,
            cascade_base: 4,
        }));
    }

    #[test]
    fn test_extract_clamps_cascade() {
        let mut backend = RecordingBackend::new();
        let config = GridConfig::new(4, 2, 1.0);
        let volume = backend
            .create_volume(VolumeRole::Geometry, VolumeExtent::for_grid(4, 2).unwrap())
            .unwrap();

        extract(&mut backend, &config, &volume, Cascade(9)).unwrap();
        assert!(backend.events().contains(&Event::Extract {
            role: VolumeRole::Geometry,
            cascade_base: 4,
        }));
    }

    #[test]
    fn test_inactive_config_reads_nothing() {
        let mut backend = RecordingBackend::new();
        let volume = backend
            .create_volume(VolumeRole::Geometry, VolumeExtent::for_grid(4, 1).unwrap())
            .unwrap();
        let values = extract(&mut backend, &GridConfig::new(4, 0, 1.0), &volume, Cascade(0));
        assert!(values.unwrap().is_empty());
        assert_eq!(backend.count(|e| matches!(e, Event::Extract { .. })), 0);
    }

    #[test]
    fn test_slab_index_x_fastest() {
        assert_eq!(slab_index(4, 1, 0, 0), 1);
        assert_eq!(slab_index(4, 0, 1, 0), 4);
        assert_eq!(slab_index(4, 0, 0, 1), 16);
        assert_eq!(slab_coords(4, 16 + 8 + 3), [3, 2, 1]);
    }
}
