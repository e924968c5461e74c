use voxcast_core::constants::{SCRATCH_CELL_BYTES, VOLUME_TEXEL_BYTES};
use voxcast_core::{VolumeExtent, VoxcastError};

use crate::backend::VolumeRole;

/// Texel format of both packed volumes.
pub const VOLUME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Format of the per-cascade raster target. It is never written; it only
/// gives the voxelize pass a viewport.
pub const RASTER_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Byte size of the scratch occupancy buffer for `resolution^3` cells.
pub fn scratch_byte_size(resolution: u32) -> u64 {
    (resolution as u64).pow(3) * SCRATCH_CELL_BYTES
}

/// Reject a volume the device cannot hold before asking for it.
pub fn check_volume_limits(
    role: VolumeRole,
    extent: VolumeExtent,
    limits: &wgpu::Limits,
) -> Result<(), VoxcastError> {
    let max = limits.max_texture_dimension_3d;
    if extent.width > max || extent.height > max || extent.depth > max {
        return Err(VoxcastError::AllocationFailed {
            label: role.label().to_string(),
            reason: format!(
                "{}x{}x{} exceeds max 3D texture dimension {max}",
                extent.width, extent.height, extent.depth
            ),
        });
    }
    Ok(())
}

/// Reject a scratch buffer larger than one storage binding.
pub fn check_scratch_limits(resolution: u32, limits: &wgpu::Limits) -> Result<(), VoxcastError> {
    let size = scratch_byte_size(resolution);
    let max = limits.max_storage_buffer_binding_size as u64;
    if size > max || resolution > limits.max_texture_dimension_2d {
        return Err(VoxcastError::AllocationFailed {
            label: "cascade-scratch".to_string(),
            reason: format!("{size} bytes at resolution {resolution} exceeds device limits"),
        });
    }
    Ok(())
}

fn pop_allocation_scope(device: &wgpu::Device, label: &str) -> Result<(), VoxcastError> {
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(VoxcastError::AllocationFailed {
            label: label.to_string(),
            reason: err.to_string(),
        }),
        None => Ok(()),
    }
}

/// One packed volume: every cascade slab stacked along Y.
pub struct VolumeTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    role: VolumeRole,
    extent: VolumeExtent,
}

impl VolumeTexture {
    pub fn new(
        device: &wgpu::Device,
        role: VolumeRole,
        extent: VolumeExtent,
    ) -> Result<Self, VoxcastError> {
        check_volume_limits(role, extent, &device.limits())?;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(role.label()),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: extent.depth,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: VOLUME_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        pop_allocation_scope(device, role.label())?;

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!(
            "{}: {} KB",
            role.label(),
            extent.texel_count() * VOLUME_TEXEL_BYTES / 1024
        );

        Ok(Self {
            texture,
            view,
            role,
            extent,
        })
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn role(&self) -> VolumeRole {
        self.role
    }

    pub fn extent(&self) -> VolumeExtent {
        self.extent
    }
}

impl Drop for VolumeTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

/// Per-cascade scratch occupancy buffer and the raster target the voxelize
/// pass draws into. Destroyed when the cascade iteration ends.
pub struct ScratchVolume {
    buffer: wgpu::Buffer,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    resolution: u32,
}

impl ScratchVolume {
    pub fn new(device: &wgpu::Device, resolution: u32) -> Result<Self, VoxcastError> {
        check_scratch_limits(resolution, &device.limits())?;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cascade-scratch"),
            size: scratch_byte_size(resolution),
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cascade-raster-target"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RASTER_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        pop_allocation_scope(device, "cascade-scratch")?;

        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            buffer,
            target,
            target_view,
            resolution,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn target_view(&self) -> &wgpu::TextureView {
        &self.target_view
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

impl Drop for ScratchVolume {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.target.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_byte_size() {
        assert_eq!(scratch_byte_size(4), 256);
        assert_eq!(scratch_byte_size(64), 64 * 64 * 64 * 4);
    }

    #[test]
    fn test_volume_limit_rejects_tall_stack() {
        let limits = wgpu::Limits::downlevel_defaults();
        let max = limits.max_texture_dimension_3d;
        let ok = VolumeExtent::for_grid(max / 4, 4).unwrap();
        assert!(check_volume_limits(VolumeRole::Geometry, ok, &limits).is_ok());

        let too_tall = VolumeExtent::for_grid(max / 4, 5).unwrap();
        let err = check_volume_limits(VolumeRole::Light, too_tall, &limits).unwrap_err();
        match err {
            VoxcastError::AllocationFailed { label, .. } => assert_eq!(label, "light-volume"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scratch_limit() {
        let limits = wgpu::Limits::default();
        assert!(check_scratch_limits(64, &limits).is_ok());
        assert!(check_scratch_limits(1024, &limits).is_err());
    }
}
