use glam::{Mat4, Quat, Vec3};

use crate::cascade::Cascade;
use crate::config::{CullingMask, GridConfig};

/// Position and orientation of the light the cascades are centred on.
///
/// Light-local space is right-handed with the light shining along local -Z,
/// so voxel Z grows toward the light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedLight {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for TrackedLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl TrackedLight {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// A light at `position` shining along `direction`. A zero direction
    /// falls back to shining along world -Z.
    pub fn looking_along(position: Vec3, direction: Vec3) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        Self {
            position,
            rotation: Quat::from_rotation_arc(Vec3::NEG_Z, direction),
        }
    }

    /// Direction the light shines in, world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// Orthographic viewpoint that drives geometry rasterization into voxel
/// space. Never used for display and never serialized with the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionDevice {
    light: TrackedLight,
    half_extent: f32,
    near: f32,
    far: f32,
    culling_mask: CullingMask,
}

impl Default for ProjectionDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionDevice {
    pub fn new() -> Self {
        Self {
            light: TrackedLight::default(),
            half_extent: 1.0,
            near: -1.0,
            far: 1.0,
            culling_mask: CullingMask::ALL,
        }
    }

    /// Copy position and rotation from the tracked light.
    pub fn track(&mut self, light: &TrackedLight) {
        self.light = *light;
    }

    /// Size the orthographic box: square half-extent with near/far clip
    /// planes symmetric around the device origin.
    pub fn set_box_extent(&mut self, half_extent: f32) {
        self.half_extent = half_extent;
        self.near = -half_extent;
        self.far = half_extent;
    }

    pub fn set_culling_mask(&mut self, mask: CullingMask) {
        self.culling_mask = mask;
    }

    pub fn culling_mask(&self) -> CullingMask {
        self.culling_mask
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    pub fn light(&self) -> &TrackedLight {
        &self.light
    }

    pub fn world_to_local(&self) -> Mat4 {
        self.light.local_to_world().inverse()
    }

    pub fn projection(&self) -> Mat4 {
        let h = self.half_extent;
        Mat4::orthographic_rh(-h, h, -h, h, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.world_to_local()
    }

    /// World space to the `[-1, 1]^3` box of the current extent.
    pub fn cascade_box(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(1.0 / self.half_extent)) * self.world_to_local()
    }

    /// World space to the `[-1, 1]^3` box of cascade 0, whatever extent the
    /// device currently holds.
    pub fn world_to_voxel(&self, config: &GridConfig) -> Mat4 {
        let size = config.base_half_extent();
        Mat4::from_scale(Vec3::splat(1.0 / size)) * self.world_to_local()
    }

    /// Voxel index space of `cascade` (voxel centres at `i + 0.5`) to world
    /// space.
    pub fn voxel_to_world(&self, config: &GridConfig, cascade: Cascade) -> Mat4 {
        self.light.local_to_world()
            * Mat4::from_scale(Vec3::splat(cascade.voxel_size(config)))
            * Mat4::from_translation(Vec3::splat(config.resolution as f32 * -0.5))
    }
}
