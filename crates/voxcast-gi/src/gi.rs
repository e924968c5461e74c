use glam::Vec3;
use voxcast_core::{
    Cascade, CoarseCombine, DebugSettings, GridConfig, TrackedLight, VoxcastError,
};

use crate::backend::VolumeRole;
use crate::extract::extract;
use crate::kernels::{KernelSet, KernelSources};
use crate::overlay::{build_overlay, Overlay};
use crate::publish::{PublishedGi, UniformPublisher};
use crate::raster::{GeometrySource, NoGeometry, VoxelizePass};
use crate::refresh::{refresh, RefreshOutcome};
use crate::resources::CascadeResources;
use crate::volumes::VolumeTexture;
use crate::wgpu_backend::WgpuBackend;

/// Cascaded voxel GI over one wgpu device.
///
/// Owns the compiled kernels, the voxelize pass, both volumes and the
/// consumer publication. The host calls `refresh` once per tick.
pub struct VoxelGi {
    kernels: KernelSet,
    voxelize_pass: VoxelizePass,
    resources: CascadeResources<VolumeTexture>,
    publisher: UniformPublisher,
    coarse_combine: CoarseCombine,
    /// Configuration of the last refresh that built the volumes.
    built_with: Option<GridConfig>,
}

impl VoxelGi {
    pub fn new(device: &wgpu::Device) -> Result<Self, VoxcastError> {
        Self::with_sources(device, &KernelSources::default())
    }

    /// Build with custom kernel bodies. Fails before any dispatch if a body
    /// is missing its entry point or does not compile.
    pub fn with_sources(
        device: &wgpu::Device,
        sources: &KernelSources,
    ) -> Result<Self, VoxcastError> {
        let kernels = KernelSet::new(device, sources)?;
        let voxelize_pass = VoxelizePass::new(device);
        let publisher = UniformPublisher::new(device);
        log::info!("Voxel GI ready");

        Ok(Self {
            kernels,
            voxelize_pass,
            resources: CascadeResources::new(),
            publisher,
            coarse_combine: CoarseCombine::default(),
            built_with: None,
        })
    }

    pub fn set_coarse_combine(&mut self, combine: CoarseCombine) {
        self.coarse_combine = combine;
    }

    pub fn coarse_combine(&self) -> CoarseCombine {
        self.coarse_combine
    }

    /// Rebuild both volumes for `light` and publish the result.
    pub fn refresh(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &dyn GeometrySource,
        config: &GridConfig,
        light: &TrackedLight,
    ) -> Result<RefreshOutcome, VoxcastError> {
        let mut backend = WgpuBackend::new(
            device,
            queue,
            &self.kernels,
            &self.voxelize_pass,
            scene,
            &mut self.publisher,
        );
        let outcome = refresh(
            &mut backend,
            &mut self.resources,
            config,
            self.coarse_combine,
            light,
        );
        drop(backend);

        self.built_with = match &outcome {
            Ok(RefreshOutcome::Rebuilt { .. }) => Some(*config),
            _ => None,
        };
        outcome
    }

    /// Read one cascade of one volume back to the host. Empty until a
    /// refresh has built the volumes.
    pub fn extract(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        role: VolumeRole,
        cascade: Cascade,
    ) -> Result<Vec<f32>, VoxcastError> {
        let (Some(config), Some(volumes)) = (self.built_with, self.resources.volumes()) else {
            return Ok(Vec::new());
        };
        let mut backend = WgpuBackend::new(
            device,
            queue,
            &self.kernels,
            &self.voxelize_pass,
            &NoGeometry,
            &mut self.publisher,
        );
        extract(&mut backend, &config, volumes.get(role), cascade)
    }

    /// Overlays for the volumes `debug` selects, at its clamped cascade.
    pub fn debug_overlay(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        debug: &DebugSettings,
        viewer: Vec3,
    ) -> Result<Vec<Overlay>, VoxcastError> {
        let Some(config) = self.built_with else {
            return Ok(Vec::new());
        };
        let Some(cascade) = debug.clamped_cascade(&config) else {
            return Ok(Vec::new());
        };
        let Some(gizmo) = self
            .resources
            .existing_projection_device()
            .map(|projection| projection.voxel_to_world(&config, cascade))
        else {
            return Ok(Vec::new());
        };

        let roles = [
            (debug.draw_geometry, VolumeRole::Geometry),
            (debug.draw_light, VolumeRole::Light),
        ];
        let mut overlays = Vec::new();
        for (enabled, role) in roles {
            if !enabled {
                continue;
            }
            let values = self.extract(device, queue, role, cascade)?;
            overlays.push(build_overlay(
                &values,
                config.resolution,
                role,
                gizmo,
                viewer,
            ));
        }
        Ok(overlays)
    }

    /// The last complete refresh, if the pipeline is active.
    pub fn published(&self) -> Option<&PublishedGi> {
        self.publisher.published()
    }

    /// Layout of `PublishedGi::bind_group`.
    pub fn consumer_layout(&self) -> &wgpu::BindGroupLayout {
        self.publisher.layout()
    }

    pub fn allocation_events(&self) -> u64 {
        self.resources.allocation_events()
    }
}
