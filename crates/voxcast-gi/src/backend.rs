//! The seam between cascade orchestration and the GPU.
//!
//! Orchestration (`voxelize`, `trace`, `refresh`, `extract`) is written once
//! against `CascadeBackend`; `WgpuBackend` issues the real work.

use voxcast_core::{
    CoarseCombine, DispatchSize, GridConfig, ProjectionDevice, VolumeExtent, VoxcastError,
};

use crate::kernels::Kernel;
use crate::publish::GiGlobals;

/// Which of the two packed volumes a resource holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeRole {
    Geometry,
    Light,
}

impl VolumeRole {
    pub fn label(self) -> &'static str {
        match self {
            VolumeRole::Geometry => "geometry-volume",
            VolumeRole::Light => "light-volume",
        }
    }
}

/// Per-dispatch kernel parameters (32 bytes). Must match CascadeParams in
/// cascade_params.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CascadeParams {
    pub grid_resolution: u32,
    pub grid_half_resolution: u32,
    /// Slab base of the cascade being written (or read, for extraction).
    pub cascade_base: u32,
    /// Previous cascade's base for `RepackAndUpscale`, coarsest cascade's
    /// base for `Trace`, unused otherwise.
    pub cascade_base_aux: u32,
    pub cascade_count: u32,
    pub coarse_combine: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

impl CascadeParams {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            grid_resolution: config.resolution,
            grid_half_resolution: config.resolution / 2,
            cascade_base: 0,
            cascade_base_aux: 0,
            cascade_count: config.cascade_count,
            coarse_combine: CoarseCombine::default().shader_id(),
            _pad0: 0,
            _pad1: 0,
        }
    }

    pub fn with_bases(self, current: u32, aux: u32) -> Self {
        Self {
            cascade_base: current,
            cascade_base_aux: aux,
            ..self
        }
    }

    pub fn with_combine(self, combine: CoarseCombine) -> Self {
        Self {
            coarse_combine: combine.shader_id(),
            ..self
        }
    }
}

/// A kernel together with the resources it binds.
pub enum KernelBinding<'a, S, V> {
    Clear { scratch: &'a S },
    RepackLevel0 { scratch: &'a S, geometry: &'a V },
    RepackAndUpscale { scratch: &'a S, geometry: &'a V },
    Trace { geometry: &'a V, light: &'a V },
}

impl<S, V> KernelBinding<'_, S, V> {
    pub fn kernel(&self) -> Kernel {
        match self {
            KernelBinding::Clear { .. } => Kernel::Clear,
            KernelBinding::RepackLevel0 { .. } => Kernel::RepackLevel0,
            KernelBinding::RepackAndUpscale { .. } => Kernel::RepackAndUpscale,
            KernelBinding::Trace { .. } => Kernel::Trace,
        }
    }
}

/// GPU operations the cascade pipeline needs, issued in program order from
/// one thread.
///
/// `Volume` and `Scratch` release their GPU memory when dropped.
pub trait CascadeBackend {
    type Volume;
    type Scratch;

    /// Allocate one packed volume. Failure is fatal for the refresh.
    fn create_volume(
        &mut self,
        role: VolumeRole,
        extent: VolumeExtent,
    ) -> Result<Self::Volume, VoxcastError>;

    /// Allocate the scratch occupancy buffer and temporary raster target
    /// for one cascade.
    fn create_scratch(&mut self, resolution: u32) -> Result<Self::Scratch, VoxcastError>;

    fn dispatch(
        &mut self,
        binding: KernelBinding<'_, Self::Scratch, Self::Volume>,
        params: CascadeParams,
        size: DispatchSize,
    );

    /// Rasterize the culled scene through `device`, scattering hits into
    /// `scratch`.
    fn rasterize(&mut self, scratch: &Self::Scratch, device: &ProjectionDevice);

    /// Submit everything recorded so far.
    fn flush(&mut self);

    /// Run `DebugExtract` on `source` and block until the slab is on the
    /// host.
    fn extract(
        &mut self,
        source: &Self::Volume,
        params: CascadeParams,
        size: DispatchSize,
    ) -> Result<Vec<f32>, VoxcastError>;

    /// Hand a finished refresh to downstream consumers.
    fn publish(&mut self, globals: &GiGlobals, light: &Self::Volume);

    /// Withdraw the current publication.
    fn retract(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_params_size() {
        assert_eq!(std::mem::size_of::<CascadeParams>(), 32);
    }

    #[test]
    fn test_params_from_config() {
        let params = CascadeParams::new(&GridConfig::new(9, 3, 1.0)).with_bases(18, 9);
        assert_eq!(params.grid_resolution, 9);
        assert_eq!(params.grid_half_resolution, 4);
        assert_eq!(params.cascade_count, 3);
        assert_eq!((params.cascade_base, params.cascade_base_aux), (18, 9));
    }

    #[test]
    fn test_params_combine_selector() {
        let params = CascadeParams::new(&GridConfig::default()).with_combine(CoarseCombine::Replace);
        assert_eq!(params.coarse_combine, CoarseCombine::Replace.shader_id());
    }

    #[test]
    fn test_binding_kernels() {
        let scratch = 0u8;
        let volume = 1u8;
        let binding: KernelBinding<'_, u8, u8> = KernelBinding::Clear { scratch: &scratch };
        assert_eq!(binding.kernel(), Kernel::Clear);
        let binding: KernelBinding<'_, u8, u8> = KernelBinding::Trace {
            geometry: &volume,
            light: &volume,
        };
        assert_eq!(binding.kernel(), Kernel::Trace);
    }
}
