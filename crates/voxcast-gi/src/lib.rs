pub mod backend;
pub mod extract;
pub mod gi;
pub mod kernels;
pub mod overlay;
pub mod publish;
pub mod raster;
pub mod refresh;
pub mod resources;
pub mod trace;
pub mod volumes;
pub mod voxelize;
pub mod wgpu_backend;

#[cfg(test)]
mod test_harness;

pub use backend::{CascadeBackend, CascadeParams, KernelBinding, VolumeRole};
pub use gi::VoxelGi;
pub use kernels::{Kernel, KernelSet, KernelSources};
pub use overlay::{DebugVertex, Overlay, OverlayCube};
pub use publish::{GiGlobals, GiUniforms, PublishedGi, UniformPublisher};
pub use raster::{GeometrySource, MeshList, NoGeometry, VoxelMesh, VoxelizePass};
pub use refresh::RefreshOutcome;
pub use resources::{CascadeResources, CascadeVolumes, RefreshParts};
pub use volumes::{ScratchVolume, VolumeTexture};
pub use wgpu_backend::WgpuBackend;
