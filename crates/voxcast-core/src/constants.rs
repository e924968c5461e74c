//! Single source of truth for constants shared between Rust and WGSL.
//! The GPU crate injects these into every shader preamble.

/// Threads per workgroup along each spatial axis for the per-voxel kernels
/// (`RepackLevel0`, `RepackAndUpscale`, `Trace`, `DebugExtract`).
pub const GROUP_WIDTH: u32 = 4;

/// Threads per workgroup of the linear `Clear` kernel (4 × 4 × 4 flattened).
pub const CLEAR_GROUP_SIZE: u32 = GROUP_WIDTH * GROUP_WIDTH * GROUP_WIDTH;

/// Bytes per scratch occupancy cell (one u32).
pub const SCRATCH_CELL_BYTES: u64 = 4;

/// Bytes per volume texel (`R32Float`).
pub const VOLUME_TEXEL_BYTES: u64 = 4;

/// Occupancy value of an empty voxel.
pub const OCCUPANCY_EMPTY: f32 = 0.0;

/// Occupancy value of a fully covered voxel.
pub const OCCUPANCY_SOLID: f32 = 1.0;

/// Light value of a voxel with an unobstructed path to the light.
pub const LIGHT_UNOCCLUDED: f32 = 1.0;

/// WebGPU default for `max_compute_workgroups_per_dimension`.
pub const MAX_WORKGROUPS_PER_DIMENSION: u32 = 65535;
