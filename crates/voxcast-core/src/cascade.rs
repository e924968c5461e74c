use crate::config::GridConfig;

/// One level of the clipmap: same voxel count as every other level, twice the
/// linear footprint of the level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cascade(pub u32);

impl Cascade {
    /// Physical half-extent: `0.5 * resolution * voxel_pixel_size * 2^level`.
    pub fn half_extent(self, config: &GridConfig) -> f32 {
        0.5 * config.resolution as f32 * config.voxel_pixel_size * self.scale()
    }

    /// Linear scale relative to cascade 0.
    pub fn scale(self) -> f32 {
        2f32.powi(self.0 as i32)
    }

    /// World-space edge length of one voxel at this level.
    pub fn voxel_size(self, config: &GridConfig) -> f32 {
        config.voxel_pixel_size * self.scale()
    }

    /// Y offset of this cascade's slab inside a packed volume.
    pub fn slab_base(self, resolution: u32) -> u32 {
        self.0 * resolution
    }

    /// The finer cascade this one upsamples from, `None` for cascade 0.
    pub fn previous(self) -> Option<Cascade> {
        self.0.checked_sub(1).map(Cascade)
    }

    pub fn is_finest(self) -> bool {
        self.0 == 0
    }
}

/// Finer-cascade voxels the upscale kernel samples along one axis for the
/// coarser voxel `coarse`.
///
/// The finer cascade covers the central half of the coarser one. With an odd
/// resolution that footprint starts mid-voxel, so a sample can fall outside
/// the finer grid (`None`, counted as empty).
pub fn upscale_samples(coarse: u32, resolution: u32) -> [Option<u32>; 2] {
    let n = resolution as f32;
    std::array::from_fn(|d| {
        let p = (2.0 * coarse as f32 - n * 0.5 + 0.5 + d as f32).floor();
        (p >= 0.0 && p < n).then_some(p as u32)
    })
}

/// Dimensions of a packed multi-cascade volume: `cascade_count` slabs of
/// `resolution^3` voxels stacked along Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeExtent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl VolumeExtent {
    /// `None` when the stacked height does not fit in a `u32`.
    pub fn for_grid(resolution: u32, cascade_count: u32) -> Option<Self> {
        Some(Self {
            width: resolution,
            height: resolution.checked_mul(cascade_count)?,
            depth: resolution,
        })
    }

    pub fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }
}
