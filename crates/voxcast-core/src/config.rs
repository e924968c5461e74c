use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cascade::{Cascade, VolumeExtent};
use crate::encoding::CoarseCombine;
use crate::error::VoxcastError;

/// Bitmask of scene layers the voxelization pass rasterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CullingMask(pub u32);

impl CullingMask {
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// No layer; the scratch buffer stays empty.
    pub const NONE: Self = Self(0);

    /// Mask with only `layer` set. Layers above 31 map to an empty mask.
    pub fn layer(layer: u32) -> Self {
        Self(1u32.checked_shl(layer).unwrap_or(0))
    }

    /// Whether geometry tagged with `layers` passes this mask.
    pub fn accepts(self, layers: u32) -> bool {
        self.0 & layers != 0
    }
}

impl Default for CullingMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Grid parameters for one refresh.
///
/// `resolution` and `cascade_count` fix the texture footprint; changing either
/// invalidates the existing volumes. Zero in either field makes the whole
/// pipeline idle for the refresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Voxels per cascade along each axis.
    pub resolution: u32,
    /// Number of cascades, each doubling the linear footprint of the previous.
    pub cascade_count: u32,
    /// World-space edge length of one cascade-0 voxel.
    pub voxel_pixel_size: f32,
    pub culling_mask: CullingMask,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            cascade_count: 4,
            voxel_pixel_size: 0.25,
            culling_mask: CullingMask::ALL,
        }
    }
}

impl GridConfig {
    pub fn new(resolution: u32, cascade_count: u32, voxel_pixel_size: f32) -> Self {
        Self {
            resolution,
            cascade_count,
            voxel_pixel_size,
            culling_mask: CullingMask::ALL,
        }
    }

    /// Whether this configuration describes any work at all.
    pub fn is_active(&self) -> bool {
        self.resolution > 0
            && self.cascade_count > 0
            && self.voxel_pixel_size.is_finite()
            && self.voxel_pixel_size > 0.0
    }

    /// Texture footprint shared by the geometry and light volumes, or `None`
    /// when the configuration is inactive.
    ///
    /// A footprint too large to describe is an allocation failure.
    pub fn volume_extent(&self) -> Result<Option<VolumeExtent>, VoxcastError> {
        if !self.is_active() {
            return Ok(None);
        }
        VolumeExtent::for_grid(self.resolution, self.cascade_count)
            .map(Some)
            .ok_or_else(|| VoxcastError::AllocationFailed {
                label: "cascade volumes".into(),
                reason: format!(
                    "{} cascades of {}^3 overflow the volume height",
                    self.cascade_count, self.resolution
                ),
            })
    }

    /// Cascades in the order they must be built (finest first).
    pub fn cascades(&self) -> impl Iterator<Item = Cascade> {
        (0..self.cascade_count).map(Cascade)
    }

    /// Coarsest cascade, `None` when there are no cascades.
    pub fn coarsest(&self) -> Option<Cascade> {
        self.cascade_count.checked_sub(1).map(Cascade)
    }

    /// Physical half-extent of cascade 0.
    pub fn base_half_extent(&self) -> f32 {
        Cascade(0).half_extent(self)
    }

    /// Number of scratch cells (one per voxel of a single cascade).
    pub fn cells_per_cascade(&self) -> u64 {
        let n = self.resolution as u64;
        n * n * n
    }
}

/// Which volume the debug overlay shows and at what cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub draw_geometry: bool,
    pub draw_light: bool,
    /// Requested cascade; clamped into range before use.
    pub draw_cascade: i32,
}

impl DebugSettings {
    /// The requested cascade clamped to `[0, cascade_count - 1]`.
    pub fn clamped_cascade(&self, grid: &GridConfig) -> Option<Cascade> {
        let coarsest = grid.coarsest()?;
        let index = self.draw_cascade.clamp(0, coarsest.0 as i32);
        Some(Cascade(index as u32))
    }
}

/// Everything the host configures, loadable from RON.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GiSettings {
    pub grid: GridConfig,
    pub coarse_combine: CoarseCombine,
    pub debug: DebugSettings,
}

impl GiSettings {
    /// Parse settings from a RON string. Missing fields take their defaults.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, VoxcastError> {
        let options = ron::Options::default();
        options
            .from_str(ron_str)
            .map_err(|e| VoxcastError::ConfigParse(e.to_string()))
    }

    /// Read and parse a RON settings file.
    pub fn load(path: &Path) -> Result<Self, VoxcastError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VoxcastError::ConfigIo(format!("{}: {e}", path.display())))?;
        Self::from_ron_str(&contents)
    }

    /// Serialize to pretty RON, e.g. to write out a starting file.
    pub fn to_ron_string(&self) -> Result<String, VoxcastError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| VoxcastError::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_resolution_is_inactive() {
        assert!(!GridConfig::new(0, 3, 1.0).is_active());
        assert!(GridConfig::new(0, 3, 1.0).volume_extent().unwrap().is_none());
    }

    #[test]
    fn test_oversized_grid_is_allocation_failure() {
        let err = GridConfig::new(1 << 16, 1 << 16, 1.0)
            .volume_extent()
            .unwrap_err();
        assert!(matches!(err, VoxcastError::AllocationFailed { .. }));
    }

    #[test]
    fn test_oversized_grid_from_ron_fails() {
        let settings =
            GiSettings::from_ron_str("(grid: (resolution: 65536, cascade_count: 65536))").unwrap();
        assert!(settings.grid.volume_extent().is_err());
    }

    #[test]
    fn test_zero_cascades_is_inactive() {
        let config = GridConfig::new(8, 0, 1.0);
        assert!(!config.is_active());
        assert_eq!(config.cascades().count(), 0);
        assert!(config.coarsest().is_none());
    }

    #[test]
    fn test_non_positive_pixel_size_is_inactive() {
        assert!(!GridConfig::new(8, 2, 0.0).is_active());
        assert!(!GridConfig::new(8, 2, -1.0).is_active());
        assert!(!GridConfig::new(8, 2, f32::NAN).is_active());
    }

    #[test]
    fn test_cascades_ascend_from_finest() {
        let config = GridConfig::new(8, 3, 1.0);
        let levels: Vec<u32> = config.cascades().map(|c| c.0).collect();
        assert_eq!(levels, vec![0, 1, 2]);
        assert_eq!(config.coarsest(), Some(Cascade(2)));
    }

    #[test]
    fn test_cells_per_cascade() {
        assert_eq!(GridConfig::new(8, 3, 1.0).cells_per_cascade(), 512);
    }

    #[test]
    fn test_culling_mask_layers() {
        let mask = CullingMask::layer(3);
        assert_eq!(mask.0, 0b1000);
        assert!(mask.accepts(0b1010));
        assert!(!mask.accepts(0b0101));
        assert!(CullingMask::ALL.accepts(1 << 31));
        assert!(!CullingMask::NONE.accepts(u32::MAX));
        assert_eq!(CullingMask::layer(40), CullingMask::NONE);
    }

    #[test]
    fn test_debug_cascade_clamped() {
        let grid = GridConfig::new(8, 3, 1.0);
        let mut debug = DebugSettings {
            draw_cascade: -2,
            ..Default::default()
        };
        assert_eq!(debug.clamped_cascade(&grid), Some(Cascade(0)));
        debug.draw_cascade = 9;
        assert_eq!(debug.clamped_cascade(&grid), Some(Cascade(2)));
        assert_eq!(debug.clamped_cascade(&GridConfig::new(8, 0, 1.0)), None);
    }

    #[test]
    fn test_settings_from_ron() {
        let ron_str = r#"(
            grid: (
                resolution: 32,
                cascade_count: 5,
                voxel_pixel_size: 0.5,
                culling_mask: 6,
            ),
            coarse_combine: Max,
        )"#;
        let settings = GiSettings::from_ron_str(ron_str).unwrap();
        assert_eq!(settings.grid.resolution, 32);
        assert_eq!(settings.grid.cascade_count, 5);
        assert_eq!(settings.grid.culling_mask, CullingMask(6));
        assert_eq!(settings.coarse_combine, CoarseCombine::Max);
        assert_eq!(settings.debug, DebugSettings::default());
    }

    #[test]
    fn test_settings_missing_fields_default() {
        let settings = GiSettings::from_ron_str("(grid: (resolution: 16))").unwrap();
        assert_eq!(settings.grid.resolution, 16);
        assert_eq!(settings.grid.cascade_count, 4);
        assert_eq!(settings.grid.culling_mask, CullingMask::ALL);
    }

    #[test]
    fn test_settings_parse_error() {
        let err = GiSettings::from_ron_str("(grid: (resolution: \"big\"))").unwrap_err();
        assert!(matches!(err, VoxcastError::ConfigParse(_)));
    }

    #[test]
    fn test_settings_ron_round_trip_keeps_grid() {
        let settings = GiSettings {
            grid: GridConfig::new(24, 2, 0.125),
            ..Default::default()
        };
        let text = settings.to_ron_string().unwrap();
        assert_eq!(GiSettings::from_ron_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_shipped_default_config_matches_defaults() {
        let text = include_str!("../../../configs/default.ron");
        assert_eq!(GiSettings::from_ron_str(text).unwrap(), GiSettings::default());
    }
}
