//! Value conventions of the packed volumes.
//!
//! Geometry volume: occupancy in `[0, 1]`, `0.0` = empty, `1.0` = solid.
//! Repack writes `1.0` for every scratch cell the rasterizer touched; the
//! upscale kernel keeps the larger of a cell's own occupancy and the mean of
//! the eight finer-cascade voxels it covers.
//!
//! Light volume: transmittance toward the tracked light in `[0, 1]`,
//! `1.0` = unoccluded.

use serde::{Deserialize, Serialize};

/// How the trace kernel merges near-field transmittance (marched through the
/// voxel's own cascade) with far-field transmittance (marched through the
/// coarsest cascade beyond the own cascade's boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoarseCombine {
    /// `near * far`.
    #[default]
    Multiply,
    /// Occlusions add up: `1 - min(1, (1 - near) + (1 - far))`.
    Additive,
    /// Strongest occluder wins: `min(near, far)`.
    Max,
    /// Coarsest cascade only: `far`.
    Replace,
}

impl CoarseCombine {
    /// Selector passed to the trace kernel.
    pub fn shader_id(self) -> u32 {
        match self {
            Self::Multiply => 0,
            Self::Additive => 1,
            Self::Max => 2,
            Self::Replace => 3,
        }
    }

    /// CPU mirror of the kernel's combine step.
    pub fn combine(self, near: f32, far: f32) -> f32 {
        match self {
            Self::Multiply => near * far,
            Self::Additive => 1.0 - ((1.0 - near) + (1.0 - far)).min(1.0),
            Self::Max => near.min(far),
            Self::Replace => far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_ids_unique() {
        let ids = [
            CoarseCombine::Multiply.shader_id(),
            CoarseCombine::Additive.shader_id(),
            CoarseCombine::Max.shader_id(),
            CoarseCombine::Replace.shader_id(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_unoccluded_stays_lit() {
        for policy in [
            CoarseCombine::Multiply,
            CoarseCombine::Additive,
            CoarseCombine::Max,
            CoarseCombine::Replace,
        ] {
            assert_eq!(policy.combine(1.0, 1.0), 1.0, "{policy:?}");
        }
    }

    #[test]
    fn test_combine_rules() {
        assert!((CoarseCombine::Multiply.combine(0.5, 0.5) - 0.25).abs() < 1e-6);
        assert!((CoarseCombine::Additive.combine(0.75, 0.5) - 0.25).abs() < 1e-6);
        assert_eq!(CoarseCombine::Additive.combine(0.2, 0.3), 0.0);
        assert_eq!(CoarseCombine::Max.combine(0.8, 0.3), 0.3);
        assert_eq!(CoarseCombine::Replace.combine(0.1, 0.9), 0.9);
    }
}
