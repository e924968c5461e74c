//! Workgroup-count arithmetic. Every helper rounds up, so a dispatch never
//! under-covers its domain; kernels mask the slack themselves.

use crate::constants::MAX_WORKGROUPS_PER_DIMENSION;

/// Number of groups of `group_width` needed to cover `n` items.
pub fn group_count(n: u32, group_width: u32) -> u32 {
    debug_assert!(group_width > 0, "group width must be positive");
    n.div_ceil(group_width)
}

/// Workgroup counts for a single compute dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Cover an `resolution^3` block with cubic groups of `group_width`.
    pub fn cube(resolution: u32, group_width: u32) -> Self {
        let groups = group_count(resolution, group_width);
        Self::new(groups, groups, groups)
    }

    /// Cover `cells` items with 1D groups of `group_size`. When the group
    /// count exceeds the per-dimension limit the remainder spills into Y;
    /// the kernel flattens `id.x + id.y * num_workgroups.x * group_size`.
    pub fn linear(cells: u64, group_size: u32) -> Self {
        Self::linear_with_limit(cells, group_size, MAX_WORKGROUPS_PER_DIMENSION)
    }

    pub fn linear_with_limit(cells: u64, group_size: u32, max_per_dimension: u32) -> Self {
        let groups = cells.div_ceil(group_size as u64);
        if groups <= max_per_dimension as u64 {
            return Self::new(groups as u32, 1, 1);
        }
        let rows = groups.div_ceil(max_per_dimension as u64);
        Self::new(max_per_dimension, rows as u32, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    pub fn group_total(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CLEAR_GROUP_SIZE, GROUP_WIDTH};

    #[test]
    fn test_group_count_coverage_property() {
        for width in 1..=16u32 {
            for n in 1..=300u32 {
                let groups = group_count(n, width);
                assert!(groups * width >= n, "under-covered n={n} width={width}");
                assert!((groups - 1) * width < n, "over-dispatched n={n} width={width}");
            }
        }
    }

    #[test]
    fn test_resolution_4_is_one_group() {
        assert_eq!(DispatchSize::cube(4, GROUP_WIDTH), DispatchSize::new(1, 1, 1));
    }

    #[test]
    fn test_resolution_5_is_two_groups() {
        // Indices 5..7 fall outside the grid and are masked by the kernel.
        assert_eq!(DispatchSize::cube(5, GROUP_WIDTH), DispatchSize::new(2, 2, 2));
    }

    #[test]
    fn test_zero_resolution_dispatches_nothing() {
        assert!(DispatchSize::cube(0, GROUP_WIDTH).is_empty());
        assert!(DispatchSize::linear(0, CLEAR_GROUP_SIZE).is_empty());
    }

    #[test]
    fn test_linear_clear_covers_all_cells() {
        let size = DispatchSize::linear(8 * 8 * 8, CLEAR_GROUP_SIZE);
        assert_eq!(size, DispatchSize::new(8, 1, 1));

        let size = DispatchSize::linear(5 * 5 * 5, CLEAR_GROUP_SIZE);
        assert_eq!(size, DispatchSize::new(2, 1, 1));
    }

    #[test]
    fn test_linear_spills_into_y() {
        let size = DispatchSize::linear_with_limit(1000, 10, 16);
        // 100 groups, 16 per row -> 7 rows
        assert_eq!(size, DispatchSize::new(16, 7, 1));
        assert!(size.group_total() * 10 >= 1000);

        // 256^3 cells at 64 per group exceeds the WebGPU default limit.
        let size = DispatchSize::linear(256u64.pow(3), CLEAR_GROUP_SIZE);
        assert_eq!(size.x, MAX_WORKGROUPS_PER_DIMENSION);
        assert!(size.group_total() * CLEAR_GROUP_SIZE as u64 >= 256u64.pow(3));
    }
}
