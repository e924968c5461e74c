//! Debug overlay geometry built from an extracted cascade slab.
//!
//! Everything here is line-list vertex data in world space; drawing it is up
//! to the host.

use glam::{Mat4, Vec3};
use voxcast_core::constants::{LIGHT_UNOCCLUDED, OCCUPANCY_EMPTY};

use crate::backend::VolumeRole;
use crate::extract::slab_coords;

/// Edge length, in voxels, of a light cube.
const LIGHT_CUBE_SIZE: f32 = 0.3;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl DebugVertex {
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }
}

/// One marker cube, in voxel index space of the extracted cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayCube {
    pub center: Vec3,
    /// Edge length in voxels.
    pub size: f32,
    pub color: [f32; 4],
}

/// Overlay for one cascade of one volume.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub role: VolumeRole,
    /// Voxel index space to world space.
    pub gizmo: Mat4,
    pub axes: Vec<DebugVertex>,
    /// Sorted back-to-front from the viewer.
    pub cubes: Vec<OverlayCube>,
}

impl Overlay {
    /// Axis lines followed by one wireframe per cube, all in world space.
    pub fn line_vertices(&self) -> Vec<DebugVertex> {
        let mut verts = Vec::with_capacity(self.axes.len() + self.cubes.len() * 24);
        verts.extend_from_slice(&self.axes);
        for cube in &self.cubes {
            verts.extend(cube_wireframe(&self.gizmo, cube));
        }
        verts
    }
}

/// Gizmo axes: one line of length `resolution` along each voxel axis from
/// the slab origin.
pub fn axis_lines(gizmo: &Mat4, resolution: u32) -> Vec<DebugVertex> {
    let n = resolution as f32;
    let origin = gizmo.transform_point3(Vec3::ZERO).to_array();
    [
        (Vec3::X, [1.0, 0.2, 0.2, 1.0]),
        (Vec3::Y, [0.2, 1.0, 0.2, 1.0]),
        (Vec3::Z, [0.2, 0.4, 1.0, 1.0]),
    ]
    .into_iter()
    .flat_map(|(axis, color)| {
        let tip = gizmo.transform_point3(axis * n).to_array();
        [DebugVertex::new(origin, color), DebugVertex::new(tip, color)]
    })
    .collect()
}

/// Marker cube for one voxel value, or `None` if the voxel is not drawn.
fn marker(role: VolumeRole, value: f32) -> Option<(f32, [f32; 4])> {
    match role {
        VolumeRole::Geometry if value > OCCUPANCY_EMPTY => {
            Some((value * 0.5, [0.5, 0.5, 0.5, 1.0]))
        }
        VolumeRole::Light if value < LIGHT_UNOCCLUDED => {
            let grey = value.clamp(0.0, 1.0);
            Some((LIGHT_CUBE_SIZE, [grey, grey, grey, 1.0]))
        }
        _ => None,
    }
}

/// Build the overlay for an extracted slab.
///
/// `values` must be laid out as returned by `extract`. `viewer` is the
/// world-space eye position used for back-to-front sorting.
pub fn build_overlay(
    values: &[f32],
    resolution: u32,
    role: VolumeRole,
    gizmo: Mat4,
    viewer: Vec3,
) -> Overlay {
    let cells = (resolution as usize).pow(3);
    let mut keyed: Vec<(f32, OverlayCube)> = values
        .iter()
        .take(cells)
        .enumerate()
        .filter_map(|(index, &value)| {
            let (size, color) = marker(role, value)?;
            let [x, y, z] = slab_coords(resolution, index);
            let center = Vec3::new(x as f32, y as f32, z as f32) + 0.5;
            let distance = gizmo.transform_point3(center).distance_squared(viewer);
            Some((distance, OverlayCube { center, size, color }))
        })
        .collect();

    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));

    Overlay {
        role,
        gizmo,
        axes: axis_lines(&gizmo, resolution),
        cubes: keyed.into_iter().map(|(_, cube)| cube).collect(),
    }
}

/// Wireframe vertices for one cube (12 edges x 2 verts = 24 verts), world
/// space.
pub fn cube_wireframe(gizmo: &Mat4, cube: &OverlayCube) -> Vec<DebugVertex> {
    let r = cube.size * 0.5;
    let c = cube.center;

    let corners: [Vec3; 8] = [
        c + Vec3::new(-r, -r, -r),
        c + Vec3::new(r, -r, -r),
        c + Vec3::new(r, r, -r),
        c + Vec3::new(-r, r, -r),
        c + Vec3::new(-r, -r, r),
        c + Vec3::new(r, -r, r),
        c + Vec3::new(r, r, r),
        c + Vec3::new(-r, r, r),
    ];

    let edges: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];

    let mut verts = Vec::with_capacity(24);
    for (a, b) in edges {
        verts.push(DebugVertex::new(
            gizmo.transform_point3(corners[a]).to_array(),
            cube.color,
        ));
        verts.push(DebugVertex::new(
            gizmo.transform_point3(corners[b]).to_array(),
            cube.color,
        ));
    }
    verts
}
