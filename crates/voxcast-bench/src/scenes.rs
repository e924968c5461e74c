use glam::Vec3;
use voxcast_core::{CullingMask, TrackedLight};

/// Layer bit of static ground geometry.
pub const GROUND_LAYER: u32 = 1 << 0;
/// Layer bit of scattered props.
pub const PROP_LAYER: u32 = 1 << 1;

/// One triangle list in world space.
pub struct SceneMesh {
    pub positions: Vec<[f32; 3]>,
    pub layers: u32,
}

/// Configuration for a single benchmark scene.
pub struct SceneConfig {
    pub name: &'static str,
    /// Boxes per side of the prop grid; 0 means ground only.
    pub grid_side: u32,
    pub box_size: f32,
    pub spacing: f32,
    pub light_position: [f32; 3],
    pub light_direction: [f32; 3],
}

impl SceneConfig {
    pub fn light(&self) -> TrackedLight {
        TrackedLight::looking_along(
            Vec3::from_array(self.light_position),
            Vec3::from_array(self.light_direction),
        )
    }
}

/// Return the standard suite of benchmark scenes (ground only up to a dense
/// 16x16 prop grid).
pub fn standard_scenes() -> Vec<SceneConfig> {
    vec![
        SceneConfig {
            name: "ground",
            grid_side: 0,
            box_size: 1.0,
            spacing: 3.0,
            light_position: [0.0, 6.0, 0.0],
            light_direction: [0.3, -1.0, 0.2],
        },
        SceneConfig {
            name: "boxes-4x4",
            grid_side: 4,
            box_size: 1.0,
            spacing: 3.0,
            light_position: [0.0, 6.0, 0.0],
            light_direction: [0.3, -1.0, 0.2],
        },
        SceneConfig {
            name: "boxes-16x16",
            grid_side: 16,
            box_size: 0.75,
            spacing: 1.5,
            light_position: [0.0, 8.0, 0.0],
            light_direction: [-0.4, -1.0, 0.1],
        },
    ]
}

/// Two triangles covering the XZ square of `half_size` at height `y`.
pub fn ground_slab(half_size: f32, y: f32) -> Vec<[f32; 3]> {
    let h = half_size;
    vec![
        [-h, y, -h],
        [h, y, -h],
        [h, y, h],
        [-h, y, -h],
        [h, y, h],
        [-h, y, h],
    ]
}

/// Axis-aligned box as a non-indexed triangle list (12 triangles).
pub fn box_triangles(min: Vec3, max: Vec3) -> Vec<[f32; 3]> {
    // 8 corners, bit 0 = x, bit 1 = y, bit 2 = z picks max over min.
    let corners: [[f32; 3]; 8] = std::array::from_fn(|i| {
        [
            if i & 1 != 0 { max.x } else { min.x },
            if i & 2 != 0 { max.y } else { min.y },
            if i & 4 != 0 { max.z } else { min.z },
        ]
    });

    // 6 faces as corner quads
    let faces: [[usize; 4]; 6] = [
        [0, 1, 3, 2], // -z
        [4, 6, 7, 5], // +z
        [0, 2, 6, 4], // -x
        [1, 5, 7, 3], // +x
        [0, 4, 5, 1], // -y
        [2, 3, 7, 6], // +y
    ];

    let mut verts = Vec::with_capacity(36);
    for [a, b, c, d] in faces {
        for index in [a, b, c, a, c, d] {
            verts.push(corners[index]);
        }
    }
    verts
}

/// Build the meshes for `config`: a ground slab plus a centred grid of
/// boxes resting on it.
pub fn build_scene(config: &SceneConfig) -> Vec<SceneMesh> {
    let side = config.grid_side as f32;
    let half_size = (side * config.spacing * 0.5).max(4.0) + config.spacing;

    let mut meshes = vec![SceneMesh {
        positions: ground_slab(half_size, 0.0),
        layers: GROUND_LAYER,
    }];

    if config.grid_side == 0 {
        return meshes;
    }

    let origin = -(side - 1.0) * config.spacing * 0.5;
    let mut props = Vec::with_capacity((config.grid_side * config.grid_side) as usize * 36);
    for i in 0..config.grid_side {
        for j in 0..config.grid_side {
            let x = origin + i as f32 * config.spacing;
            let z = origin + j as f32 * config.spacing;
            // Alternate heights so shadows overlap.
            let height = config.box_size * (1.0 + ((i + j) % 3) as f32);
            let min = Vec3::new(x - config.box_size * 0.5, 0.0, z - config.box_size * 0.5);
            let max = Vec3::new(x + config.box_size * 0.5, height, z + config.box_size * 0.5);
            props.extend(box_triangles(min, max));
        }
    }
    meshes.push(SceneMesh {
        positions: props,
        layers: PROP_LAYER,
    });
    meshes
}

/// Triangles that pass `mask`.
pub fn visible_triangles(meshes: &[SceneMesh], mask: CullingMask) -> usize {
    meshes
        .iter()
        .filter(|m| mask.accepts(m.layers))
        .map(|m| m.positions.len() / 3)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_has_twelve_triangles() {
        let verts = box_triangles(Vec3::ZERO, Vec3::ONE);
        assert_eq!(verts.len(), 36);
        assert!(verts
            .iter()
            .all(|v| v.iter().all(|&c| c == 0.0 || c == 1.0)));
    }

    #[test]
    fn test_ground_only_scene() {
        let scenes = standard_scenes();
        let meshes = build_scene(&scenes[0]);
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].layers, GROUND_LAYER);
        assert_eq!(visible_triangles(&meshes, CullingMask::ALL), 2);
    }

    #[test]
    fn test_prop_grid_triangle_count() {
        let scenes = standard_scenes();
        let meshes = build_scene(&scenes[1]);
        assert_eq!(visible_triangles(&meshes, CullingMask::ALL), 2 + 16 * 12);
        assert_eq!(visible_triangles(&meshes, CullingMask(PROP_LAYER)), 16 * 12);
        assert_eq!(visible_triangles(&meshes, CullingMask::NONE), 0);
    }

    #[test]
    fn test_scene_lights_point_down() {
        for scene in standard_scenes() {
            assert!(scene.light().forward().y < 0.0, "{}", scene.name);
        }
    }
}
