use voxcast_core::{CullingMask, ProjectionDevice};
use wgpu::util::DeviceExt;

use crate::kernels::compose;
use crate::volumes::{ScratchVolume, RASTER_TARGET_FORMAT};

/// Voxelize pass uniforms (144 bytes, matches WGSL VoxelizeUniforms).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VoxelizeUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub cascade_box: [[f32; 4]; 4],
    pub grid_resolution: u32,
    pub _pad: [u32; 3],
}

impl VoxelizeUniforms {
    pub fn new(device: &ProjectionDevice, resolution: u32) -> Self {
        Self {
            view_proj: device.view_projection().to_cols_array_2d(),
            cascade_box: device.cascade_box().to_cols_array_2d(),
            grid_resolution: resolution,
            _pad: [0; 3],
        }
    }
}

/// Scene geometry the voxelize pass draws.
///
/// Implementations bind their own vertex buffers (one `Float32x3` world
/// position per vertex at location 0, triangle lists) and issue draws for
/// every mesh `mask` accepts.
pub trait GeometrySource {
    fn draw_culled(&self, pass: &mut wgpu::RenderPass<'_>, mask: CullingMask);
}

/// A scene with nothing in it; every cascade voxelizes empty.
pub struct NoGeometry;

impl GeometrySource for NoGeometry {
    fn draw_culled(&self, _pass: &mut wgpu::RenderPass<'_>, _mask: CullingMask) {}
}

/// One world-space triangle mesh tagged with layer bits.
pub struct VoxelMesh {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    layers: u32,
}

impl VoxelMesh {
    pub fn layers(&self) -> u32 {
        self.layers
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

impl Drop for VoxelMesh {
    fn drop(&mut self) {
        self.vertex_buffer.destroy();
    }
}

/// Ready-made `GeometrySource` holding uploaded triangle lists.
#[derive(Default)]
pub struct MeshList {
    meshes: Vec<VoxelMesh>,
}

impl MeshList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a non-indexed triangle list in world space.
    pub fn push(&mut self, device: &wgpu::Device, positions: &[[f32; 3]], layers: u32) {
        if positions.is_empty() {
            return;
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("voxel-mesh"),
            contents: bytemuck::cast_slice(positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.meshes.push(VoxelMesh {
            vertex_buffer,
            vertex_count: positions.len() as u32,
            layers,
        });
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn triangle_count(&self) -> u32 {
        self.meshes.iter().map(|m| m.vertex_count / 3).sum()
    }

    pub fn meshes(&self) -> &[VoxelMesh] {
        &self.meshes
    }
}

impl GeometrySource for MeshList {
    fn draw_culled(&self, pass: &mut wgpu::RenderPass<'_>, mask: CullingMask) {
        for mesh in self.meshes.iter().filter(|m| mask.accepts(m.layers)) {
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.draw(0..mesh.vertex_count, 0..1);
        }
    }
}

/// Render pipeline that scatters rasterized fragments into a scratch buffer.
pub struct VoxelizePass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
}

impl VoxelizePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("voxelize"),
            source: wgpu::ShaderSource::Wgsl(
                compose(include_str!("../../../shaders/cascade/voxelize.wgsl")).into(),
            ),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("voxelize-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxelize-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("voxelize-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
                compilation_options: Default::default(),
            },
            // Both faces; orientation means nothing to occupancy.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: RASTER_TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::empty(),
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        Self { pipeline, layout }
    }

    /// Record one cascade's rasterization into `scratch`.
    pub fn record(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        scratch: &ScratchVolume,
        projection: &ProjectionDevice,
        scene: &dyn GeometrySource,
    ) {
        let uniforms = VoxelizeUniforms::new(projection, scratch.resolution());
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("voxelize-uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("voxelize-bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scratch.buffer().as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("voxelize-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: scratch.target_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Discard,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        scene.draw_culled(&mut pass, projection.culling_mask());
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3, Vec4};
    use voxcast_core::TrackedLight;

    use super::*;

    #[test]
    fn test_voxelize_uniforms_size() {
        assert_eq!(std::mem::size_of::<VoxelizeUniforms>(), 144);
    }

    #[test]
    fn test_uniforms_carry_device_matrices() {
        let mut device = ProjectionDevice::new();
        device.track(&TrackedLight::looking_along(Vec3::new(1.0, 2.0, 3.0), Vec3::NEG_Y));
        device.set_box_extent(4.0);

        let uniforms = VoxelizeUniforms::new(&device, 16);
        assert_eq!(uniforms.grid_resolution, 16);
        assert_eq!(
            Mat4::from_cols_array_2d(&uniforms.cascade_box),
            device.cascade_box()
        );
    }

    #[test]
    fn test_box_corner_lands_in_clip_volume() {
        let mut device = ProjectionDevice::new();
        device.set_box_extent(2.0);
        let view_proj = device.view_projection();
        for corner in [Vec3::new(-1.9, -1.9, -1.9), Vec3::new(1.9, 1.9, 1.9)] {
            let clip = view_proj * Vec4::from((corner, 1.0));
            assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0);
            assert!((0.0..=1.0).contains(&clip.z), "{clip:?}");
        }
    }
}
