use glam::Mat4;
use voxcast_core::GridConfig;
use wgpu::util::DeviceExt;

/// Values consumers need to sample the light volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GiGlobals {
    pub resolution: u32,
    /// `1 / cascade_count`, the height of one slab in normalized texture
    /// coordinates.
    pub inv_cascade_count: f32,
    pub world_to_voxel: Mat4,
}

impl GiGlobals {
    pub fn new(config: &GridConfig, world_to_voxel: Mat4) -> Self {
        Self {
            resolution: config.resolution,
            inv_cascade_count: 1.0 / config.cascade_count.max(1) as f32,
            world_to_voxel,
        }
    }
}

/// Consumer-side uniform (80 bytes, matches WGSL GiUniforms).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GiUniforms {
    /// x = resolution, y = 1 / cascade count, zw unused.
    pub grid: [f32; 4],
    pub world_to_voxel: [[f32; 4]; 4],
}

impl From<&GiGlobals> for GiUniforms {
    fn from(globals: &GiGlobals) -> Self {
        Self {
            grid: [
                globals.resolution as f32,
                globals.inv_cascade_count,
                0.0,
                0.0,
            ],
            world_to_voxel: globals.world_to_voxel.to_cols_array_2d(),
        }
    }
}

/// A published refresh. `version` increases with every publication so
/// consumers can tell a rebuilt volume from the one they already bound.
pub struct PublishedGi {
    pub version: u64,
    pub globals: GiGlobals,
    /// Binding 0: `GiUniforms`, 1: light volume, 2: non-filtering sampler.
    pub bind_group: wgpu::BindGroup,
}

/// Owns the consumer-facing uniform buffer and the current publication.
pub struct UniformPublisher {
    buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    layout: wgpu::BindGroupLayout,
    version: u64,
    published: Option<PublishedGi>,
}

impl UniformPublisher {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gi-uniforms"),
            contents: bytemuck::bytes_of(&GiUniforms {
                grid: [0.0; 4],
                world_to_voxel: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // R32Float is not filterable everywhere; consumers sample by nearest.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("gi-light-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gi-consumer"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        Self {
            buffer,
            sampler,
            layout,
            version: 0,
            published: None,
        }
    }

    /// Upload `globals` and bind `light_view` for consumers.
    pub fn publish(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        globals: &GiGlobals,
        light_view: &wgpu::TextureView,
    ) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&GiUniforms::from(globals)));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gi-consumer"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(light_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        self.version += 1;
        self.published = Some(PublishedGi {
            version: self.version,
            globals: *globals,
            bind_group,
        });
    }

    pub fn retract(&mut self) {
        if self.published.take().is_some() {
            log::debug!("Retracted light volume publication");
        }
    }

    pub fn published(&self) -> Option<&PublishedGi> {
        self.published.as_ref()
    }

    /// Layout consumers build their pipelines against.
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_gi_uniforms_size() {
        assert_eq!(std::mem::size_of::<GiUniforms>(), 80);
    }

    #[test]
    fn test_globals_from_config() {
        let globals = GiGlobals::new(&GridConfig::new(32, 4, 0.5), Mat4::IDENTITY);
        assert_eq!(globals.resolution, 32);
        assert_eq!(globals.inv_cascade_count, 0.25);
    }

    #[test]
    fn test_uniforms_pack_globals() {
        let w2v = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let uniforms = GiUniforms::from(&GiGlobals::new(&GridConfig::new(16, 2, 1.0), w2v));
        assert_eq!(uniforms.grid, [16.0, 0.5, 0.0, 0.0]);
        assert_eq!(uniforms.world_to_voxel[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
