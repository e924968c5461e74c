use voxcast_core::constants::MAX_WORKGROUPS_PER_DIMENSION;
use voxcast_core::{DispatchSize, ProjectionDevice, VolumeExtent, VoxcastError};
use wgpu::util::DeviceExt;

use crate::backend::{CascadeBackend, CascadeParams, KernelBinding, VolumeRole};
use crate::kernels::{Kernel, KernelSet};
use crate::publish::{GiGlobals, UniformPublisher};
use crate::raster::{GeometrySource, VoxelizePass};
use crate::volumes::{scratch_byte_size, ScratchVolume, VolumeTexture};

/// `CascadeBackend` over a wgpu device.
///
/// Commands accumulate in one encoder until `flush`; every dispatch gets its
/// own params uniform so nothing is overwritten before the submission runs.
pub struct WgpuBackend<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    kernels: &'a KernelSet,
    voxelize_pass: &'a VoxelizePass,
    scene: &'a dyn GeometrySource,
    publisher: &'a mut UniformPublisher,
    encoder: Option<wgpu::CommandEncoder>,
}

impl<'a> WgpuBackend<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        kernels: &'a KernelSet,
        voxelize_pass: &'a VoxelizePass,
        scene: &'a dyn GeometrySource,
        publisher: &'a mut UniformPublisher,
    ) -> Self {
        Self {
            device,
            queue,
            kernels,
            voxelize_pass,
            scene,
            publisher,
            encoder: None,
        }
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = self.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cascade-encoder"),
            })
        })
    }

    fn record_dispatch(
        &mut self,
        kernel: Kernel,
        resources: &[wgpu::BindingResource<'_>],
        params: CascadeParams,
        size: DispatchSize,
    ) {
        if size.is_empty() {
            return;
        }
        let kernels = self.kernels;
        let handle = kernels.get(kernel);

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("cascade-params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = resources
            .iter()
            .enumerate()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: resource.clone(),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: 2,
            resource: params_buffer.as_entire_binding(),
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.name()),
            layout: &handle.layout,
            entries: &entries,
        });

        let encoder = self.encoder();
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.name()),
            timestamp_writes: None,
        });
        pass.set_pipeline(&handle.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(size.x, size.y, size.z);
    }

    fn read_buffer(&self, staging: &wgpu::Buffer) -> Result<Vec<f32>, VoxcastError> {
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                let values: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
                drop(data);
                staging.unmap();
                Ok(values)
            }
            Ok(Err(err)) => Err(VoxcastError::ReadbackFailed(err.to_string())),
            Err(err) => Err(VoxcastError::ReadbackFailed(err.to_string())),
        }
    }
}

impl CascadeBackend for WgpuBackend<'_> {
    type Volume = VolumeTexture;
    type Scratch = ScratchVolume;

    fn create_volume(
        &mut self,
        role: VolumeRole,
        extent: VolumeExtent,
    ) -> Result<VolumeTexture, VoxcastError> {
        VolumeTexture::new(self.device, role, extent)
    }

    fn create_scratch(&mut self, resolution: u32) -> Result<ScratchVolume, VoxcastError> {
        ScratchVolume::new(self.device, resolution)
    }

    fn dispatch(
        &mut self,
        binding: KernelBinding<'_, ScratchVolume, VolumeTexture>,
        params: CascadeParams,
        size: DispatchSize,
    ) {
        let kernel = binding.kernel();
        match binding {
            KernelBinding::Clear { scratch } => {
                // The linear clear can exceed one dimension's group limit at
                // large resolutions; spill into Y.
                let limit = self
                    .device
                    .limits()
                    .max_compute_workgroups_per_dimension
                    .min(MAX_WORKGROUPS_PER_DIMENSION);
                let size = if size.x > limit {
                    let cells = (scratch.resolution() as u64).pow(3);
                    DispatchSize::linear_with_limit(cells, kernel.group_width(), limit)
                } else {
                    size
                };
                self.record_dispatch(kernel, &[scratch.buffer().as_entire_binding()], params, size);
            }
            KernelBinding::RepackLevel0 { scratch, geometry }
            | KernelBinding::RepackAndUpscale { scratch, geometry } => {
                self.record_dispatch(
                    kernel,
                    &[
                        scratch.buffer().as_entire_binding(),
                        wgpu::BindingResource::TextureView(geometry.view()),
                    ],
                    params,
                    size,
                );
            }
            KernelBinding::Trace { geometry, light } => {
                self.record_dispatch(
                    kernel,
                    &[
                        wgpu::BindingResource::TextureView(geometry.view()),
                        wgpu::BindingResource::TextureView(light.view()),
                    ],
                    params,
                    size,
                );
            }
        }
    }

    fn rasterize(&mut self, scratch: &ScratchVolume, device: &ProjectionDevice) {
        let gpu = self.device;
        let pass = self.voxelize_pass;
        let scene = self.scene;
        let encoder = self.encoder();
        pass.record(gpu, encoder, scratch, device, scene);
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn extract(
        &mut self,
        source: &VolumeTexture,
        params: CascadeParams,
        size: DispatchSize,
    ) -> Result<Vec<f32>, VoxcastError> {
        self.flush();

        let byte_size = scratch_byte_size(params.grid_resolution);
        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("debug-extract-output"),
            size: byte_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("debug-extract-staging"),
            size: byte_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.record_dispatch(
            Kernel::DebugExtract,
            &[
                wgpu::BindingResource::TextureView(source.view()),
                output.as_entire_binding(),
            ],
            params,
            size,
        );
        self.encoder()
            .copy_buffer_to_buffer(&output, 0, &staging, 0, byte_size);
        self.flush();

        let values = self.read_buffer(&staging);
        output.destroy();
        staging.destroy();
        values
    }

    fn publish(&mut self, globals: &GiGlobals, light: &VolumeTexture) {
        self.publisher
            .publish(self.device, self.queue, globals, light.view());
    }

    fn retract(&mut self) {
        self.publisher.retract();
    }
}

impl Drop for WgpuBackend<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}
