use voxcast_core::constants::{
    CLEAR_GROUP_SIZE, GROUP_WIDTH, LIGHT_UNOCCLUDED, OCCUPANCY_EMPTY, OCCUPANCY_SOLID,
};
use voxcast_core::VoxcastError;

/// The compute kernels the cascade pipeline dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Clear,
    RepackLevel0,
    RepackAndUpscale,
    Trace,
    DebugExtract,
}

impl Kernel {
    pub const ALL: [Kernel; 5] = [
        Kernel::Clear,
        Kernel::RepackLevel0,
        Kernel::RepackAndUpscale,
        Kernel::Trace,
        Kernel::DebugExtract,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Clear => "Clear",
            Kernel::RepackLevel0 => "RepackLevel0",
            Kernel::RepackAndUpscale => "RepackAndUpscale",
            Kernel::Trace => "Trace",
            Kernel::DebugExtract => "DebugExtract",
        }
    }

    /// WGSL entry point implementing this kernel.
    pub fn entry_point(self) -> &'static str {
        match self {
            Kernel::Clear => "clear_kernel",
            Kernel::RepackLevel0 => "repack_level0_kernel",
            Kernel::RepackAndUpscale => "repack_upscale_kernel",
            Kernel::Trace => "trace_kernel",
            Kernel::DebugExtract => "debug_extract_kernel",
        }
    }

    /// Declared group width. `Clear` is linear; every other kernel uses cubic
    /// groups of this width along each axis.
    pub fn group_width(self) -> u32 {
        match self {
            Kernel::Clear => CLEAR_GROUP_SIZE,
            _ => GROUP_WIDTH,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            Kernel::Clear => "cascade-clear",
            Kernel::RepackLevel0 => "cascade-repack-level0",
            Kernel::RepackAndUpscale => "cascade-repack-upscale",
            Kernel::Trace => "cascade-trace",
            Kernel::DebugExtract => "cascade-debug-extract",
        }
    }

    /// Binding 0/1 are the kernel's resources, binding 2 is always the
    /// `CascadeParams` uniform.
    fn layout_entries(self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let params = uniform_entry(2);
        match self {
            Kernel::Clear => vec![storage_buffer_entry(0, false), params],
            Kernel::RepackLevel0 => vec![
                storage_buffer_entry(0, true),
                storage_volume_entry(1, wgpu::StorageTextureAccess::WriteOnly),
                params,
            ],
            Kernel::RepackAndUpscale => vec![
                storage_buffer_entry(0, true),
                storage_volume_entry(1, wgpu::StorageTextureAccess::ReadWrite),
                params,
            ],
            Kernel::Trace => vec![
                sampled_volume_entry(0),
                storage_volume_entry(1, wgpu::StorageTextureAccess::WriteOnly),
                params,
            ],
            Kernel::DebugExtract => vec![
                sampled_volume_entry(0),
                storage_buffer_entry(1, false),
                params,
            ],
        }
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_buffer_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_volume_entry(
    binding: u32,
    access: wgpu::StorageTextureAccess,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access,
            format: crate::volumes::VOLUME_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D3,
        },
        count: None,
    }
}

fn sampled_volume_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D3,
            multisampled: false,
        },
        count: None,
    }
}

/// Constants injected ahead of every cascade shader.
pub(crate) fn constants_preamble() -> String {
    format!(
        "const GROUP_WIDTH: u32 = {}u;\n\
         const CLEAR_GROUP_SIZE: u32 = {}u;\n\
         const OCCUPANCY_EMPTY: f32 = {:?};\n\
         const OCCUPANCY_SOLID: f32 = {:?};\n\
         const LIGHT_UNOCCLUDED: f32 = {:?};\n",
        GROUP_WIDTH, CLEAR_GROUP_SIZE, OCCUPANCY_EMPTY, OCCUPANCY_SOLID, LIGHT_UNOCCLUDED,
    )
}

/// Prefix a kernel body with the constants preamble and shared helpers.
pub(crate) fn compose(body: &str) -> String {
    let preamble = constants_preamble();
    let common_wgsl = include_str!("../../../shaders/common/cascade_params.wgsl");
    format!("{preamble}\n{common_wgsl}\n{body}")
}

/// Whether `source` declares a function named `entry_point`.
pub(crate) fn declares_entry_point(source: &str, entry_point: &str) -> bool {
    let needle = format!("fn {entry_point}(");
    source.contains(&needle)
}

/// WGSL bodies for every kernel. Bodies are composed with the constants
/// preamble and shared helpers before compilation.
#[derive(Debug, Clone)]
pub struct KernelSources {
    bodies: Vec<String>,
}

impl Default for KernelSources {
    fn default() -> Self {
        let bodies = vec![
            include_str!("../../../shaders/cascade/clear.wgsl").to_string(),
            include_str!("../../../shaders/cascade/repack_level0.wgsl").to_string(),
            include_str!("../../../shaders/cascade/repack_upscale.wgsl").to_string(),
            include_str!("../../../shaders/cascade/trace.wgsl").to_string(),
            include_str!("../../../shaders/cascade/debug_extract.wgsl").to_string(),
        ];
        Self { bodies }
    }
}

impl KernelSources {
    /// Replace one kernel body, e.g. a trace kernel with different transport.
    pub fn with_body(mut self, kernel: Kernel, body: impl Into<String>) -> Self {
        self.bodies[kernel.index()] = body.into();
        self
    }

    pub fn body(&self, kernel: Kernel) -> &str {
        &self.bodies[kernel.index()]
    }

    /// Fail fast if any body lacks its kernel's entry point.
    pub fn validate(&self) -> Result<(), VoxcastError> {
        for kernel in Kernel::ALL {
            if !declares_entry_point(self.body(kernel), kernel.entry_point()) {
                return Err(VoxcastError::MissingKernel(format!(
                    "{} ({})",
                    kernel.name(),
                    kernel.entry_point()
                )));
            }
        }
        Ok(())
    }
}

/// Compiled pipeline plus its bind group layout.
pub struct KernelHandle {
    pub pipeline: wgpu::ComputePipeline,
    pub layout: wgpu::BindGroupLayout,
}

/// All kernels resolved once at setup; dispatch looks them up by `Kernel`.
pub struct KernelSet {
    handles: Vec<KernelHandle>,
}

impl KernelSet {
    /// Compile every kernel. Entry points are checked before any GPU object
    /// is created; compilation and layout errors surface here rather than at
    /// the first dispatch.
    pub fn new(device: &wgpu::Device, sources: &KernelSources) -> Result<Self, VoxcastError> {
        sources.validate()?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let handles = Kernel::ALL
            .iter()
            .map(|&kernel| Self::create_handle(device, kernel, sources.body(kernel)))
            .collect();
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(VoxcastError::ShaderCompilationFailed(err.to_string()));
        }

        log::debug!("Compiled {} cascade kernels", Kernel::ALL.len());
        Ok(Self { handles })
    }

    pub fn get(&self, kernel: Kernel) -> &KernelHandle {
        &self.handles[kernel.index()]
    }

    fn create_handle(device: &wgpu::Device, kernel: Kernel, body: &str) -> KernelHandle {
        let label = kernel.label();
        let source = compose(body);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &kernel.layout_entries(),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(kernel.entry_point()),
            compilation_options: Default::default(),
            cache: None,
        });

        KernelHandle { pipeline, layout }
    }
}
