use std::time::Instant;

use voxcast_core::{Cascade, GiSettings, VoxcastError};
use voxcast_gi::{MeshList, Overlay, VolumeRole, VoxelGi};

use crate::scenes::{build_scene, visible_triangles, SceneConfig};

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Read-back statistics for one cascade after the last refresh.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtractionSummary {
    pub cascade: u32,
    pub occupied_voxels: u32,
    pub mean_light: f64,
}

/// Size of one debug overlay built after the last refresh.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlaySummary {
    pub volume: String,
    pub cubes: u32,
    pub line_vertices: u32,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub resolution: u32,
    pub cascade_count: u32,
    pub triangle_count: u32,
    pub refresh_count: u32,
    pub allocation_events: u64,
    pub timings: TimingSeries,
    pub extraction: Option<ExtractionSummary>,
    #[serde(default)]
    pub overlays: Vec<OverlaySummary>,
}

/// Runs benchmarks on a native GPU.
pub struct BenchmarkRunner {
    device: wgpu::Device,
    queue: wgpu::Queue,
    refresh_count: u32,
}

impl BenchmarkRunner {
    /// Initialize wgpu natively. Blocks on async adapter request.
    pub fn new(refresh_count: u32) -> Result<Self, VoxcastError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| VoxcastError::AdapterNotFound("no suitable GPU adapter found".into()))?;

        log::info!("Benchmark adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("bench-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| VoxcastError::DeviceRequestFailed(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            refresh_count,
        })
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(
        &self,
        config: &SceneConfig,
        settings: &GiSettings,
        extract_cascade: Option<u32>,
    ) -> Result<BenchmarkResult, VoxcastError> {
        log::info!(
            "Running scene '{}' ({}^3 x {} cascades)...",
            config.name,
            settings.grid.resolution,
            settings.grid.cascade_count
        );

        let meshes = build_scene(config);
        let triangle_count = visible_triangles(&meshes, settings.grid.culling_mask) as u32;
        let mut scene = MeshList::new();
        for mesh in &meshes {
            scene.push(&self.device, &mesh.positions, mesh.layers);
        }

        let mut gi = VoxelGi::new(&self.device)?;
        gi.set_coarse_combine(settings.coarse_combine);
        let light = config.light();

        let mut refresh_times = Vec::with_capacity(self.refresh_count as usize);
        for _ in 0..self.refresh_count {
            let start = Instant::now();
            gi.refresh(&self.device, &self.queue, &scene, &settings.grid, &light)?;
            self.device.poll(wgpu::Maintain::Wait);
            refresh_times.push(start.elapsed().as_secs_f64() * 1000.0);
        }

        let timings = compute_timings(&refresh_times);
        log::info!(
            "  Done: mean={:.2}ms, p95={:.2}ms",
            timings.mean_ms,
            timings.p95_ms
        );

        let extraction = match extract_cascade {
            Some(cascade) if self.refresh_count > 0 => {
                let cascade = Cascade(cascade);
                let geometry =
                    gi.extract(&self.device, &self.queue, VolumeRole::Geometry, cascade)?;
                let light = gi.extract(&self.device, &self.queue, VolumeRole::Light, cascade)?;
                let clamped = cascade.0.min(settings.grid.cascade_count.saturating_sub(1));
                Some(summarize_extraction(clamped, &geometry, &light))
            }
            _ => None,
        };

        let overlays: Vec<OverlaySummary> = if self.refresh_count > 0 {
            let viewer = glam::Vec3::from_array(config.light_position);
            gi.debug_overlay(&self.device, &self.queue, &settings.debug, viewer)?
                .iter()
                .map(summarize_overlay)
                .collect()
        } else {
            Vec::new()
        };
        for overlay in &overlays {
            log::info!(
                "  Overlay {}: {} cubes, {} line vertices",
                overlay.volume,
                overlay.cubes,
                overlay.line_vertices
            );
        }

        Ok(BenchmarkResult {
            scene_name: config.name.to_string(),
            resolution: settings.grid.resolution,
            cascade_count: settings.grid.cascade_count,
            triangle_count,
            refresh_count: self.refresh_count,
            allocation_events: gi.allocation_events(),
            timings,
            extraction,
            overlays,
        })
    }
}

/// Count occupied geometry voxels and average the light values of one
/// extracted cascade.
pub fn summarize_extraction(cascade: u32, geometry: &[f32], light: &[f32]) -> ExtractionSummary {
    let occupied_voxels = geometry.iter().filter(|&&v| v > 0.0).count() as u32;
    let mean_light = if light.is_empty() {
        0.0
    } else {
        light.iter().map(|&v| v as f64).sum::<f64>() / light.len() as f64
    };
    ExtractionSummary {
        cascade,
        occupied_voxels,
        mean_light,
    }
}

pub fn summarize_overlay(overlay: &Overlay) -> OverlaySummary {
    OverlaySummary {
        volume: overlay.role.label().to_string(),
        cubes: overlay.cubes.len() as u32,
        line_vertices: overlay.line_vertices().len() as u32,
    }
}

/// Compute timing statistics from a list of refresh times in milliseconds.
pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}
