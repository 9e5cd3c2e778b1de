//! wgpu bilateral backend.
//!
//! The device, queue and pipeline are created on first use and kept for
//! the life of the backend; a failed creation is remembered so later calls
//! report unavailable without probing again.

use std::sync::OnceLock;

use bytemuck::{Pod, Zeroable};
use lux_core::LinearImage;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::{GpuDevice, radius_for};
use crate::error::{FilterError, FilterResult};
use crate::shaders;

/// Uniform block matching `Params` in the shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ParamsUniform {
    width: u32,
    height: u32,
    radius: u32,
    _pad0: u32,
    spatial_sigma: f32,
    range_sigma: f32,
    _pad1: [f32; 2],
}

struct Context {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    adapter_name: String,
    max_binding: u64,
}

/// GPU bilateral filter via wgpu (Vulkan/Metal/DX12).
#[derive(Default)]
pub struct WgpuBilateral {
    context: OnceLock<Result<Context, String>>,
}

impl WgpuBilateral {
    /// Creates an uninitialized backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn context(&self) -> FilterResult<&Context> {
        self.context
            .get_or_init(|| {
                let created = pollster::block_on(Context::create()).map_err(|e| e.to_string());
                match &created {
                    Ok(ctx) => info!(adapter = %ctx.adapter_name, "wgpu bilateral ready"),
                    Err(e) => debug!(error = %e, "wgpu unavailable"),
                }
                created
            })
            .as_ref()
            .map_err(|e| FilterError::BackendNotAvailable(e.clone()))
    }
}

impl Context {
    async fn create() -> FilterResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| FilterError::BackendNotAvailable("no wgpu adapter".into()))?;
        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("lux_filter_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| FilterError::DeviceCreation(e.to_string()))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bilateral"),
            source: wgpu::ShaderSource::Wgsl(shaders::BILATERAL.into()),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("bilateral_pipeline"),
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });
        Ok(Self {
            device,
            queue,
            pipeline,
            adapter_name: adapter.get_info().name,
            max_binding: limits.max_storage_buffer_binding_size as u64,
        })
    }

    fn run(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> FilterResult<LinearImage> {
        let (w, h) = input.dimensions();
        let n = input.pixel_count();
        let size = (n * 3 * 4) as u64;
        if size > self.max_binding {
            return Err(FilterError::OperationFailed(format!(
                "{} byte image exceeds storage binding limit {}",
                size, self.max_binding
            )));
        }

        let mut planar = Vec::with_capacity(n * 3);
        let (r, g, b) = input.planes();
        planar.extend_from_slice(r);
        planar.extend_from_slice(g);
        planar.extend_from_slice(b);

        let src = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bilateral_src"),
            contents: bytemuck::cast_slice(&planar),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let dst = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bilateral_dst"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params = ParamsUniform {
            width: w,
            height: h,
            radius: radius_for(spatial_sigma) as u32,
            _pad0: 0,
            spatial_sigma,
            range_sigma,
            _pad1: [0.0; 2],
        };
        let uniform = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bilateral_params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bilateral_staging"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bilateral_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: src.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: dst.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: uniform.as_entire_binding() },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("bilateral_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("bilateral_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(w.div_ceil(16), h.div_ceil(16), 1);
        }
        encoder.copy_buffer_to_buffer(&dst, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| FilterError::OperationFailed("map channel closed".into()))?
            .map_err(|e| FilterError::OperationFailed(format!("map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let out: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        if out.len() != n * 3 {
            return Err(FilterError::BufferSizeMismatch {
                expected: n * 3,
                actual: out.len(),
            });
        }
        let (r, rest) = out.split_at(n);
        let (g, b) = rest.split_at(n);
        LinearImage::from_planes(w, h, r.to_vec(), g.to_vec(), b.to_vec())
            .map_err(|e| FilterError::OperationFailed(e.to_string()))
    }
}

impl GpuDevice for WgpuBilateral {
    fn name(&self) -> &str {
        match self.context.get() {
            Some(Ok(ctx)) => &ctx.adapter_name,
            _ => "wgpu",
        }
    }

    fn initialize(&self) -> FilterResult<()> {
        self.context().map(|_| ())
    }

    fn bilateral(&self, input: &LinearImage, spatial_sigma: f32, range_sigma: f32) -> FilterResult<LinearImage> {
        if spatial_sigma <= 0.0 || input.is_empty() {
            return Ok(input.clone());
        }
        self.context()?.run(input, spatial_sigma, range_sigma)
    }
}
