//! The render engine: owns the one GPU surface, the static full-screen
//! quad, and the program/texture caches, and dispatches single-frame
//! renders.
//!
//! An engine is an explicit instance owned by its caller — construct one,
//! pass it by `&mut`, drop it when done. Nothing here is global, and the
//! `&mut` receivers are what serialize all GPU access for one instance.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use retrofx_core::{EffectSettings, EngineConfig, FrameBuffer, FxError, FxResult};

use crate::gpu::GpuContext;
use crate::registry::{self, ProgramKey};
use crate::source::{SourceLoader, SourceRef};
use crate::texture_cache::TextureCache;
use crate::uniforms;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    resolution: [f32; 2],
    _pad: [f32; 2],
}

// Triangle strip covering the viewport. Texcoords flip v so image row 0
// lands on the top output row.
const QUAD_POSITIONS: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];
const QUAD_TEXCOORDS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// The single offscreen drawing target. Reallocated only when the output
/// dimensions change between calls.
struct RenderTarget {
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTarget {
    fn create(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("render_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            width,
            height,
            texture,
            view,
        }
    }
}

/// Compiled pipelines, one per `(effect, variant)` key, retained for the
/// engine lifetime. A failed compile leaves the cache unchanged so the
/// failure is observable again on the next call — never a partial entry.
struct ProgramCache {
    pipelines: HashMap<ProgramKey, wgpu::RenderPipeline>,
    compile_count: u64,
}

impl ProgramCache {
    fn new() -> Self {
        Self {
            pipelines: HashMap::new(),
            compile_count: 0,
        }
    }

    fn get_or_compile(
        &mut self,
        gpu: &GpuContext,
        layout: &wgpu::PipelineLayout,
        key: ProgramKey,
    ) -> FxResult<&wgpu::RenderPipeline> {
        if !self.pipelines.contains_key(&key) {
            let spec = registry::kernel(key)
                .ok_or_else(|| FxError::shader(key.to_string(), "no kernel registered"))?;

            tracing::info!(key = %key, "compiling effect program");

            // Naga reports bad WGSL through the validation error scope
            // rather than a return value.
            gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

            let module = gpu
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(spec.label),
                    source: wgpu::ShaderSource::Wgsl(spec.module_source().into()),
                });

            let pipeline = gpu
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&format!("fx_pipeline_{}", key)),
                    layout: Some(layout),
                    vertex: wgpu::VertexState {
                        module: &module,
                        entry_point: "vs_main",
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        buffers: &[
                            wgpu::VertexBufferLayout {
                                array_stride: 8,
                                step_mode: wgpu::VertexStepMode::Vertex,
                                attributes: &[wgpu::VertexAttribute {
                                    format: wgpu::VertexFormat::Float32x2,
                                    offset: 0,
                                    shader_location: 0,
                                }],
                            },
                            wgpu::VertexBufferLayout {
                                array_stride: 8,
                                step_mode: wgpu::VertexStepMode::Vertex,
                                attributes: &[wgpu::VertexAttribute {
                                    format: wgpu::VertexFormat::Float32x2,
                                    offset: 0,
                                    shader_location: 1,
                                }],
                            },
                        ],
                    },
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleStrip,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    fragment: Some(wgpu::FragmentState {
                        module: &module,
                        entry_point: "fs_main",
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: TARGET_FORMAT,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    multiview: None,
                });

            if let Some(err) = pollster::block_on(gpu.device.pop_error_scope()) {
                return Err(FxError::shader(key.to_string(), err.to_string()));
            }

            self.pipelines.insert(key, pipeline);
            self.compile_count += 1;
        }

        Ok(&self.pipelines[&key])
    }
}

/// The effect rendering engine.
pub struct FxEngine {
    gpu: GpuContext,
    loader: SourceLoader,
    programs: ProgramCache,
    textures: TextureCache,
    target: Option<RenderTarget>,
    position_buffer: wgpu::Buffer,
    texcoord_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

impl FxEngine {
    /// Initialize the engine with default configuration.
    ///
    /// Fails with [`FxError::UnsupportedHardware`] when no compatible
    /// graphics context can be created; that is unrecoverable and must
    /// surface to the caller, not be retried.
    pub fn new() -> FxResult<Self> {
        Self::with_config(&EngineConfig::default())
    }

    /// Initialize the engine with an explicit configuration.
    pub fn with_config(config: &EngineConfig) -> FxResult<Self> {
        let gpu = GpuContext::init()?;

        let position_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad_positions"),
                contents: bytemuck::cast_slice(&QUAD_POSITIONS),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let texcoord_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad_texcoords"),
                contents: bytemuck::cast_slice(&QUAD_TEXCOORDS),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("source_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout =
            gpu.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("fx_bind_group_layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("fx_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        Ok(Self {
            gpu,
            loader: SourceLoader::new(config.source.relay_endpoint.clone()),
            programs: ProgramCache::new(),
            textures: TextureCache::new(),
            target: None,
            position_buffer,
            texcoord_buffer,
            sampler,
            bind_group_layout,
            pipeline_layout,
        })
    }

    /// Resolve a source reference, render it with `settings`, and return
    /// lossless PNG bytes at `width x height`.
    pub fn render_source(
        &mut self,
        source: &SourceRef,
        width: u32,
        height: u32,
        settings: &EffectSettings,
    ) -> FxResult<Vec<u8>> {
        let frame = self.loader.resolve(source)?;
        self.render_frame(&frame, &source.cache_key(), width, height, settings)
    }

    /// Render one decoded bitmap and return lossless PNG bytes.
    pub fn render_frame(
        &mut self,
        source: &FrameBuffer,
        source_key: &str,
        width: u32,
        height: u32,
        settings: &EffectSettings,
    ) -> FxResult<Vec<u8>> {
        let frame = self.render_to_buffer(source, source_key, width, height, settings)?;
        encode_png(&frame)
    }

    /// Render one decoded bitmap into a raw frame buffer. The video path
    /// uses this to feed the encoder without a PNG round trip.
    pub fn render_to_buffer(
        &mut self,
        source: &FrameBuffer,
        source_key: &str,
        width: u32,
        height: u32,
        settings: &EffectSettings,
    ) -> FxResult<FrameBuffer> {
        // Resize the target only when the output dimensions changed.
        let needs_target = !self
            .target
            .as_ref()
            .is_some_and(|t| t.width == width && t.height == height);
        if needs_target {
            tracing::debug!(width, height, "allocating render target");
            self.target = Some(RenderTarget::create(&self.gpu, width, height));
        }
        let target = self.target.as_ref().expect("target allocated above");

        let texture = self
            .textures
            .upload_if_changed(&self.gpu, source, source_key);

        let key = ProgramKey::for_settings(settings);
        let pipeline = self
            .programs
            .get_or_compile(&self.gpu, &self.pipeline_layout, key)?;

        let globals = Globals {
            resolution: [width as f32, height as f32],
            _pad: [0.0; 2],
        };
        let globals_buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("fx_globals"),
                contents: bytemuck::bytes_of(&globals),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let params_buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("fx_params"),
                contents: &uniforms::pack(settings),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fx_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let padded_bytes_per_row = (width * 4 + 255) & !255;
        let readback = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fx_readback"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fx_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, self.position_buffer.slice(..));
            pass.set_vertex_buffer(1, self.texcoord_buffer.slice(..));
            pass.draw(0..4, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.gpu.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        self.gpu.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            _ => {
                return Err(FxError::Decode(
                    "failed to map render readback buffer".into(),
                ))
            }
        }

        let data = slice.get_mapped_range();
        let mut result = FrameBuffer::new(width, height);
        let row_bytes = (width * 4) as usize;
        for y in 0..height as usize {
            let src_start = y * padded_bytes_per_row as usize;
            let dst_start = y * row_bytes;
            result.data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&data[src_start..src_start + row_bytes]);
        }
        drop(data);
        readback.unmap();

        Ok(result)
    }

    /// Total program compilations so far. Stays flat across repeated
    /// renders of the same `(effect, variant)`.
    pub fn program_compile_count(&self) -> u64 {
        self.programs.compile_count
    }

    /// Total texture uploads so far. Stays flat while `(source_key,
    /// dimensions)` is unchanged, whatever the settings do.
    pub fn texture_upload_count(&self) -> u64 {
        self.textures.upload_count()
    }

    /// The loader used by [`render_source`](Self::render_source).
    pub fn source_loader(&self) -> &SourceLoader {
        &self.loader
    }
}

/// Encode a frame as a lossless PNG byte stream.
pub fn encode_png(frame: &FrameBuffer) -> FxResult<Vec<u8>> {
    let img: image::RgbaImage =
        image::ImageBuffer::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| FxError::Decode("frame buffer size mismatch".into()))?;

    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .map_err(|e| FxError::Decode(format!("PNG encode failed: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_roundtrip() {
        let frame = FrameBuffer::solid(3, 2, [10, 20, 30, 255]);
        let bytes = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_encode_png_rejects_bad_buffer() {
        let frame = FrameBuffer {
            data: vec![0u8; 7],
            width: 2,
            height: 2,
        };
        assert!(encode_png(&frame).is_err());
    }
}
