//! wgpu implementation of [`RenderBackend`].

use crate::mesh::{MeshData, Vertex};
use crate::params::RenderConfig;
use crate::renderer::{BackendError, RenderBackend, SceneUniforms};
use crate::shader::reflect::{SAMPLER_BINDING, TEXTURE_BINDING, UNIFORMS_BINDING};
use crate::shader::{
    reflect_program, ProgramInterface, SceneBindings, ShaderCompiler, ShaderError, ShaderSources,
    VertexAttribute,
};
use crate::texture::TextureImage;

use super::gpu::{FrameTarget, GpuContext, DEPTH_FORMAT};
use super::resources::{create_sampler, GpuMesh, GpuTexture};

/// Linked pipeline plus the bind group built for the current texture
pub struct WgpuProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    interface: ProgramInterface,
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

/// Draws the scene into the window surface
pub struct WgpuBackend {
    gpu: GpuContext,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    fallback_texture: GpuTexture,
    next_generation: u64,
    clear_colour: wgpu::Color,
}

impl WgpuBackend {
    pub fn new(gpu: GpuContext, config: &RenderConfig) -> Result<Self, BackendError> {
        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = create_sampler(&gpu.device);

        // Bound when a program samples the texture before one was provided
        let white = TextureImage::checkerboard(1, 1, [255; 4], [255; 4]);
        let fallback_texture = GpuTexture::upload(&gpu.device, &gpu.queue, &white, 0)?;

        let [r, g, b, a] = config.clear_colour;
        Ok(Self {
            gpu,
            uniform_buffer,
            sampler,
            fallback_texture,
            next_generation: 1,
            clear_colour: wgpu::Color { r, g, b, a },
        })
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut GpuContext {
        &mut self.gpu
    }

    /// Acquire the next frame target
    pub fn begin_frame(&self) -> Result<FrameTarget, wgpu::SurfaceError> {
        self.gpu.begin_frame()
    }

    pub fn present(&self, frame: FrameTarget) {
        self.gpu.present(frame);
    }

    fn begin_pass<'f>(&self, frame: &'f mut FrameTarget) -> wgpu::RenderPass<'f> {
        frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.gpu.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    fn create_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        bindings: SceneBindings,
        texture: &GpuTexture,
    ) -> wgpu::BindGroup {
        let mut entries = Vec::with_capacity(3);
        if bindings.uniforms {
            entries.push(wgpu::BindGroupEntry {
                binding: UNIFORMS_BINDING,
                resource: self.uniform_buffer.as_entire_binding(),
            });
        }
        if bindings.texture {
            entries.push(wgpu::BindGroupEntry {
                binding: TEXTURE_BINDING,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
        }
        if bindings.sampler {
            entries.push(wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout,
            entries: &entries,
        })
    }
}

/// Stages that read a given scene binding
fn visibility(interface: &ProgramInterface, used: fn(&SceneBindings) -> bool) -> wgpu::ShaderStages {
    let mut stages = wgpu::ShaderStages::NONE;
    if used(&interface.vertex.bindings) {
        stages |= wgpu::ShaderStages::VERTEX;
    }
    if used(&interface.fragment.bindings) {
        stages |= wgpu::ShaderStages::FRAGMENT;
    }
    stages
}

/// Layout entries for exactly the bindings the program reads
fn layout_entries(interface: &ProgramInterface) -> Vec<wgpu::BindGroupLayoutEntry> {
    let bindings = interface.bindings();
    let mut entries = Vec::with_capacity(3);
    if bindings.uniforms {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: UNIFORMS_BINDING,
            visibility: visibility(interface, |b| b.uniforms),
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<SceneUniforms>() as u64),
            },
            count: None,
        });
    }
    if bindings.texture {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: TEXTURE_BINDING,
            visibility: visibility(interface, |b| b.texture),
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
    }
    if bindings.sampler {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: SAMPLER_BINDING,
            visibility: visibility(interface, |b| b.sampler),
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

fn vertex_format(attribute: VertexAttribute) -> wgpu::VertexFormat {
    match attribute.components() {
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

impl ShaderCompiler for WgpuBackend {
    type Program = WgpuProgram;

    /// naga validation first, then pipeline creation inside a validation
    /// error scope so interface mismatches between the stages surface as a
    /// link error instead of a device error.
    fn compile(&mut self, sources: &ShaderSources) -> Result<WgpuProgram, ShaderError> {
        let interface = reflect_program(sources)?;
        let device = &self.gpu.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(sources.vertex.as_str().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(sources.fragment.as_str().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &layout_entries(&interface),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let attributes: Vec<wgpu::VertexAttribute> = interface
            .vertex_inputs()
            .iter()
            .map(|a| wgpu::VertexAttribute {
                offset: a.offset(),
                shader_location: a.location(),
                format: vertex_format(*a),
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(interface.vertex.entry_point.as_str()),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(interface.fragment.entry_point.as_str()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gpu.format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link(error.to_string()));
        }

        Ok(WgpuProgram {
            pipeline,
            bind_group_layout,
            interface,
            bind_group: None,
        })
    }
}

impl RenderBackend for WgpuBackend {
    type Geometry = GpuMesh;
    type Texture = GpuTexture;
    type Frame = FrameTarget;

    fn upload_geometry(&mut self, mesh: &MeshData) -> Result<GpuMesh, BackendError> {
        GpuMesh::upload(&self.gpu.device, mesh)
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<GpuTexture, BackendError> {
        let texture = GpuTexture::upload(&self.gpu.device, &self.gpu.queue, image, self.next_generation)?;
        self.next_generation += 1;
        Ok(texture)
    }

    fn draw(
        &mut self,
        frame: &mut FrameTarget,
        program: &mut WgpuProgram,
        geometry: &GpuMesh,
        texture: Option<&GpuTexture>,
        uniforms: &SceneUniforms,
    ) -> Result<(), BackendError> {
        let texture = texture.unwrap_or(&self.fallback_texture);
        let stale = program
            .bind_group
            .as_ref()
            .map_or(true, |(generation, _)| *generation != texture.generation);
        if stale {
            let group = self.create_bind_group(
                &program.bind_group_layout,
                program.interface.bindings(),
                texture,
            );
            program.bind_group = Some((texture.generation, group));
        }
        let Some((_, bind_group)) = program.bind_group.as_ref() else {
            return Err(BackendError::Draw("bind group missing".into()));
        };

        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));

        let mut pass = self.begin_pass(frame);
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
        pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..geometry.index_count, 0, 0..1);
        Ok(())
    }

    fn clear(&mut self, frame: &mut FrameTarget) -> Result<(), BackendError> {
        drop(self.begin_pass(frame));
        Ok(())
    }
}
