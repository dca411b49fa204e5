//! `RenderBackend` implemented on top of wgpu.
//!
//! Uniforms and texture bindings are accumulated the way an immediate mode API
//! would accept them. Each `draw_mesh` snapshots the per draw state and the
//! snapshots are replayed inside a single render pass when the frame ends.
//!
//! Every program shares the same bind group layout:
//!
//!   group 0 - frame uniforms (projection-view matrix and lights)
//!   group 1 - draw uniforms (model matrix and material colors, dynamic offset)
//!   group 2 - diffuse texture, diffuse sampler, normal texture, normal sampler
mod packed;
mod uniform_block;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use image::RgbaImage;
use slotmap::SlotMap;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    backend::{BackendError, MeshId, ProgramId, RenderBackend, RenderState, TextureId, UniformValue},
    models::Vertex,
    uniforms::UniformName,
};
use packed::{DrawBlock, FrameBlock, UniformSlot};
use uniform_block::UniformBlock;

pub use packed::{MAX_DIR_LIGHTS, MAX_POINT_LIGHTS};

pub const DEPTH_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_ENTRY_POINT: &str = "vs_main";
const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Number of texture units `bind_texture` accepts.
const MAX_TEXTURE_UNITS: usize = 8;

struct GpuProgram {
    name: String,
    pipeline: wgpu::RenderPipeline,
    frame_uniforms: UniformBlock<FrameBlock>,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuTexture {
    fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
        }
    }
}

/// The depth buffer attached to every frame.
struct DepthTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn new(device: &wgpu::Device, surface: &wgpu::SurfaceConfiguration) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth texture"),
            size: wgpu::Extent3d {
                width: surface.width,
                height: surface.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            _texture: texture,
            view,
        }
    }
}

struct BindGroupLayouts {
    frame: wgpu::BindGroupLayout,
    draw: wgpu::BindGroupLayout,
    textures: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let uniform_entry = |has_dynamic_offset: bool, size: usize| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        };

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        // Sampler binding types must match the filterable flag of the textures.
        let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        Self {
            frame: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("frame uniforms layout"),
                entries: &[uniform_entry(false, std::mem::size_of::<FrameBlock>())],
            }),
            draw: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("draw uniforms layout"),
                entries: &[uniform_entry(true, std::mem::size_of::<DrawBlock>())],
            }),
            textures: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("material textures layout"),
                entries: &[
                    texture_entry(0),
                    sampler_entry(1),
                    texture_entry(2),
                    sampler_entry(3),
                ],
            }),
        }
    }
}

/// One uniform buffer holding the `DrawBlock` of every draw in a frame, each
/// at an offset aligned to the device's dynamic offset alignment.
struct DrawUniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl DrawUniformArena {
    const INITIAL_CAPACITY: usize = 64;

    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let block_size = std::mem::size_of::<DrawBlock>() as u64;
        let stride = (block_size + alignment - 1) / alignment * alignment;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw uniforms"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(block_size),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Copy `blocks` to the GPU, growing the buffer when it is too small.
    fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        blocks: &[DrawBlock],
    ) {
        if blocks.is_empty() {
            return;
        }

        if blocks.len() > self.capacity {
            let capacity = blocks.len().next_power_of_two();
            debug!("growing draw uniform buffer to {capacity} entries");
            *self = Self::new(device, layout, capacity);
        }

        let stride = self.stride as usize;
        let mut bytes = vec![0u8; stride * blocks.len()];

        for (chunk, block) in bytes.chunks_exact_mut(stride).zip(blocks) {
            let block_bytes = bytemuck::bytes_of(block);
            chunk[..block_bytes.len()].copy_from_slice(block_bytes);
        }

        queue.write_buffer(&self.buffer, 0, &bytes);
    }

    fn offset(&self, index: usize) -> u32 {
        (self.stride * index as u64) as u32
    }
}

/// A draw call captured between `begin_frame` and `end_frame`.
struct RecordedDraw {
    program: ProgramId,
    mesh: MeshId,
    uniforms: DrawBlock,
    textures: (TextureId, TextureId),
}

struct Frame {
    output: wgpu::SurfaceTexture,
    draws: Vec<RecordedDraw>,
}

/// Uniform and texture state that applies to the next draw.
#[derive(Default)]
struct PendingDraw {
    uniforms: DrawBlock,
    bound_textures: [Option<TextureId>; MAX_TEXTURE_UNITS],
    diffuse_unit: Option<usize>,
    normal_unit: Option<usize>,
}

impl PendingDraw {
    fn texture_in(&self, unit: Option<usize>) -> Option<TextureId> {
        unit.and_then(|unit| self.bound_textures.get(unit).copied().flatten())
    }

    /// Unbind every texture after a draw.
    fn clear_textures(&mut self) {
        self.bound_textures = Default::default();
        self.diffuse_unit = None;
        self.normal_unit = None;
    }
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    layouts: BindGroupLayouts,
    state: RenderState,
    programs: SlotMap<ProgramId, GpuProgram>,
    meshes: SlotMap<MeshId, GpuMesh>,
    textures: SlotMap<TextureId, GpuTexture>,
    texture_bind_groups: HashMap<(TextureId, TextureId), wgpu::BindGroup>,
    default_diffuse: TextureId,
    default_normal: TextureId,
    draw_uniforms: DrawUniformArena,
    frame: Option<Frame>,
    active_program: Option<ProgramId>,
    pending: PendingDraw,
    /// Uniform names that were already reported as unusable.
    warned_uniforms: HashSet<String>,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>) -> Result<Self, BackendError> {
        let window_size = window.inner_size();

        // Create a WGPU instance that can use any supported graphics API.
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create the main rendering surface and then get an adapter that acts
        // as the handle to one of the machine's physical GPU(s).
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::NoAdapter)?;

        info!("using graphics adapter `{}`", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;

        // Set the main rendering surface to use an sRGB texture, and then allow
        // all shaders to assume they are writing to an sRGB back buffer.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(BackendError::IncompatibleSurface)?;

        if surface_format.is_srgb() {
            info!("rendering surface supports sRGB");
        } else {
            info!("no sRGB support found for the main rendering surface, defaulting to first available");
        }

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        let depth_texture = DepthTexture::new(&device, &surface_config);
        let layouts = BindGroupLayouts::new(&device);
        let draw_uniforms =
            DrawUniformArena::new(&device, &layouts.draw, DrawUniformArena::INITIAL_CAPACITY);

        let mut backend = Self {
            surface,
            device,
            queue,
            surface_config,
            depth_texture,
            layouts,
            state: RenderState::default(),
            programs: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            texture_bind_groups: HashMap::new(),
            default_diffuse: TextureId::default(),
            default_normal: TextureId::default(),
            draw_uniforms,
            frame: None,
            active_program: None,
            pending: PendingDraw::default(),
            warned_uniforms: HashSet::new(),
        };

        // Meshes without texture maps sample these instead.
        backend.default_diffuse = backend.create_texture(
            "default diffuse",
            &RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])),
        )?;
        backend.default_normal = backend.create_texture(
            "default normal",
            &RgbaImage::from_pixel(1, 1, image::Rgba([128, 128, 255, 255])),
        )?;

        Ok(backend)
    }

    fn warn_uniform_once(&mut self, name: &str, reason: &str) {
        if self.warned_uniforms.insert(name.to_owned()) {
            warn!("ignoring uniform `{name}`: {reason}");
        }
    }

    fn ensure_texture_bind_group(&mut self, key: (TextureId, TextureId)) {
        if self.texture_bind_groups.contains_key(&key) {
            return;
        }

        let (Some(diffuse), Some(normal)) = (self.textures.get(key.0), self.textures.get(key.1))
        else {
            return;
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material textures"),
            layout: &self.layouts.textures,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&normal.sampler),
                },
            ],
        });

        self.texture_bind_groups.insert(key, bind_group);
    }
}

impl RenderBackend for WgpuBackend {
    fn configure(&mut self, state: RenderState) -> Result<(), BackendError> {
        if !self.programs.is_empty() {
            warn!("render state changed after programs were linked; existing programs keep their old state");
        }

        self.state = state;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_texture = DepthTexture::new(&self.device, &self.surface_config);
    }

    #[tracing::instrument(skip(self, vertex_source, fragment_source))]
    fn create_program(
        &mut self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, BackendError> {
        // Shader compilation errors are reported through the device's error
        // handler, so capture them in a scope rather than letting them panic.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{name} vertex shader")),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });

        let fragment_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{name} fragment shader")),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Compile {
                name: name.to_owned(),
                message: err.to_string(),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{name} pipeline layout")),
            bind_group_layouts: &[&self.layouts.frame, &self.layouts.draw, &self.layouts.textures],
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(name),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: VERTEX_ENTRY_POINT,
                buffers: &[Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: FRAGMENT_ENTRY_POINT,
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_config.format,
                    blend: self.state.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: self.state.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_TEXTURE_FORMAT,
                depth_write_enabled: true,
                depth_compare: self.state.depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Link {
                name: name.to_owned(),
                message: err.to_string(),
            });
        }

        let frame_uniforms = UniformBlock::new(
            &self.device,
            Some(&format!("{name} frame uniforms")),
            FrameBlock::default(),
            &self.layouts.frame,
        );

        let id = self.programs.insert(GpuProgram {
            name: name.to_owned(),
            pipeline,
            frame_uniforms,
        });

        info!("linked shader program `{name}`");
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if let Some(removed) = self.programs.remove(program) {
            debug!("destroyed shader program `{}`", removed.name);
        }

        if self.active_program == Some(program) {
            self.active_program = None;
        }
    }

    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshId, BackendError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(BackendError::EmptyMesh(label.to_owned()));
        }

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertex buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} index buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }))
    }

    fn create_texture(&mut self, label: &str, image: &RgbaImage) -> Result<TextureId, BackendError> {
        let texture = GpuTexture::from_image(&self.device, &self.queue, image, Some(label));
        Ok(self.textures.insert(texture))
    }

    fn begin_frame(&mut self) -> Result<(), BackendError> {
        let output = self.surface.get_current_texture()?;

        for program in self.programs.values_mut() {
            program.frame_uniforms.values_mut().reset_lights();
        }

        self.frame = Some(Frame {
            output,
            draws: Vec::new(),
        });
        self.active_program = None;
        self.pending = PendingDraw::default();

        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.programs.contains_key(program) {
            warn!("use_program called with a destroyed program");
            return;
        }

        if self.active_program != Some(program) {
            self.pending = PendingDraw::default();
        }

        self.active_program = Some(program);
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(program) = self.active_program else {
            self.warn_uniform_once(name, "no program is active");
            return;
        };

        let parsed: UniformName = match name.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                self.warn_uniform_once(name, &err.to_string());
                return;
            }
        };

        let applied = match (UniformSlot::of(parsed), value) {
            (UniformSlot::Frame, value) => self
                .programs
                .get_mut(program)
                .is_some_and(|p| p.frame_uniforms.values_mut().apply(parsed, value)),
            (UniformSlot::Draw, value) => self.pending.uniforms.apply(parsed, value),
            (UniformSlot::DiffuseSampler, UniformValue::I32(unit)) => {
                self.pending.diffuse_unit = usize::try_from(unit).ok();
                self.pending.diffuse_unit.is_some()
            }
            (UniformSlot::NormalSampler, UniformValue::I32(unit)) => {
                self.pending.normal_unit = usize::try_from(unit).ok();
                self.pending.normal_unit.is_some()
            }
            _ => false,
        };

        if !applied {
            self.warn_uniform_once(name, "value does not fit the uniform");
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        match self.pending.bound_textures.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture),
            None => warn!("texture unit {unit} is out of range"),
        }
    }

    fn draw_mesh(&mut self, mesh: MeshId) {
        let Some(program) = self.active_program else {
            warn!("draw_mesh called without an active program");
            return;
        };

        let Some(frame) = self.frame.as_mut() else {
            warn!("draw_mesh called outside of a frame");
            return;
        };

        if !self.meshes.contains_key(mesh) {
            warn!("draw_mesh called with an unknown mesh");
            return;
        }

        let diffuse_map = self.pending.texture_in(self.pending.diffuse_unit);
        let normal_map = self.pending.texture_in(self.pending.normal_unit);

        let mut uniforms = self.pending.uniforms;
        uniforms.set_texture_flags(diffuse_map.is_some(), normal_map.is_some());

        frame.draws.push(RecordedDraw {
            program,
            mesh,
            uniforms,
            textures: (
                diffuse_map.unwrap_or(self.default_diffuse),
                normal_map.unwrap_or(self.default_normal),
            ),
        });

        self.pending.clear_textures();
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        let Some(frame) = self.frame.take() else {
            warn!("end_frame called without a matching begin_frame");
            return Ok(());
        };

        for program in self.programs.values() {
            program.frame_uniforms.update_gpu(&self.queue);
        }

        let blocks: Vec<DrawBlock> = frame.draws.iter().map(|draw| draw.uniforms).collect();
        self.draw_uniforms
            .write(&self.device, &self.queue, &self.layouts.draw, &blocks);

        for draw in &frame.draws {
            self.ensure_texture_bind_group(draw.textures);
        }

        let view = frame
            .output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.state.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut bound_program = None;

            for (index, draw) in frame.draws.iter().enumerate() {
                // Programs destroyed after a draw was recorded are skipped.
                let (Some(program), Some(mesh), Some(textures)) = (
                    self.programs.get(draw.program),
                    self.meshes.get(draw.mesh),
                    self.texture_bind_groups.get(&draw.textures),
                ) else {
                    continue;
                };

                if bound_program != Some(draw.program) {
                    render_pass.set_pipeline(&program.pipeline);
                    render_pass.set_bind_group(0, program.frame_uniforms.bind_group(), &[]);
                    bound_program = Some(draw.program);
                }

                render_pass.set_bind_group(
                    1,
                    &self.draw_uniforms.bind_group,
                    &[self.draw_uniforms.offset(index)],
                );
                render_pass.set_bind_group(2, textures, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.output.present();

        Ok(())
    }
}
