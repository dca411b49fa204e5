//! The seam between the renderer and the GPU API.
//!
//! The renderer talks to the GPU in terms of shader programs, meshes, textures
//! and named uniforms. `WgpuBackend` implements this on top of wgpu; tests use
//! a recording backend that remembers every call instead of drawing.
use glam::{Mat4, Vec3};
use image::RgbaImage;
use slotmap::new_key_type;
use thiserror::Error;

use super::models::Vertex;

new_key_type! {
    /// Handle to a linked shader program owned by a backend.
    pub struct ProgramId;
    /// Handle to a GPU vertex and index buffer pair owned by a backend.
    pub struct MeshId;
    /// Handle to a GPU texture owned by a backend.
    pub struct TextureId;
}

/// Fixed pipeline state applied to every program the backend links.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderState {
    pub depth_compare: wgpu::CompareFunction,
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub clear_color: wgpu::Color,
}

impl Default for RenderState {
    /// Depth testing with less-or-equal, standard alpha blending, back-face
    /// culling and a dark blue clear color.
    fn default() -> Self {
        Self {
            depth_compare: wgpu::CompareFunction::LessEqual,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            cull_mode: Some(wgpu::Face::Back),
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.2,
                a: 1.0,
            },
        }
    }
}

/// A value assigned to a named shader uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
    F32(f32),
    I32(i32),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no compatible graphics adapter was found")]
    NoAdapter,
    #[error("failed to create the graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create the rendering surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("the graphics adapter cannot present to the window surface")]
    IncompatibleSurface,
    #[error("shader program `{name}` failed to compile: {message}")]
    Compile { name: String, message: String },
    #[error("shader program `{name}` failed to link: {message}")]
    Link { name: String, message: String },
    #[error("mesh `{0}` has no vertices or indices")]
    EmptyMesh(String),
    #[error("the next surface frame is unavailable: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}

/// GPU operations the renderer needs.
///
/// Uniform and texture calls apply to the program selected by the most recent
/// `use_program`, mirroring how a classic immediate mode graphics API behaves.
pub trait RenderBackend {
    /// Apply the fixed pipeline state. Must be called before any program is
    /// created.
    fn configure(&mut self, state: RenderState) -> Result<(), BackendError>;

    /// Resize the drawable surface.
    fn resize(&mut self, width: u32, height: u32);

    /// Compile both shader stages and link them into a program.
    fn create_program(
        &mut self,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, BackendError>;

    /// Release a program created by `create_program`.
    fn destroy_program(&mut self, program: ProgramId);

    /// Upload a triangle list to the GPU.
    fn create_mesh(
        &mut self,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshId, BackendError>;

    /// Upload an sRGB image to the GPU.
    fn create_texture(&mut self, label: &str, image: &RgbaImage) -> Result<TextureId, BackendError>;

    /// Start a new frame by clearing color and depth.
    fn begin_frame(&mut self) -> Result<(), BackendError>;

    /// Make `program` the active program.
    fn use_program(&mut self, program: ProgramId);

    /// Assign a value to a named uniform of the active program. Names that the
    /// program does not declare are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Bind `texture` to texture unit `unit` for the next draw.
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Draw `mesh` with the active program and the current uniform values.
    fn draw_mesh(&mut self, mesh: MeshId);

    /// Finish the frame and present it.
    fn end_frame(&mut self) -> Result<(), BackendError>;
}
