use super::{
    backend::{MeshId, RenderBackend},
    materials::Material,
    shaders::ShaderProgram,
};

/// Vertex layout shared by every mesh and shader program.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress
                        + std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// A GPU resident triangle list and the material it is drawn with.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    gpu_mesh: MeshId,
    index_count: u32,
    material: Material,
}

impl Mesh {
    /// Create a new mesh from data already uploaded with `create_mesh`.
    pub fn new(name: &str, gpu_mesh: MeshId, index_count: u32, material: Material) -> Self {
        Self {
            name: name.to_owned(),
            gpu_mesh,
            index_count,
            material,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gpu_mesh(&self) -> MeshId {
        self.gpu_mesh
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn material(&self) -> &Material {
        &self.material
    }
}

/// A loaded model file made of one or more meshes. Models are shared between
/// every scene object that references the same file.
#[derive(Debug)]
pub struct Model {
    name: String,
    meshes: Vec<Mesh>,
}

impl Model {
    pub fn new(name: &str, meshes: Vec<Mesh>) -> Self {
        Self {
            name: name.to_owned(),
            meshes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Draw every mesh in the model with `program`, which must already be the
    /// active program. The caller is responsible for setting the model matrix.
    pub fn draw(&self, backend: &mut dyn RenderBackend, program: &ShaderProgram) {
        for mesh in &self.meshes {
            mesh.material.bind(backend, program);
            backend.draw_mesh(mesh.gpu_mesh);
        }
    }
}
