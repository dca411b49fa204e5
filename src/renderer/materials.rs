use std::rc::Rc;

use glam::Vec3;

use super::{backend::RenderBackend, shaders::ShaderProgram, textures::Texture, uniforms};

/// Texture unit the diffuse map is bound to.
pub const DIFFUSE_TEXTURE_UNIT: u32 = 0;

/// Texture unit the normal map is bound to.
pub const NORMAL_TEXTURE_UNIT: u32 = 1;

/// Surface properties for a mesh with phong style lighting.
///
/// A material has constant ambient, diffuse and specular colors and optional
/// diffuse and normal texture maps. Meshes without a texture map are drawn
/// with the backend's default 1x1 texture for that unit.
#[derive(Clone, Debug)]
pub struct Material {
    pub ambient_color: Vec3,
    pub diffuse_color: Vec3,
    pub specular_color: Vec3,
    pub diffuse_map: Option<Rc<Texture>>,
    pub normal_map: Option<Rc<Texture>>,
}

impl Material {
    /// Upload the material colors to `program` and bind any texture maps.
    pub fn bind(&self, backend: &mut dyn RenderBackend, program: &ShaderProgram) {
        program.set_vec3(backend, uniforms::AMBIENT_COLOR, self.ambient_color);
        program.set_vec3(backend, uniforms::DIFFUSE_COLOR, self.diffuse_color);
        program.set_vec3(backend, uniforms::SPECULAR_COLOR, self.specular_color);

        if let Some(diffuse_map) = &self.diffuse_map {
            backend.bind_texture(DIFFUSE_TEXTURE_UNIT, diffuse_map.id());
            program.set_i32(
                backend,
                uniforms::TEXTURE_SAMPLER,
                DIFFUSE_TEXTURE_UNIT as i32,
            );
        }

        if let Some(normal_map) = &self.normal_map {
            backend.bind_texture(NORMAL_TEXTURE_UNIT, normal_map.id());
            program.set_i32(
                backend,
                uniforms::NORMAL_SAMPLER,
                NORMAL_TEXTURE_UNIT as i32,
            );
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        MaterialBuilder::new().build()
    }
}

/// A fluent builder for creating Materials without having to specify every
/// optional property.
#[derive(Debug, Default)]
pub struct MaterialBuilder {
    ambient_color: Option<Vec3>,
    diffuse_color: Option<Vec3>,
    specular_color: Option<Vec3>,
    diffuse_map: Option<Rc<Texture>>,
    normal_map: Option<Rc<Texture>>,
}

impl MaterialBuilder {
    pub const DEFAULT_AMBIENT_COLOR: Vec3 = Vec3::new(0.1, 0.1, 0.1);
    pub const DEFAULT_DIFFUSE_COLOR: Vec3 = Vec3::new(1.0, 1.0, 1.0);
    pub const DEFAULT_SPECULAR_COLOR: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    /// Create a new material builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the material's ambient color.
    pub fn ambient_color(mut self, color: Vec3) -> Self {
        self.ambient_color = Some(color);
        self
    }

    /// Set the material's diffuse color.
    pub fn diffuse_color(mut self, color: Vec3) -> Self {
        self.diffuse_color = Some(color);
        self
    }

    /// Set the material's specular color.
    pub fn specular_color(mut self, color: Vec3) -> Self {
        self.specular_color = Some(color);
        self
    }

    /// Set the material's diffuse texture map.
    pub fn diffuse_map(mut self, texture: Rc<Texture>) -> Self {
        self.diffuse_map = Some(texture);
        self
    }

    /// Set the material's normal texture map.
    pub fn normal_map(mut self, texture: Rc<Texture>) -> Self {
        self.normal_map = Some(texture);
        self
    }

    /// Use the properties of this material builder to construct a new material.
    pub fn build(self) -> Material {
        Material {
            ambient_color: self.ambient_color.unwrap_or(Self::DEFAULT_AMBIENT_COLOR),
            diffuse_color: self.diffuse_color.unwrap_or(Self::DEFAULT_DIFFUSE_COLOR),
            specular_color: self
                .specular_color
                .unwrap_or(Self::DEFAULT_SPECULAR_COLOR),
            diffuse_map: self.diffuse_map,
            normal_map: self.normal_map,
        }
    }
}
