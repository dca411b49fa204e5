use glam::Vec3;

use super::{
    backend::RenderBackend,
    shaders::ShaderProgram,
    uniforms::{DirLightField, PointLightField, UniformName},
};
use crate::config::LightConfig;

/// A light that shines equally in all directions from a point.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub strength: f32,
}

impl PointLight {
    pub fn from_config(config: &LightConfig) -> Self {
        Self {
            position: config.position,
            color: config.color,
            strength: config.strength,
        }
    }

    /// Set the `point_lights[index]` uniforms of the active program.
    pub fn upload(&self, index: usize, backend: &mut dyn RenderBackend, program: &ShaderProgram) {
        let name = |field| UniformName::PointLight { index, field }.to_string();

        program.set_vec3(backend, &name(PointLightField::Position), self.position);
        program.set_vec3(backend, &name(PointLightField::Color), self.color);
        program.set_f32(backend, &name(PointLightField::Strength), self.strength);
    }
}

/// A light shining in one direction from a point, limited to a cone. Light is
/// full strength inside `inner_angle` and fades out by `outer_angle`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    /// Normalized direction the light shines in.
    pub direction: Vec3,
    pub color: Vec3,
    pub strength: f32,
    /// Cone half angle in radians.
    pub inner_angle: f32,
    /// Cone half angle in radians.
    pub outer_angle: f32,
}

impl DirectionalLight {
    /// Create a light from its configuration entry. Cone angles are converted
    /// from degrees and a zero direction falls back to straight down.
    pub fn from_config(config: &LightConfig) -> Self {
        Self {
            position: config.position,
            direction: config.direction.try_normalize().unwrap_or(Vec3::NEG_Y),
            color: config.color,
            strength: config.strength,
            inner_angle: config.inner_angle.to_radians(),
            outer_angle: config.outer_angle.to_radians(),
        }
    }

    /// Set the `dir_lights[index]` uniforms of the active program.
    pub fn upload(&self, index: usize, backend: &mut dyn RenderBackend, program: &ShaderProgram) {
        let name = |field| UniformName::DirLight { index, field }.to_string();

        program.set_vec3(backend, &name(DirLightField::Position), self.position);
        program.set_vec3(backend, &name(DirLightField::Direction), self.direction);
        program.set_vec3(backend, &name(DirLightField::Color), self.color);
        program.set_f32(backend, &name(DirLightField::Strength), self.strength);
        program.set_f32(backend, &name(DirLightField::OuterAngle), self.outer_angle);
        program.set_f32(backend, &name(DirLightField::InnerAngle), self.inner_angle);
    }
}
