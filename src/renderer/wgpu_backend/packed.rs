//! Rust structs with memory layouts that match the uniform blocks declared in
//! every shader program.
//!
//! Named uniforms set through the backend are written into these blocks and
//! copied to the GPU when the frame ends. To keep transfers small, vec3 values
//! are stored in `Vec4`s with an extra scalar packed into `.w`, for example:
//!
//!   point_light.position.xyz = light_position
//!   point_light.position.w   = light_strength
//!
//! These structs must exactly match the memory layout of their shader
//! counterparts. All fields are aligned to 16 bytes as WebGPU requires for
//! uniform buffers.
use glam::{Mat4, UVec4, Vec3, Vec4};

use crate::renderer::{
    backend::UniformValue,
    uniforms::{DirLightField, PointLightField, UniformName},
};

/// Number of point lights each program can receive.
pub const MAX_POINT_LIGHTS: usize = 8;

/// Number of directional lights each program can receive.
pub const MAX_DIR_LIGHTS: usize = 8;

#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedPointLight {
    pub position: Vec4, // .w is strength.
    pub color: Vec4,    // .w is unused.
}

#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedDirLight {
    pub position: Vec4,  // .w is strength.
    pub direction: Vec4, // .w is the outer cone angle in radians.
    pub color: Vec4,     // .w is the inner cone angle in radians.
}

/// Uniforms shared by every draw of a program in one frame (group 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameBlock {
    pub proj_view_matrix: Mat4,
    pub point_lights: [PackedPointLight; MAX_POINT_LIGHTS],
    pub dir_lights: [PackedDirLight; MAX_DIR_LIGHTS],
    /// .x is the number of point lights, .y the number of directional lights.
    pub light_counts: UVec4,
}

impl Default for FrameBlock {
    fn default() -> Self {
        Self {
            proj_view_matrix: Mat4::IDENTITY,
            point_lights: [PackedPointLight::default(); MAX_POINT_LIGHTS],
            dir_lights: [PackedDirLight::default(); MAX_DIR_LIGHTS],
            light_counts: UVec4::ZERO,
        }
    }
}

impl FrameBlock {
    /// Forget the lights set during the previous frame.
    pub fn reset_lights(&mut self) {
        self.light_counts = UVec4::ZERO;
    }

    /// Write `value` to the field called `name`. Returns `false` if the field
    /// is not part of this block, the light index is out of range or the value
    /// has the wrong type.
    pub fn apply(&mut self, name: UniformName, value: UniformValue) -> bool {
        match (name, value) {
            (UniformName::ProjViewMatrix, UniformValue::Mat4(m)) => {
                self.proj_view_matrix = m;
                true
            }
            (UniformName::PointLight { index, field }, value) if index < MAX_POINT_LIGHTS => {
                let light = &mut self.point_lights[index];
                let applied = match (field, value) {
                    (PointLightField::Position, UniformValue::Vec3(v)) => {
                        set_xyz(&mut light.position, v)
                    }
                    (PointLightField::Color, UniformValue::Vec3(v)) => set_xyz(&mut light.color, v),
                    (PointLightField::Strength, UniformValue::F32(s)) => {
                        set_w(&mut light.position, s)
                    }
                    _ => false,
                };

                if applied {
                    self.light_counts.x = self.light_counts.x.max(index as u32 + 1);
                }

                applied
            }
            (UniformName::DirLight { index, field }, value) if index < MAX_DIR_LIGHTS => {
                let light = &mut self.dir_lights[index];
                let applied = match (field, value) {
                    (DirLightField::Position, UniformValue::Vec3(v)) => {
                        set_xyz(&mut light.position, v)
                    }
                    (DirLightField::Direction, UniformValue::Vec3(v)) => {
                        set_xyz(&mut light.direction, v)
                    }
                    (DirLightField::Color, UniformValue::Vec3(v)) => set_xyz(&mut light.color, v),
                    (DirLightField::Strength, UniformValue::F32(s)) => {
                        set_w(&mut light.position, s)
                    }
                    (DirLightField::OuterAngle, UniformValue::F32(a)) => {
                        set_w(&mut light.direction, a)
                    }
                    (DirLightField::InnerAngle, UniformValue::F32(a)) => set_w(&mut light.color, a),
                    _ => false,
                };

                if applied {
                    self.light_counts.y = self.light_counts.y.max(index as u32 + 1);
                }

                applied
            }
            _ => false,
        }
    }
}

/// Uniforms that change with every draw (group 1, dynamic offset).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawBlock {
    pub model_matrix: Mat4,
    pub ambient_color: Vec4,  // .w is 1 when a diffuse map is bound.
    pub diffuse_color: Vec4,  // .w is 1 when a normal map is bound.
    pub specular_color: Vec4, // .w is unused.
}

impl Default for DrawBlock {
    fn default() -> Self {
        Self {
            model_matrix: Mat4::IDENTITY,
            ambient_color: Vec4::ZERO,
            diffuse_color: vec3_w(Vec3::ONE, 0.0),
            specular_color: Vec4::ZERO,
        }
    }
}

impl DrawBlock {
    /// Write `value` to the field called `name`. Returns `false` if the field
    /// is not part of this block or the value has the wrong type.
    pub fn apply(&mut self, name: UniformName, value: UniformValue) -> bool {
        match (name, value) {
            (UniformName::ModelMatrix, UniformValue::Mat4(m)) => {
                self.model_matrix = m;
                true
            }
            (UniformName::AmbientColor, UniformValue::Vec3(v)) => {
                set_xyz(&mut self.ambient_color, v)
            }
            (UniformName::DiffuseColor, UniformValue::Vec3(v)) => {
                set_xyz(&mut self.diffuse_color, v)
            }
            (UniformName::SpecularColor, UniformValue::Vec3(v)) => {
                set_xyz(&mut self.specular_color, v)
            }
            _ => false,
        }
    }

    /// Record which optional texture maps are bound for this draw.
    pub fn set_texture_flags(&mut self, has_diffuse_map: bool, has_normal_map: bool) {
        self.ambient_color.w = if has_diffuse_map { 1.0 } else { 0.0 };
        self.diffuse_color.w = if has_normal_map { 1.0 } else { 0.0 };
    }
}

/// Which part of the backend state a uniform name belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformSlot {
    Frame,
    Draw,
    DiffuseSampler,
    NormalSampler,
}

impl UniformSlot {
    pub fn of(name: UniformName) -> Self {
        match name {
            UniformName::ProjViewMatrix
            | UniformName::PointLight { .. }
            | UniformName::DirLight { .. } => UniformSlot::Frame,
            UniformName::ModelMatrix
            | UniformName::AmbientColor
            | UniformName::DiffuseColor
            | UniformName::SpecularColor => UniformSlot::Draw,
            UniformName::TextureSampler => UniformSlot::DiffuseSampler,
            UniformName::NormalSampler => UniformSlot::NormalSampler,
        }
    }
}

/// Returns a new `Vec4` value that is the combination of a `Vec3` x, y and z
/// and an additional `w` value.
pub fn vec3_w(xyz: Vec3, w: f32) -> Vec4 {
    Vec4::new(xyz.x, xyz.y, xyz.z, w)
}

fn set_xyz(target: &mut Vec4, xyz: Vec3) -> bool {
    *target = vec3_w(xyz, target.w);
    true
}

fn set_w(target: &mut Vec4, w: f32) -> bool {
    target.w = w;
    true
}
