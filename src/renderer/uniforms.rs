//! Names of the shader uniforms the renderer sets every frame.
//!
//! Shader authors and the renderer agree on these names exactly. Light fields
//! are addressed with an array index, for example
//! `point_lights[2].light_color` or `dir_lights[0].outer_angle`.
use std::{fmt, str::FromStr};

use thiserror::Error;

pub const PROJ_VIEW_MATRIX: &str = "proj_view_matrix";
pub const MODEL_MATRIX: &str = "model_matrix";
pub const AMBIENT_COLOR: &str = "ambient_color";
pub const DIFFUSE_COLOR: &str = "diffuse_color";
pub const SPECULAR_COLOR: &str = "specular_color";
pub const TEXTURE_SAMPLER: &str = "texture_sampler";
pub const NORMAL_SAMPLER: &str = "normal_sampler";

const POINT_LIGHTS: &str = "point_lights";
const DIR_LIGHTS: &str = "dir_lights";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointLightField {
    Position,
    Color,
    Strength,
}

impl PointLightField {
    pub const fn as_str(self) -> &'static str {
        match self {
            PointLightField::Position => "light_position",
            PointLightField::Color => "light_color",
            PointLightField::Strength => "light_strength",
        }
    }

    fn parse(field: &str) -> Option<Self> {
        match field {
            "light_position" => Some(PointLightField::Position),
            "light_color" => Some(PointLightField::Color),
            "light_strength" => Some(PointLightField::Strength),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirLightField {
    Position,
    Direction,
    Color,
    Strength,
    OuterAngle,
    InnerAngle,
}

impl DirLightField {
    pub const fn as_str(self) -> &'static str {
        match self {
            DirLightField::Position => "light_position",
            DirLightField::Direction => "light_direction",
            DirLightField::Color => "light_color",
            DirLightField::Strength => "light_strength",
            DirLightField::OuterAngle => "outer_angle",
            DirLightField::InnerAngle => "inner_angle",
        }
    }

    fn parse(field: &str) -> Option<Self> {
        match field {
            "light_position" => Some(DirLightField::Position),
            "light_direction" => Some(DirLightField::Direction),
            "light_color" => Some(DirLightField::Color),
            "light_strength" => Some(DirLightField::Strength),
            "outer_angle" => Some(DirLightField::OuterAngle),
            "inner_angle" => Some(DirLightField::InnerAngle),
            _ => None,
        }
    }
}

/// A parsed uniform name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformName {
    ProjViewMatrix,
    ModelMatrix,
    AmbientColor,
    DiffuseColor,
    SpecularColor,
    TextureSampler,
    NormalSampler,
    PointLight { index: usize, field: PointLightField },
    DirLight { index: usize, field: DirLightField },
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformName::ProjViewMatrix => f.write_str(PROJ_VIEW_MATRIX),
            UniformName::ModelMatrix => f.write_str(MODEL_MATRIX),
            UniformName::AmbientColor => f.write_str(AMBIENT_COLOR),
            UniformName::DiffuseColor => f.write_str(DIFFUSE_COLOR),
            UniformName::SpecularColor => f.write_str(SPECULAR_COLOR),
            UniformName::TextureSampler => f.write_str(TEXTURE_SAMPLER),
            UniformName::NormalSampler => f.write_str(NORMAL_SAMPLER),
            UniformName::PointLight { index, field } => {
                write!(f, "{POINT_LIGHTS}[{index}].{}", field.as_str())
            }
            UniformName::DirLight { index, field } => {
                write!(f, "{DIR_LIGHTS}[{index}].{}", field.as_str())
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a uniform known to the renderer")]
pub struct UnknownUniform(pub String);

impl FromStr for UniformName {
    type Err = UnknownUniform;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownUniform(name.to_owned());

        match name {
            PROJ_VIEW_MATRIX => return Ok(UniformName::ProjViewMatrix),
            MODEL_MATRIX => return Ok(UniformName::ModelMatrix),
            AMBIENT_COLOR => return Ok(UniformName::AmbientColor),
            DIFFUSE_COLOR => return Ok(UniformName::DiffuseColor),
            SPECULAR_COLOR => return Ok(UniformName::SpecularColor),
            TEXTURE_SAMPLER => return Ok(UniformName::TextureSampler),
            NORMAL_SAMPLER => return Ok(UniformName::NormalSampler),
            _ => {}
        }

        // Indexed light fields look like `array[index].field`.
        let (array, rest) = name.split_once('[').ok_or_else(unknown)?;
        let (index, field) = rest.split_once("].").ok_or_else(unknown)?;

        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }

        let index: usize = index.parse().map_err(|_| unknown())?;

        match array {
            POINT_LIGHTS => PointLightField::parse(field)
                .map(|field| UniformName::PointLight { index, field })
                .ok_or_else(unknown),
            DIR_LIGHTS => DirLightField::parse(field)
                .map(|field| UniformName::DirLight { index, field })
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}
