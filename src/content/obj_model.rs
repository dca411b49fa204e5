use std::{io::BufReader, path::Path};

use anyhow::Context;
use glam::Vec3;

use crate::{platform::AssetSource, renderer::models::Vertex};

/// Directory in the content folder that model files are loaded from.
pub const MODEL_DIR: &str = "models";

/// An obj file parsed into CPU side meshes, ready to be uploaded.
#[derive(Debug, Default)]
pub struct ObjScene {
    pub meshes: Vec<ObjMesh>,
}

#[derive(Debug)]
pub struct ObjMesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: Option<ObjMaterial>,
}

/// The parts of an mtl material the renderer uses. Texture names have any
/// directories stripped and are looked up in the texture directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjMaterial {
    pub name: String,
    pub ambient_color: Option<Vec3>,
    pub diffuse_color: Option<Vec3>,
    pub specular_color: Option<Vec3>,
    pub diffuse_texture: Option<String>,
    pub normal_texture: Option<String>,
}

impl From<tobj::Material> for ObjMaterial {
    fn from(mat: tobj::Material) -> Self {
        Self {
            name: mat.name,
            ambient_color: mat.ambient.map(Vec3::from),
            diffuse_color: mat.diffuse.map(Vec3::from),
            specular_color: mat.specular.map(Vec3::from),
            diffuse_texture: mat.diffuse_texture.as_deref().and_then(clip_directories),
            normal_texture: mat.normal_texture.as_deref().and_then(clip_directories),
        }
    }
}

/// Strip any directories from a texture path written in an mtl file.
fn clip_directories(file_path: &str) -> Option<String> {
    // mtl files written on Windows use backslashes.
    let normalized = file_path.trim().replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
}

/// Parse `models/<file_name>` and any mtl libraries it references.
#[tracing::instrument(level = "info", skip(assets))]
pub fn load_obj(file_name: &str, assets: &dyn AssetSource) -> anyhow::Result<ObjScene> {
    let obj_text = assets.load_as_string(&format!("{MODEL_DIR}/{file_name}"))?;
    let mut obj_reader = BufReader::new(obj_text.as_bytes());

    // Parse the .obj file to get a list of models (actually meshes) and
    // material definitions.
    let (obj_models, obj_materials) = tobj::load_obj_buf(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |mtl_file_path| {
            let mtl_path = format!("{MODEL_DIR}/{}", mtl_file_path.to_string_lossy());
            let mtl_text = assets.load_as_string(&mtl_path).map_err(|err| {
                tracing::warn!("{err:#}");
                tobj::LoadError::OpenFileFailed
            })?;

            tobj::load_mtl_buf(&mut BufReader::new(mtl_text.as_bytes()))
        },
    )
    .with_context(|| format!("failed to parse {file_name}"))?;

    // A missing or broken material library is not fatal, the meshes are drawn
    // with the default material instead.
    let materials: Vec<ObjMaterial> = match obj_materials {
        Ok(materials) => materials.into_iter().map(ObjMaterial::from).collect(),
        Err(err) => {
            tracing::warn!("materials for {file_name} could not be loaded: {err}");
            Vec::new()
        }
    };

    let meshes = obj_models
        .into_iter()
        .map(|model| {
            let material = model
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .cloned();

            ObjMesh {
                vertices: collect_vertices(&model.mesh),
                indices: model.mesh.indices,
                material,
                name: model.name,
            }
        })
        .collect();

    Ok(ObjScene { meshes })
}

/// Assemble interleaved vertices from tobj's mesh data. `single_index` makes
/// the position, normal and texture coordinate arrays share one index, so
/// vertex `i` is built from element `i` of each array.
///
/// Obj files may leave out normals and texture coordinates, in which case they
/// are zero. Texture coordinates are flipped vertically because obj puts the
/// origin at the bottom of the image.
fn collect_vertices(mesh: &tobj::Mesh) -> Vec<Vertex> {
    let has_normals = !mesh.normals.is_empty();
    let has_tex_coords = !mesh.texcoords.is_empty();

    (0..mesh.positions.len() / 3)
        .map(|i| Vertex {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            normal: if has_normals {
                [
                    mesh.normals[i * 3],
                    mesh.normals[i * 3 + 1],
                    mesh.normals[i * 3 + 2],
                ]
            } else {
                [0.0, 0.0, 0.0]
            },
            tex_coords: if has_tex_coords {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryAssets;

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
usemtl painted
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const QUAD_MTL: &str = "\
newmtl painted
Ka 0.1 0.2 0.3
Kd 0.4 0.5 0.6
Ks 0.7 0.8 0.9
map_Kd C:\\art\\textures\\paint.png
map_Bump ../textures/paint_normal.png
";

    const BARE_OBJ: &str = "\
o bare
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";

    #[test]
    fn load_quad_with_material() {
        let assets = MemoryAssets::new()
            .with("models/quad.obj", QUAD_OBJ)
            .with("models/quad.mtl", QUAD_MTL);

        let scene = load_obj("quad.obj", &assets).unwrap();
        assert_eq!(scene.meshes.len(), 1);

        let mesh = &scene.meshes[0];
        assert_eq!(mesh.name, "quad");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6, "quad is triangulated");
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[0].tex_coords, [0.0, 1.0]);

        let material = mesh.material.as_ref().unwrap();
        assert_eq!(material.name, "painted");
        assert_eq!(material.ambient_color, Some(Vec3::new(0.1, 0.2, 0.3)));
        assert_eq!(material.diffuse_color, Some(Vec3::new(0.4, 0.5, 0.6)));
        assert_eq!(material.specular_color, Some(Vec3::new(0.7, 0.8, 0.9)));
        assert_eq!(material.diffuse_texture.as_deref(), Some("paint.png"));
        assert_eq!(material.normal_texture.as_deref(), Some("paint_normal.png"));
    }

    #[test]
    fn missing_normals_and_tex_coords_are_zero() {
        let assets = MemoryAssets::new().with("models/bare.obj", BARE_OBJ);

        let scene = load_obj("bare.obj", &assets).unwrap();
        let mesh = &scene.meshes[0];

        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.material.is_none());
        for vertex in &mesh.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 0.0]);
            assert_eq!(vertex.tex_coords, [0.0, 0.0]);
        }
    }

    #[test]
    fn missing_material_library_is_not_fatal() {
        let assets = MemoryAssets::new().with("models/quad.obj", QUAD_OBJ);

        let scene = load_obj("quad.obj", &assets).unwrap();
        assert!(scene.meshes[0].material.is_none());
    }

    #[test]
    fn missing_obj_file_is_an_error() {
        let assets = MemoryAssets::new();
        assert!(load_obj("nothing.obj", &assets).is_err());
    }

    #[test]
    fn clip_directories_keeps_file_name() {
        assert_eq!(clip_directories("a/b/c.png").as_deref(), Some("c.png"));
        assert_eq!(clip_directories("C:\\x\\y.jpg").as_deref(), Some("y.jpg"));
        assert_eq!(clip_directories("plain.png").as_deref(), Some("plain.png"));
        assert_eq!(clip_directories(""), None);
    }
}
