//! Loads models and textures from the content directory and shares them
//! between every scene object that references them.
use std::rc::Rc;

use tracing::warn;

use crate::{
    platform::AssetSource,
    renderer::{
        backend::RenderBackend,
        cache::ResourceCache,
        materials::MaterialBuilder,
        models::{Mesh, Model},
        textures::{load_texture_file, Texture},
    },
};

mod obj_model;

pub use obj_model::{load_obj, ObjMaterial, ObjMesh, ObjScene, MODEL_DIR};

/// Owns the model and texture caches.
pub struct ContentManager {
    assets: Rc<dyn AssetSource>,
    models: ResourceCache<Model>,
    textures: ResourceCache<Texture>,
}

impl ContentManager {
    pub fn new(assets: Rc<dyn AssetSource>) -> Self {
        Self {
            assets,
            models: ResourceCache::new("model"),
            textures: ResourceCache::new("texture"),
        }
    }

    pub fn assets(&self) -> &Rc<dyn AssetSource> {
        &self.assets
    }

    /// Get the model loaded from `models/<file_name>`, loading and uploading it
    /// on first request. Returns `None` if the model failed to load, now or on
    /// an earlier request.
    pub fn load_model(
        &mut self,
        file_name: &str,
        backend: &mut dyn RenderBackend,
    ) -> Option<Rc<Model>> {
        let assets = self.assets.as_ref();
        let textures = &mut self.textures;

        self.models.load_or_get(file_name, |file_name| {
            let obj = load_obj(file_name, assets)?;
            upload_model(file_name, obj, assets, textures, backend)
        })
    }

    /// Get the texture loaded from `textures/<file_name>`, loading and
    /// uploading it on first request.
    pub fn load_texture(
        &mut self,
        file_name: &str,
        backend: &mut dyn RenderBackend,
    ) -> Option<Rc<Texture>> {
        let assets = self.assets.as_ref();
        self.textures
            .load_or_get(file_name, |file_name| load_texture_file(file_name, assets, backend))
    }

    pub fn models(&self) -> &ResourceCache<Model> {
        &self.models
    }

    pub fn textures(&self) -> &ResourceCache<Texture> {
        &self.textures
    }
}

/// Upload every mesh of a parsed obj file and resolve its materials. Meshes
/// without any triangles are skipped, and a texture that fails to load leaves
/// that map unset.
fn upload_model(
    file_name: &str,
    obj: ObjScene,
    assets: &dyn AssetSource,
    textures: &mut ResourceCache<Texture>,
    backend: &mut dyn RenderBackend,
) -> anyhow::Result<Model> {
    let mut meshes = Vec::with_capacity(obj.meshes.len());

    for obj_mesh in obj.meshes {
        if obj_mesh.indices.is_empty() || obj_mesh.vertices.is_empty() {
            warn!("skipping empty mesh `{}` in {file_name}", obj_mesh.name);
            continue;
        }

        let mut builder = MaterialBuilder::new();

        if let Some(mat) = obj_mesh.material {
            if let Some(color) = mat.ambient_color {
                builder = builder.ambient_color(color);
            }

            if let Some(color) = mat.diffuse_color {
                builder = builder.diffuse_color(color);
            }

            if let Some(color) = mat.specular_color {
                builder = builder.specular_color(color);
            }

            let mut load = |name: &str| {
                textures.load_or_get(name, |name| load_texture_file(name, assets, &mut *backend))
            };

            if let Some(texture) = mat.diffuse_texture.as_deref().and_then(&mut load) {
                builder = builder.diffuse_map(texture);
            }

            if let Some(texture) = mat.normal_texture.as_deref().and_then(&mut load) {
                builder = builder.normal_map(texture);
            }
        }

        let gpu_mesh = backend.create_mesh(
            &format!("{file_name}:{}", obj_mesh.name),
            &obj_mesh.vertices,
            &obj_mesh.indices,
        )?;

        meshes.push(Mesh::new(
            &obj_mesh.name,
            gpu_mesh,
            obj_mesh.indices.len() as u32,
            builder.build(),
        ));
    }

    if meshes.is_empty() {
        anyhow::bail!("{file_name} does not contain any triangles");
    }

    Ok(Model::new(file_name, meshes))
}
