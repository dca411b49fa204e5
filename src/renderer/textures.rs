use anyhow::Context;

use super::backend::{RenderBackend, TextureId};
use crate::platform::AssetSource;

/// Directory in the content folder that texture files are loaded from.
pub const TEXTURE_DIR: &str = "textures";

/// A texture that was uploaded to the GPU.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    name: String,
    id: TextureId,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(name: &str, id: TextureId, width: u32, height: u32) -> Self {
        Self {
            name: name.to_owned(),
            id,
            width,
            height,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the backend handle for this texture.
    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Load `textures/<file_name>` and upload it to the GPU. `file_name` must be a
/// JPEG, PNG or DDS image.
#[tracing::instrument(level = "info", skip(assets, backend))]
pub fn load_texture_file(
    file_name: &str,
    assets: &dyn AssetSource,
    backend: &mut dyn RenderBackend,
) -> anyhow::Result<Texture> {
    let file_bytes = assets.load_as_binary(&format!("{TEXTURE_DIR}/{file_name}"))?;
    let image = image::load_from_memory(&file_bytes)
        .with_context(|| format!("failed to decode texture {file_name}"))?
        .to_rgba8();

    let id = backend.create_texture(file_name, &image)?;
    Ok(Texture::new(file_name, id, image.width(), image.height()))
}
