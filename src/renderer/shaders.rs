use std::rc::Rc;

use glam::{Mat4, Vec3};
use tracing::info;

use super::{
    backend::{ProgramId, RenderBackend, UniformValue},
    cache::ResourceCache,
};
use crate::platform::AssetSource;

/// Directory in the content folder that shader sources are loaded from.
pub const SHADER_DIR: &str = "shaders";

/// A linked shader program. Programs are identified by name, for example the
/// program `basic` is built from `shaders/basic.vert.wgsl` and
/// `shaders/basic.frag.wgsl`.
#[derive(Debug, PartialEq, Eq)]
pub struct ShaderProgram {
    name: String,
    id: ProgramId,
}

impl ShaderProgram {
    pub fn new(name: &str, id: ProgramId) -> Self {
        Self {
            name: name.to_owned(),
            id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Make this program the active program.
    pub fn enable(&self, backend: &mut dyn RenderBackend) {
        backend.use_program(self.id);
    }

    pub fn set_mat4(&self, backend: &mut dyn RenderBackend, name: &str, value: Mat4) {
        backend.set_uniform(name, UniformValue::Mat4(value));
    }

    pub fn set_vec3(&self, backend: &mut dyn RenderBackend, name: &str, value: Vec3) {
        backend.set_uniform(name, UniformValue::Vec3(value));
    }

    pub fn set_f32(&self, backend: &mut dyn RenderBackend, name: &str, value: f32) {
        backend.set_uniform(name, UniformValue::F32(value));
    }

    pub fn set_i32(&self, backend: &mut dyn RenderBackend, name: &str, value: i32) {
        backend.set_uniform(name, UniformValue::I32(value));
    }
}

/// Compiles shader programs on first use and shares them afterwards. A program
/// that fails to compile is remembered as failed and never retried.
#[derive(Debug)]
pub struct ShaderCache {
    programs: ResourceCache<ShaderProgram>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self {
            programs: ResourceCache::new("shader"),
        }
    }

    /// Get the program called `name`, compiling it if this is the first
    /// request.
    pub fn load_or_get(
        &mut self,
        name: &str,
        assets: &dyn AssetSource,
        backend: &mut dyn RenderBackend,
    ) -> Option<Rc<ShaderProgram>> {
        self.programs
            .load_or_get(name, |name| compile_program(name, assets, backend))
    }

    /// Get a previously compiled program without compiling anything.
    pub fn get(&self, name: &str) -> Option<Rc<ShaderProgram>> {
        self.programs.get(name)
    }

    /// Check if the program `name` failed to compile.
    pub fn is_failed(&self, name: &str) -> bool {
        self.programs.is_failed(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Release every compiled program and empty the cache.
    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        for (name, program) in self.programs.drain_loaded() {
            info!("releasing shader program `{name}`");
            backend.destroy_program(program.id());
        }
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load both stage sources for the program `name` and link them.
#[tracing::instrument(level = "info", skip(assets, backend))]
fn compile_program(
    name: &str,
    assets: &dyn AssetSource,
    backend: &mut dyn RenderBackend,
) -> anyhow::Result<ShaderProgram> {
    let vertex_source = assets.load_as_string(&format!("{SHADER_DIR}/{name}.vert.wgsl"))?;
    let fragment_source = assets.load_as_string(&format!("{SHADER_DIR}/{name}.frag.wgsl"))?;

    let id = backend.create_program(name, &vertex_source, &fragment_source)?;
    Ok(ShaderProgram::new(name, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        platform::MemoryAssets,
        renderer::backend::recording::{Command, RecordingBackend},
    };

    fn shader_assets(names: &[&str]) -> MemoryAssets {
        let mut assets = MemoryAssets::new();
        for name in names {
            assets.insert(&format!("shaders/{name}.vert.wgsl"), "// vertex");
            assets.insert(&format!("shaders/{name}.frag.wgsl"), "// fragment");
        }
        assets
    }

    #[test]
    fn second_request_returns_same_program() {
        let assets = shader_assets(&["basic"]);
        let mut backend = RecordingBackend::new();
        let mut cache = ShaderCache::new();

        let first = cache.load_or_get("basic", &assets, &mut backend).unwrap();
        let second = cache.load_or_get("basic", &assets, &mut backend).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(backend.programs_compiled(), 1);
        assert_eq!(assets.load_count("shaders/basic.vert.wgsl"), 1);
        assert_eq!(backend.program_name(first.id()), Some("basic"));
    }

    #[test]
    fn missing_source_is_cached_as_failure() {
        let assets = shader_assets(&[]);
        let mut backend = RecordingBackend::new();
        let mut cache = ShaderCache::new();

        assert!(cache.load_or_get("ghost", &assets, &mut backend).is_none());
        assert!(cache.load_or_get("ghost", &assets, &mut backend).is_none());
        assert!(cache.load_or_get("ghost", &assets, &mut backend).is_none());

        assert!(cache.is_failed("ghost"));
        assert_eq!(assets.load_count("shaders/ghost.vert.wgsl"), 1);
    }

    #[test]
    fn compile_error_is_cached_as_failure() {
        let assets = shader_assets(&["broken"]);
        let mut backend = RecordingBackend::failing(&["broken"]);
        let mut cache = ShaderCache::new();

        assert!(cache.load_or_get("broken", &assets, &mut backend).is_none());
        assert!(cache.load_or_get("broken", &assets, &mut backend).is_none());

        assert!(cache.is_failed("broken"));
        assert_eq!(assets.load_count("shaders/broken.frag.wgsl"), 1);
        assert_eq!(backend.programs_compiled(), 0);
    }

    #[test]
    fn release_all_destroys_every_program() {
        let assets = shader_assets(&["basic", "flat"]);
        let mut backend = RecordingBackend::new();
        let mut cache = ShaderCache::new();

        cache.load_or_get("basic", &assets, &mut backend);
        cache.load_or_get("flat", &assets, &mut backend);
        cache.load_or_get("ghost", &assets, &mut backend);
        assert_eq!(cache.len(), 3);

        cache.release_all(&mut backend);

        assert!(cache.is_empty());
        assert_eq!(backend.live_programs(), 0);
        assert_eq!(
            backend
                .commands
                .iter()
                .filter(|c| matches!(c, Command::DestroyProgram(_)))
                .count(),
            2
        );
    }
}
