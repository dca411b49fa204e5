//! The renderer: owns the scene, the shader cache, lights and the camera, and
//! draws everything one shader bucket at a time.
pub mod backend;
pub mod cache;
pub mod lighting;
pub mod materials;
pub mod models;
pub mod render_list;
pub mod shaders;
pub mod textures;
pub mod uniforms;
pub mod wgpu_backend;

use std::{rc::Rc, time::Duration};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    camera::{CameraError, OrbitCamera},
    config::{EyeConfig, LightConfig},
    platform::AssetSource,
    scene::{ObjectKey, Scene},
};

use backend::{BackendError, RenderBackend, RenderState};
use lighting::{DirectionalLight, PointLight};
use render_list::RenderList;
use shaders::ShaderCache;

#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("graphics backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("camera failed to initialize: {0}")]
    Camera(#[from] CameraError),
    #[error("the renderer was used before it was initialized")]
    NotInitialized,
    #[error("the graphics device ran out of memory")]
    OutOfMemory,
}

/// Draws the scene through a `RenderBackend`.
///
/// Objects are registered with `add_object`, which places them in the bucket of
/// their shader (compiling the shader on first use) and optionally makes them
/// scene roots. Every frame `update` refreshes transforms and `render` draws
/// each bucket with its program bound once.
pub struct Graphics<B: RenderBackend> {
    backend: B,
    assets: Rc<dyn AssetSource>,
    eye: EyeConfig,
    viewport: (u32, u32),
    camera: Option<OrbitCamera>,
    shaders: ShaderCache,
    render_list: RenderList,
    scene: Scene,
    point_lights: Vec<PointLight>,
    directional_lights: Vec<DirectionalLight>,
}

impl<B: RenderBackend> Graphics<B> {
    /// Create a renderer drawing to a viewport of `viewport_width` by
    /// `viewport_height` pixels. Call `initialize` before using it.
    pub fn new(
        backend: B,
        assets: Rc<dyn AssetSource>,
        eye: EyeConfig,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Self {
        Self {
            backend,
            assets,
            eye,
            viewport: (viewport_width, viewport_height),
            camera: None,
            shaders: ShaderCache::new(),
            render_list: RenderList::new(),
            scene: Scene::new(),
            point_lights: Vec::new(),
            directional_lights: Vec::new(),
        }
    }

    /// Apply the fixed render state and create the camera.
    pub fn initialize(&mut self) -> Result<(), GraphicsError> {
        info!("initializing graphics");

        self.backend.configure(RenderState::default())?;
        self.camera = Some(OrbitCamera::new(&self.eye, self.viewport.0, self.viewport.1)?);

        Ok(())
    }

    /// Register `key` for drawing with the program `shader`, compiling the
    /// program if it has not been requested before. Root objects are also
    /// attached to the scene as roots.
    ///
    /// Objects are bucketed even when their shader fails to compile; such
    /// buckets are skipped at draw time.
    pub fn add_object(&mut self, shader: &str, key: ObjectKey, is_root: bool) {
        if self
            .shaders
            .load_or_get(shader, self.assets.as_ref(), &mut self.backend)
            .is_none()
        {
            warn!("objects using shader `{shader}` will not be drawn");
        }

        self.render_list.push(shader, key);

        if is_root {
            self.scene.add_root(key);
        }
    }

    /// Remove an object and its descendants from the scene and from the render
    /// list.
    pub fn destroy_object(&mut self, key: ObjectKey) {
        for removed in self.scene.destroy(key) {
            self.render_list.remove(removed);
        }
    }

    pub fn add_point_light(&mut self, config: &LightConfig) {
        self.point_lights.push(PointLight::from_config(config));
    }

    pub fn add_directional_light(&mut self, config: &LightConfig) {
        self.directional_lights
            .push(DirectionalLight::from_config(config));
    }

    /// Advance the scene by `delta`, refreshing every object's matrices.
    pub fn update(&mut self, delta: Duration) {
        self.scene.update(delta);
    }

    /// Draw one frame.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped. Running
    /// out of GPU memory is returned as an error.
    pub fn render(&mut self) -> Result<(), GraphicsError> {
        let camera = self.camera.as_ref().ok_or(GraphicsError::NotInitialized)?;

        match self.backend.begin_frame() {
            Ok(()) => {}
            Err(BackendError::Frame(
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
            )) => {
                warn!("rendering surface lost or outdated, reconfiguring");
                self.backend.resize(self.viewport.0, self.viewport.1);
                return Ok(());
            }
            Err(BackendError::Frame(wgpu::SurfaceError::OutOfMemory)) => {
                return Err(GraphicsError::OutOfMemory);
            }
            Err(BackendError::Frame(err)) => {
                error!("skipping frame: {err}");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        let proj_view = camera.view_projection_matrix();
        let backend: &mut dyn RenderBackend = &mut self.backend;

        for (shader, objects) in self.render_list.iter() {
            let Some(program) = self.shaders.get(shader) else {
                continue;
            };

            program.enable(backend);
            program.set_mat4(backend, uniforms::PROJ_VIEW_MATRIX, proj_view);

            for (index, light) in self.point_lights.iter().enumerate() {
                light.upload(index, backend, &program);
            }

            for (index, light) in self.directional_lights.iter().enumerate() {
                light.upload(index, backend, &program);
            }

            for object in objects.iter().filter_map(|key| self.scene.get(*key)) {
                object.render(backend, &program);
            }
        }

        self.backend.end_frame()?;
        Ok(())
    }

    /// Resize the drawable surface and the camera viewport. Zero sized
    /// viewports (eg a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.viewport = (width, height);
        self.backend.resize(width, height);

        if let Some(camera) = self.camera.as_mut() {
            if let Err(err) = camera.set_viewport_size(width, height) {
                warn!("{err}");
            }
        }
    }

    /// Release every shader program and destroy the scene. Dropping the
    /// renderer does this automatically.
    pub fn teardown(&mut self) {
        self.shaders.release_all(&mut self.backend);
        self.scene.clear();
        self.render_list = RenderList::new();
    }

    pub fn camera(&self) -> Option<&OrbitCamera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut OrbitCamera> {
        self.camera.as_mut()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn render_list(&self) -> &RenderList {
        &self.render_list
    }

    pub fn shaders(&self) -> &ShaderCache {
        &self.shaders
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional_lights
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> Drop for Graphics<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::{
        config::Config,
        platform::MemoryAssets,
        renderer::backend::{
            recording::{Command, RecordingBackend},
            UniformValue,
        },
        scene::{SceneObject, Transform},
    };

    fn assets() -> Rc<dyn AssetSource> {
        Rc::new(
            MemoryAssets::new()
                .with("shaders/basic.vert.wgsl", "// vertex")
                .with("shaders/basic.frag.wgsl", "// fragment")
                .with("shaders/flat.vert.wgsl", "// vertex")
                .with("shaders/flat.frag.wgsl", "// fragment"),
        )
    }

    fn config() -> Config {
        Config::from_json(
            r#"{
                "EYE": { "THETA": 0.0, "PHI": 0.0, "R": 10.0 },
                "LIGHTS": [
                    { "TYPE": "point", "POSITION": [0, 3, 0] },
                    { "TYPE": "point", "POSITION": [0, -3, 0] },
                    { "TYPE": "directional", "DIRECTION": [0, -1, 0] }
                ]
            }"#,
        )
        .unwrap()
    }

    fn graphics(backend: RecordingBackend) -> Graphics<RecordingBackend> {
        let mut graphics = Graphics::new(backend, assets(), config().eye, 800, 600);
        graphics.initialize().unwrap();
        graphics
    }

    fn spawn(graphics: &mut Graphics<RecordingBackend>, name: &str, shader: &str) -> ObjectKey {
        let key = graphics
            .scene_mut()
            .insert(SceneObject::new(name, shader, Transform::default(), None));
        graphics.add_object(shader, key, true);
        key
    }

    fn program_uses(backend: &RecordingBackend) -> Vec<&str> {
        backend
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::UseProgram(id) => backend.program_name(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn initialize_configures_render_state() {
        let graphics = graphics(RecordingBackend::new());
        let state = graphics.backend().state.unwrap();

        assert_eq!(state.depth_compare, wgpu::CompareFunction::LessEqual);
        assert_eq!(state.blend, Some(wgpu::BlendState::ALPHA_BLENDING));
        assert_eq!(state.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(state.clear_color.b, 0.2);
        assert!(graphics.camera().is_some());
    }

    #[test]
    fn invalid_camera_fails_initialize() {
        let mut eye = config().eye;
        eye.r = -1.0;

        let mut graphics = Graphics::new(RecordingBackend::new(), assets(), eye, 800, 600);
        assert!(matches!(
            graphics.initialize(),
            Err(GraphicsError::Camera(_))
        ));
        assert!(matches!(
            graphics.render(),
            Err(GraphicsError::NotInitialized)
        ));
    }

    #[test]
    fn each_program_is_bound_once_per_frame() {
        let mut graphics = graphics(RecordingBackend::new());
        spawn(&mut graphics, "a", "basic");
        spawn(&mut graphics, "b", "flat");
        spawn(&mut graphics, "c", "basic");

        graphics.render().unwrap();

        assert_eq!(program_uses(graphics.backend()), vec!["basic", "flat"]);
        assert_eq!(graphics.backend().programs_compiled(), 2);
        assert_eq!(graphics.render_list().bucket("basic").unwrap().len(), 2);
    }

    #[test]
    fn frame_uniforms_are_set_per_program() {
        let mut graphics = graphics(RecordingBackend::new());
        spawn(&mut graphics, "a", "basic");
        spawn(&mut graphics, "b", "flat");

        for light in &config().lights {
            match light.light_kind() {
                Some(crate::config::LightKind::Point) => graphics.add_point_light(light),
                _ => graphics.add_directional_light(light),
            }
        }

        graphics.render().unwrap();
        let backend = graphics.backend();
        let camera = graphics.camera().unwrap();

        assert_eq!(
            backend.uniform_values(uniforms::PROJ_VIEW_MATRIX),
            vec![UniformValue::Mat4(camera.view_projection_matrix()); 2]
        );
        assert_eq!(
            backend.uniform_values("point_lights[1].light_position"),
            vec![UniformValue::Vec3(Vec3::new(0.0, -3.0, 0.0)); 2]
        );
        assert_eq!(backend.uniform_values("dir_lights[0].light_direction").len(), 2);
        assert!(backend.uniform_values("dir_lights[1].light_direction").is_empty());
        assert_eq!(backend.uniform_values(uniforms::MODEL_MATRIX).len(), 2);
    }

    #[test]
    fn failed_shader_bucket_is_skipped() {
        let mut graphics = graphics(RecordingBackend::failing(&["flat"]));
        spawn(&mut graphics, "a", "basic");
        spawn(&mut graphics, "b", "flat");
        spawn(&mut graphics, "c", "flat");

        assert!(graphics.shaders().is_failed("flat"));
        assert_eq!(graphics.render_list().bucket("flat").unwrap().len(), 2);

        graphics.render().unwrap();
        assert_eq!(program_uses(graphics.backend()), vec!["basic"]);
        assert_eq!(
            graphics.backend().uniform_values(uniforms::MODEL_MATRIX).len(),
            1
        );
    }

    #[test]
    fn frame_is_wrapped_in_begin_and_end() {
        let mut graphics = graphics(RecordingBackend::new());
        spawn(&mut graphics, "a", "basic");

        graphics.render().unwrap();
        let commands = &graphics.backend().commands;

        assert_eq!(commands.first(), Some(&Command::BeginFrame));
        assert_eq!(commands.last(), Some(&Command::EndFrame));
    }

    #[test]
    fn render_uses_world_matrices() {
        let mut graphics = graphics(RecordingBackend::new());
        let parent = spawn(&mut graphics, "parent", "basic");
        let child = graphics.scene_mut().insert(SceneObject::new(
            "child",
            "basic",
            Transform {
                position: Vec3::new(0.0, 1.0, 0.0),
                ..Default::default()
            },
            None,
        ));
        graphics.add_object("basic", child, false);
        graphics.scene_mut().add_child(parent, child);

        graphics
            .scene_mut()
            .get_mut(parent)
            .unwrap()
            .transform_mut()
            .position = Vec3::new(2.0, 0.0, 0.0);

        graphics.update(Duration::from_millis(16));
        graphics.render().unwrap();

        assert_eq!(
            graphics.backend().uniform_values(uniforms::MODEL_MATRIX),
            vec![
                UniformValue::Mat4(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))),
                UniformValue::Mat4(Mat4::from_translation(Vec3::new(2.0, 1.0, 0.0))),
            ]
        );
    }

    #[test]
    fn destroyed_objects_are_not_drawn() {
        let mut graphics = graphics(RecordingBackend::new());
        let a = spawn(&mut graphics, "a", "basic");
        spawn(&mut graphics, "b", "basic");

        graphics.destroy_object(a);
        graphics.render().unwrap();

        assert_eq!(graphics.render_list().object_count(), 1);
        assert_eq!(
            graphics.backend().uniform_values(uniforms::MODEL_MATRIX).len(),
            1
        );
    }

    #[test]
    fn resize_updates_camera_and_backend() {
        let mut graphics = graphics(RecordingBackend::new());

        graphics.resize(1000, 500);
        graphics.resize(0, 0);

        assert_eq!(graphics.camera().unwrap().aspect_ratio(), 2.0);
        assert_eq!(graphics.backend().commands, vec![Command::Resize(1000, 500)]);
    }

    #[test]
    fn teardown_releases_every_program() {
        let mut graphics = graphics(RecordingBackend::new());
        spawn(&mut graphics, "a", "basic");
        spawn(&mut graphics, "b", "flat");

        graphics.teardown();

        assert_eq!(graphics.backend().live_programs(), 0);
        assert!(graphics.scene().is_empty());
        assert!(graphics.shaders().is_empty());
    }
}
