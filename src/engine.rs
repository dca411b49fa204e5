//! Window creation, the main loop and turning configuration into scene
//! objects.
mod input;

use std::{rc::Rc, sync::Arc};

use thiserror::Error;
use tracing::{error, info, warn};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    platform::run_on_demand::EventLoopExtRunOnDemand,
    window::{Fullscreen, Window, WindowBuilder},
};

pub use input::{InputEvent, InputTranslator};

use crate::{
    camera::OrbitCamera,
    config::{Config, LightKind, ObjectConfig, WindowConfig},
    content::ContentManager,
    gameplay::OrbitCameraController,
    platform::{AssetSource, FrameClock},
    renderer::{
        backend::{BackendError, RenderBackend},
        wgpu_backend::WgpuBackend,
        Graphics, GraphicsError,
    },
    scene::{ObjectKey, SceneObject},
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("failed to create the event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create the main window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("graphics backend failed to initialize: {0}")]
    Backend(#[from] BackendError),
    #[error("graphics failed: {0}")]
    Graphics(#[from] GraphicsError),
}

/// Receives key presses that the engine itself does not handle.
pub trait KeyHandler {
    fn key_down(&mut self, _key: &Key) {}
    fn key_up(&mut self, _key: &Key) {}
}

/// A key handler that ignores every key.
#[derive(Debug, Default)]
pub struct NoKeyHandler;

impl KeyHandler for NoKeyHandler {}

/// What the main loop should do after an input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Routes input events to the camera controller and the key handler.
pub struct InputDispatch {
    controller: OrbitCameraController,
    keys: Box<dyn KeyHandler>,
}

impl InputDispatch {
    pub fn new(keys: Box<dyn KeyHandler>) -> Self {
        Self {
            controller: OrbitCameraController::new(),
            keys,
        }
    }

    /// Handle one input event. Quitting or pressing escape ends the loop.
    pub fn dispatch(&mut self, event: &InputEvent, camera: &mut OrbitCamera) -> LoopControl {
        match event {
            InputEvent::Quit => return LoopControl::Exit,
            InputEvent::KeyDown(Key::Named(NamedKey::Escape)) => return LoopControl::Exit,
            InputEvent::KeyDown(key) => self.keys.key_down(key),
            InputEvent::KeyUp(key) => self.keys.key_up(key),
            _ => {
                self.controller.process_input(event, camera);
            }
        }

        LoopControl::Continue
    }
}

/// Create the scene object described by `config` along with all of its
/// dependants. Each dependant is registered with the renderer and then
/// attached beneath its parent. The returned object itself is not registered.
pub fn spawn_object<B: RenderBackend>(
    graphics: &mut Graphics<B>,
    content: &mut ContentManager,
    config: &ObjectConfig,
) -> ObjectKey {
    let model = config
        .model_name()
        .and_then(|file_name| content.load_model(file_name, graphics.backend_mut()));

    if config.model_name().is_some() && model.is_none() {
        warn!("object `{}` has no model and will only move its children", config.name);
    }

    let key = graphics
        .scene_mut()
        .insert(SceneObject::from_config(config, model));

    for dependant in &config.dependants {
        let child = spawn_object(graphics, content, dependant);
        graphics.add_object(&dependant.shader, child, false);
        graphics.scene_mut().add_child(key, child);
    }

    key
}

/// Create every configured object and light. Top level objects become scene
/// roots.
pub fn populate<B: RenderBackend>(
    graphics: &mut Graphics<B>,
    content: &mut ContentManager,
    config: &Config,
) {
    for object in &config.objects {
        let key = spawn_object(graphics, content, object);
        graphics.add_object(&object.shader, key, true);
    }

    for light in &config.lights {
        match light.light_kind() {
            Some(LightKind::Point) => graphics.add_point_light(light),
            Some(LightKind::Directional) => graphics.add_directional_light(light),
            None => warn!("skipping light with unknown type `{}`", light.kind),
        }
    }

    info!(
        "scene has {} objects, {} point lights and {} directional lights",
        graphics.scene().len(),
        graphics.point_lights().len(),
        graphics.directional_lights().len()
    );
}

/// Owns the window, renderer and content, and runs the main loop.
pub struct Engine {
    // Graphics holds the surface for `window`, so it must be dropped first.
    graphics: Graphics<WgpuBackend>,
    content: ContentManager,
    input: InputTranslator,
    dispatch: InputDispatch,
    clock: FrameClock,
    window: Arc<Window>,
}

impl Engine {
    /// Create the main window, initialize the renderer and populate the scene
    /// from `config`.
    pub fn new(
        event_loop: &EventLoop<()>,
        config: &Config,
        assets: Rc<dyn AssetSource>,
        keys: Box<dyn KeyHandler>,
    ) -> Result<Self, EngineError> {
        info!("creating main window");
        let window = Arc::new(window_builder(&config.window).build(event_loop)?);

        let backend = pollster::block_on(WgpuBackend::new(window.clone()))?;
        let size = window.inner_size();

        let mut graphics = Graphics::new(
            backend,
            assets.clone(),
            config.eye.clone(),
            size.width.max(1),
            size.height.max(1),
        );
        graphics.initialize()?;

        let mut content = ContentManager::new(assets);
        populate(&mut graphics, &mut content, config);

        Ok(Self {
            graphics,
            content,
            input: InputTranslator::new(),
            dispatch: InputDispatch::new(keys),
            clock: FrameClock::new(),
            window,
        })
    }

    /// Run the main loop until the user quits. Each iteration handles pending
    /// window events, advances the scene and draws a frame.
    pub fn run(&mut self, event_loop: &mut EventLoop<()>) -> Result<(), EngineError> {
        info!("starting main loop");
        let mut failure = None;

        event_loop.run_on_demand(|event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, window_id } if window_id == self.window.id() => {
                    match event {
                        WindowEvent::Resized(size) => {
                            self.graphics.resize(size.width, size.height)
                        }
                        WindowEvent::RedrawRequested => {
                            if let Err(err) = self.frame() {
                                error!("{err}");
                                failure = Some(err);
                                target.exit();
                            }
                        }
                        event => {
                            if self.handle_window_event(&event) == LoopControl::Exit {
                                target.exit();
                            }
                        }
                    }
                }
                Event::AboutToWait => self.window.request_redraw(),
                _ => {}
            }
        })?;

        info!(
            "main loop finished after {} frames",
            self.clock.frame_count()
        );

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn handle_window_event(&mut self, event: &WindowEvent) -> LoopControl {
        let Some(input) = self.input.translate(event) else {
            return LoopControl::Continue;
        };

        match self.graphics.camera_mut() {
            Some(camera) => self.dispatch.dispatch(&input, camera),
            None => LoopControl::Continue,
        }
    }

    fn frame(&mut self) -> Result<(), GraphicsError> {
        let delta = self.clock.tick();
        self.graphics.update(delta);
        self.graphics.render()
    }

    pub fn content(&self) -> &ContentManager {
        &self.content
    }
}

fn window_builder(config: &WindowConfig) -> WindowBuilder {
    let builder = WindowBuilder::new().with_title(config.name.clone());

    if config.is_fullscreen() {
        builder.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        builder.with_inner_size(winit::dpi::PhysicalSize::new(
            config.width,
            config.height,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use glam::{Vec2, Vec3};
    use winit::event::MouseButton;

    use super::*;
    use crate::{
        config::EyeConfig,
        platform::MemoryAssets,
        renderer::backend::recording::RecordingBackend,
    };

    const TRIANGLE_OBJ: &str = "\
o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";

    fn assets() -> Rc<dyn AssetSource> {
        Rc::new(
            MemoryAssets::new()
                .with("shaders/basic.vert.wgsl", "// vertex")
                .with("shaders/basic.frag.wgsl", "// fragment")
                .with("models/triangle.obj", TRIANGLE_OBJ),
        )
    }

    fn eye() -> EyeConfig {
        EyeConfig {
            theta: 0.0,
            phi: 0.0,
            r: 10.0,
            look_at: Vec3::ZERO,
            fov: 45.0,
            near_plane: 0.1,
            far_plane: 100.0,
        }
    }

    fn setup(json: &str) -> (Graphics<RecordingBackend>, ContentManager, Config) {
        let config = Config::from_json(json).unwrap();
        let assets = assets();
        let mut graphics = Graphics::new(RecordingBackend::new(), assets.clone(), config.eye.clone(), 800, 600);
        graphics.initialize().unwrap();
        (graphics, ContentManager::new(assets), config)
    }

    #[derive(Default)]
    struct KeyLog(Rc<RefCell<Vec<String>>>);

    impl KeyHandler for KeyLog {
        fn key_down(&mut self, key: &Key) {
            self.0.borrow_mut().push(format!("down {key:?}"));
        }

        fn key_up(&mut self, key: &Key) {
            self.0.borrow_mut().push(format!("up {key:?}"));
        }
    }

    #[test]
    fn modelless_root_with_modelled_child_draws_once() {
        let (mut graphics, mut content, config) = setup(
            r#"{
                "EYE": { "R": 10.0 },
                "OBJECTS": [{
                    "NAME": "pivot",
                    "SHADER": "basic",
                    "DEPENDANTS": [{
                        "NAME": "planet",
                        "MODEL": "triangle.obj",
                        "SHADER": "basic",
                        "POSITION": [3, 0, 0]
                    }]
                }]
            }"#,
        );

        populate(&mut graphics, &mut content, &config);
        graphics.update(std::time::Duration::from_millis(16));
        graphics.render().unwrap();

        assert_eq!(graphics.scene().roots().len(), 1);
        assert_eq!(graphics.render_list().bucket("basic").unwrap().len(), 2);
        assert_eq!(graphics.backend().draw_count(), 1);
    }

    #[test]
    fn dependants_are_attached_and_registered() {
        let (mut graphics, mut content, config) = setup(
            r#"{
                "EYE": { "R": 10.0 },
                "OBJECTS": [{
                    "NAME": "sun", "MODEL": "triangle.obj", "SHADER": "basic",
                    "DEPENDANTS": [
                        { "NAME": "earth", "MODEL": "triangle.obj", "SHADER": "basic",
                          "DEPENDANTS": [{ "NAME": "moon", "MODEL": "triangle.obj", "SHADER": "basic" }] },
                        { "NAME": "mars", "MODEL": "triangle.obj", "SHADER": "basic" }
                    ]
                }]
            }"#,
        );

        populate(&mut graphics, &mut content, &config);

        let scene = graphics.scene();
        assert_eq!(scene.len(), 4);
        assert_eq!(scene.roots().len(), 1);

        let sun = scene.get(scene.roots()[0]).unwrap();
        assert_eq!(sun.name(), "sun");
        assert_eq!(sun.children().len(), 2);

        let earth = scene.get(sun.children()[0]).unwrap();
        assert_eq!(earth.children().len(), 1);
        assert_eq!(graphics.render_list().object_count(), 4);

        // Every object shares one model.
        assert_eq!(content.models().len(), 1);
    }

    #[test]
    fn missing_model_still_spawns_object() {
        let (mut graphics, mut content, config) = setup(
            r#"{
                "EYE": { "R": 10.0 },
                "OBJECTS": [{ "NAME": "ghost", "MODEL": "ghost.obj", "SHADER": "basic" }]
            }"#,
        );

        populate(&mut graphics, &mut content, &config);
        graphics.render().unwrap();

        assert_eq!(graphics.scene().len(), 1);
        assert_eq!(graphics.backend().draw_count(), 0);
    }

    #[test]
    fn unknown_light_types_are_skipped() {
        let (mut graphics, mut content, config) = setup(
            r#"{
                "EYE": { "R": 10.0 },
                "LIGHTS": [
                    { "TYPE": "point" },
                    { "TYPE": "area" },
                    { "TYPE": "directional" }
                ]
            }"#,
        );

        populate(&mut graphics, &mut content, &config);

        assert_eq!(graphics.point_lights().len(), 1);
        assert_eq!(graphics.directional_lights().len(), 1);
    }

    #[test]
    fn escape_and_quit_exit() {
        let mut dispatch = InputDispatch::new(Box::new(NoKeyHandler));
        let mut camera = OrbitCamera::new(&eye(), 800, 600).unwrap();

        assert_eq!(
            dispatch.dispatch(&InputEvent::Quit, &mut camera),
            LoopControl::Exit
        );
        assert_eq!(
            dispatch.dispatch(
                &InputEvent::KeyDown(Key::Named(NamedKey::Escape)),
                &mut camera
            ),
            LoopControl::Exit
        );
        assert_eq!(
            dispatch.dispatch(
                &InputEvent::KeyUp(Key::Named(NamedKey::Escape)),
                &mut camera
            ),
            LoopControl::Continue
        );
    }

    #[test]
    fn other_keys_reach_the_key_handler() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatch = InputDispatch::new(Box::new(KeyLog(log.clone())));
        let mut camera = OrbitCamera::new(&eye(), 800, 600).unwrap();

        let space = Key::Named(NamedKey::Space);
        dispatch.dispatch(&InputEvent::KeyDown(space.clone()), &mut camera);
        dispatch.dispatch(&InputEvent::KeyUp(space), &mut camera);

        assert_eq!(log.borrow().len(), 2);
        assert!(log.borrow()[0].starts_with("down"));
        assert!(log.borrow()[1].starts_with("up"));
    }

    #[test]
    fn mouse_events_drive_the_camera() {
        let mut dispatch = InputDispatch::new(Box::new(NoKeyHandler));
        let mut camera = OrbitCamera::new(&eye(), 800, 600).unwrap();

        dispatch.dispatch(
            &InputEvent::MouseDown {
                button: MouseButton::Left,
                position: Vec2::new(400.0, 300.0),
            },
            &mut camera,
        );
        let control = dispatch.dispatch(
            &InputEvent::MouseMove {
                position: Vec2::new(0.0, 300.0),
            },
            &mut camera,
        );
        dispatch.dispatch(&InputEvent::Wheel { delta_y: 1.0 }, &mut camera);

        assert_eq!(control, LoopControl::Continue);
        assert_ne!(camera.theta(), 0.0);
        assert_eq!(camera.radius(), 10.5);
    }
}
