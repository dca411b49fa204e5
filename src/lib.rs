//! A minimal real-time 3D renderer. A scene of hierarchical objects described
//! in `config.json` is drawn through a shader-grouped render list and viewed
//! with a mouse-driven orbital camera.
pub mod camera;
pub mod config;
pub mod content;
pub mod engine;
pub mod gameplay;
pub mod platform;
pub mod renderer;
pub mod scene;

use std::rc::Rc;

use tracing::info;
use winit::event_loop::EventLoop;

use config::Config;
use engine::{Engine, EngineError, NoKeyHandler};
use platform::AssetSource;

/// Load the configuration from `assets`, create the engine and run the main
/// loop until the user quits.
pub fn orrery_main(assets: Rc<dyn AssetSource>) -> Result<(), EngineError> {
    let config = Config::load(assets.as_ref(), Config::FILE_NAME)?;

    let mut event_loop = EventLoop::new()?;
    let mut engine = Engine::new(&event_loop, &config, assets, Box::new(NoKeyHandler))?;

    engine.run(&mut event_loop)?;

    info!("shutting down");
    Ok(())
}
