use std::{process::ExitCode, rc::Rc};

use orrery::platform::ContentDir;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Overrides the content directory copied next to the build output.
const CONTENT_DIR_VAR: &str = "ORRERY_CONTENT_DIR";

fn main() -> ExitCode {
    tracing_log::LogTracer::init().expect("failed to initialize LogTracer");

    // INFO+ for everything by default, but wgpu is far too chatty at that level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"));

    let stdout_subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(stdout_subscriber)
        .expect("failed to install stdout global tracing subscriber");

    let content = std::env::var_os(CONTENT_DIR_VAR)
        .map(ContentDir::new)
        .unwrap_or_else(ContentDir::from_build_output);

    match orrery::orrery_main(Rc::new(content)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
