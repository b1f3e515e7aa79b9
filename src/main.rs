//! capy-status - i3bar status line generator
//!
//! Renders the configured modules on a fixed tick and streams i3bar protocol
//! frames to stdout. Logs go to stderr.

mod config;
mod functions;
mod module_manager;
mod modules;
mod pipeline;

use log::{error, info};
use pipeline::{Emitter, PauseController, RunState, Scheduler, SchedulerError};
use std::error::Error;
use std::io;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting capy-status...");

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    let instances = modules::default_registry().construct_all(&config.modules);
    if instances.is_empty() {
        error!("No module could be constructed, nothing to show");
        return Err(SchedulerError::NoInstances.into());
    }

    let run_state = RunState::new();
    PauseController::spawn(run_state.clone())?;

    let scheduler = Scheduler::new(
        instances,
        Emitter::new(io::stdout()),
        run_state,
        config.tick_interval,
    )?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    if let Err(e) = rt.block_on(scheduler.run()) {
        error!("Status line stopped: {}", e);
        return Err(e.into());
    }
    Ok(())
}
