//! Seg3D - headless driver for the action/state core
//!
//! # Overview
//!
//! Builds the whole core the way the desktop application does and runs a short
//! scripted session against it:
//! - Settings loading ([`ConfigManager`])
//! - Logging infrastructure (file rotation + console output)
//! - The state registry ([`StateEngine`]) and a state listener thread
//! - The interface and application threads ([`EventLoop`])
//! - Tool manager, action dispatcher and tools dock
//!
//! # Execution Flow
//!
//! 1. Load `Seg3D Data/Seg3D Settings.yaml` (written with defaults if missing)
//! 2. Initialize logging
//! 3. Start the interface and application threads
//! 4. Build the tools dock on the interface thread
//! 5. Open the startup tools through posted actions
//! 6. Switch tools from the dock, then undo and redo the switch
//! 7. Dump every registered state and the action metrics
//! 8. Shut the threads down

use anyhow::{Context, Result};
use seg3d::action::ActionSource;
use seg3d::state::StateChange;
use seg3d::{
    APP_NAME, APPLICATION_THREAD, Action, ActionDispatcher, ConfigManager, DefaultActionContext,
    EventLoop, INTERFACE_THREAD, StateEngine, ToolManager, ToolsDock, VERSION,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Directory holding the settings file
const CONFIG_DIR: &str = "Seg3D Data";

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(CONFIG_DIR)?;
    let settings = config_manager.load_settings()?;
    if !config_manager.settings_path().exists() {
        config_manager.save_settings(&settings)?;
    }

    let _log_guard = seg3d::logging::setup_logging(&settings)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let engine = Arc::new(StateEngine::new());
    let listener = spawn_state_listener(&engine)?;

    let interface = EventLoop::spawn(INTERFACE_THREAD)
        .context("Failed to start the interface thread")?;
    let application = EventLoop::spawn(APPLICATION_THREAD)
        .context("Failed to start the application thread")?;

    let tools = Arc::new(ToolManager::new(&engine)?);
    let dispatcher = Arc::new(ActionDispatcher::new(
        Arc::clone(&engine),
        Arc::clone(&tools),
        application.handle(),
        settings.undo_depth,
    ));

    let dock = ToolsDock::new(interface.handle(), Arc::clone(&tools), Arc::clone(&dispatcher))
        .context("Interface thread stopped before the tools dock was built")?;

    for tool_type in &settings.startup_tools {
        dispatcher.post_action(Action::open_tool(tool_type.as_str()));
    }
    application.handle().flush();
    interface.handle().flush();
    tracing::info!("{} tools open, active: {:?}", tools.num_tools(), tools.active_toolid());

    if dock.tool_changed(0) {
        application.handle().flush();
        interface.handle().flush();
        tracing::info!("Active tool after switching: {:?}", tools.active_toolid());

        let context = DefaultActionContext::new(ActionSource::Interface);
        if dispatcher.undo(&context) {
            tracing::info!("Undo restored active tool {:?}", tools.active_toolid());
        }
        if dispatcher.redo(&context) {
            tracing::info!("Redo reapplied active tool {:?}", tools.active_toolid());
        }
        interface.handle().flush();
    }

    engine.with_lock(|engine| {
        for index in 0..engine.number_of_states() {
            if let Ok(state) = engine.get_state_at(index) {
                tracing::info!("{} = {}", state.id(), state.export_to_string());
            }
        }
    });
    dock.with_toolbox(|toolbox| {
        for widget in toolbox.widgets() {
            tracing::info!("{} page: {} ({})", dock.title(), widget.title, widget.toolid);
        }
    });
    dispatcher.metrics().log_summary();

    // Everything holding a state notifier must go before the listener can finish
    drop(dock);
    application.shutdown();
    interface.shutdown();
    drop(dispatcher);
    drop(tools);
    drop(engine);

    if listener.join().is_err() {
        tracing::error!("State listener thread panicked");
    }

    tracing::info!("Application shutdown complete");
    Ok(())
}

/// Log state changes from a background thread until the engine is gone
fn spawn_state_listener(engine: &StateEngine) -> Result<std::thread::JoinHandle<()>> {
    let mut rx = engine.subscribe();

    std::thread::Builder::new()
        .name("state-listener".to_string())
        .spawn(move || {
            tracing::debug!("State listener thread started");

            loop {
                match rx.blocking_recv() {
                    Ok(StateChange::HandlerRegistered { handler_id }) => {
                        tracing::debug!("Handler registered: {}", handler_id);
                    }
                    Ok(StateChange::HandlerRemoved { handler_id }) => {
                        tracing::debug!("Handler removed: {}", handler_id);
                    }
                    Ok(StateChange::ValueChanged { state_id, value }) => {
                        tracing::debug!("{} changed to {}", state_id, value);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("State listener lagged, skipped {} changes", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            tracing::debug!("State listener thread terminated");
        })
        .context("Failed to start the state listener thread")
}
