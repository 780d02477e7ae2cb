// Seg3D - action and state core of the Seg3D volumetric segmentation application
//
// This is the library crate: the state registry, the action/undo pipeline, the tool
// manager and the headless interface model. The binary crate (main.rs) drives them.

pub mod action;
pub mod config;
pub mod event_loop;
pub mod geometry;
pub mod interface;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod signal;
pub mod state;
pub mod tools;

// Re-export commonly used types for convenience
pub use action::{Action, ActionContext, ActionDispatcher, ActionSource, DefaultActionContext};
pub use config::ConfigManager;
pub use event_loop::{EventLoop, EventLoopHandle};
pub use geometry::{GridTransform, Transform};
pub use interface::ToolsDock;
pub use models::Settings;
pub use state::{StateChange, StateEngine, StateError, StateHandler, StateValue};
pub use tools::{ToolKind, ToolManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Name of the thread that owns the interface model
pub const INTERFACE_THREAD: &str = "interface";

/// Name of the thread that runs posted actions
pub const APPLICATION_THREAD: &str = "application";
