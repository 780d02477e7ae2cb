// Tools module
//
// Tools are StateHandlers representing interactive modes. The ToolManager owns the
// open tools and tells the interface when they change.

pub mod manager;
pub mod tool;

pub use manager::{TOOL_MANAGER_ID, ToolList, ToolListGuard, ToolManager};
pub use tool::{Tool, ToolHandle, ToolInfo, ToolKind};

use crate::state::StateError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool type '{0}'")]
    UnknownToolType(String),

    #[error("ToolID '{0}' is invalid")]
    UnknownToolId(String),

    #[error(transparent)]
    State(#[from] StateError),
}
