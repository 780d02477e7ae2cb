// Action module
//
// Every user-initiated change is an Action: it is validated against the current
// state, executed, and, when it can be reverted, records its own inverse in the
// undo buffer.

pub mod context;
pub mod dispatcher;
pub mod undo;

pub use context::{ActionContext, ActionSource, DefaultActionContext, need_undo};
pub use dispatcher::ActionDispatcher;
pub use undo::{DEFAULT_UNDO_DEPTH, UndoBuffer, UndoEntry};

use crate::state::StateEngine;
use crate::tools::{ToolKind, ToolManager};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Undo tag of tool activations
pub const ACTIVATE_TOOL_TAG: &str = "Activate Tool";

/// Undo tag of state changes
pub const SET_STATE_TAG: &str = "Set State";

/// Everything an action may read or change while it runs
pub struct ActionEnv<'a> {
    pub engine: &'a StateEngine,
    pub tools: &'a ToolManager,
    pub undo: &'a mut UndoBuffer,
}

/// A user-level command
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Make an open tool the active tool
    ActivateTool { toolid: String },

    /// Set a state variable from its string form
    SetState { state_id: String, value: String },

    /// Open a new tool of the named type
    OpenTool { tool_type: String },

    /// Close an open tool
    CloseTool { toolid: String },
}

impl Action {
    pub fn activate_tool(toolid: impl Into<String>) -> Self {
        Action::ActivateTool {
            toolid: toolid.into(),
        }
    }

    pub fn set_state(state_id: impl Into<String>, value: impl Into<String>) -> Self {
        Action::SetState {
            state_id: state_id.into(),
            value: value.into(),
        }
    }

    pub fn open_tool(tool_type: impl Into<String>) -> Self {
        Action::OpenTool {
            tool_type: tool_type.into(),
        }
    }

    pub fn close_tool(toolid: impl Into<String>) -> Self {
        Action::CloseTool {
            toolid: toolid.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Action::ActivateTool { .. } => "ActivateTool",
            Action::SetState { .. } => "SetState",
            Action::OpenTool { .. } => "OpenTool",
            Action::CloseTool { .. } => "CloseTool",
        }
    }

    /// Check the action against the current state without changing anything.
    ///
    /// On failure one error is reported through `context`.
    pub fn validate(&self, env: &ActionEnv<'_>, context: &dyn ActionContext) -> bool {
        let result = match self {
            Action::ActivateTool { toolid } | Action::CloseTool { toolid } => {
                if env.tools.is_toolid(toolid) {
                    Ok(())
                } else {
                    Err(format!("ToolID '{}' is invalid", toolid))
                }
            }
            Action::SetState { state_id, value } => env
                .engine
                .get_state(state_id)
                .and_then(|state| state.validate_string(value))
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Action::OpenTool { tool_type } => tool_type
                .parse::<ToolKind>()
                .map(|_| ())
                .map_err(|e| e.to_string()),
        };

        match result {
            Ok(()) => true,
            Err(error) => {
                context.report_error(&error);
                false
            }
        }
    }

    /// Execute a validated action. Unless the undo buffer is replaying it, an
    /// undoable action records exactly one inverse once its change succeeded.
    pub fn run(&self, env: &mut ActionEnv<'_>, context: &dyn ActionContext) -> bool {
        match self {
            Action::ActivateTool { toolid } => {
                let previous = env.tools.active_toolid();
                if !report(env.tools.activate_tool(toolid), context) {
                    return false;
                }

                // Nothing to go back to when no tool was active
                if let Some(previous) = previous.filter(|_| need_undo(context)) {
                    env.undo.record(UndoEntry::new(
                        ACTIVATE_TOOL_TAG,
                        Action::activate_tool(previous),
                        self.clone(),
                    ));
                }
                true
            }
            Action::SetState { state_id, value } => {
                let state = match env.engine.get_state(state_id) {
                    Ok(state) => state,
                    Err(e) => return report(Err(e), context),
                };
                let parsed = match state.validate_string(value) {
                    Ok(parsed) => parsed,
                    Err(e) => return report(Err(e), context),
                };

                let previous = state.export_to_string();
                if !report(state.set(parsed).map(|_| ()), context) {
                    return false;
                }

                if need_undo(context) {
                    env.undo.record(UndoEntry::new(
                        SET_STATE_TAG,
                        Action::set_state(state_id.clone(), previous),
                        self.clone(),
                    ));
                }
                true
            }
            Action::OpenTool { tool_type } => {
                let opened = tool_type
                    .parse::<ToolKind>()
                    .and_then(|kind| env.tools.open_tool(kind));
                match opened {
                    Ok(toolid) => {
                        context.report_message(&format!("Opened tool {}", toolid));
                        true
                    }
                    Err(e) => report(Err(e), context),
                }
            }
            Action::CloseTool { toolid } => report(env.tools.close_tool(toolid), context),
        }
    }
}

fn report<E: fmt::Display>(result: Result<(), E>, context: &dyn ActionContext) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            context.report_error(&e.to_string());
            false
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ActivateTool { toolid } | Action::CloseTool { toolid } => {
                write!(f, "{} {}", self.type_name(), toolid)
            }
            Action::SetState { state_id, value } => {
                write!(f, "{} {} {}", self.type_name(), state_id, value)
            }
            Action::OpenTool { tool_type } => write!(f, "{} {}", self.type_name(), tool_type),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionParseError {
    #[error("Empty action string")]
    Empty,

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Action {action} is missing its {argument}")]
    MissingArgument {
        action: &'static str,
        argument: &'static str,
    },
}

/// Parses the script form written by `Display`: `<Action> <arguments>`.
///
/// The action name is case-insensitive. The SetState value is the rest of the
/// line, so it may contain spaces.
impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, rest) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
        let rest = rest.trim();
        if name.is_empty() {
            return Err(ActionParseError::Empty);
        }

        let required = |action: &'static str, argument: &'static str, value: &str| {
            if value.is_empty() {
                Err(ActionParseError::MissingArgument { action, argument })
            } else {
                Ok(value.to_string())
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "activatetool" => Ok(Action::ActivateTool {
                toolid: required("ActivateTool", "tool id", rest)?,
            }),
            "closetool" => Ok(Action::CloseTool {
                toolid: required("CloseTool", "tool id", rest)?,
            }),
            "opentool" => Ok(Action::OpenTool {
                tool_type: required("OpenTool", "tool type", rest)?,
            }),
            "setstate" => {
                let (state_id, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Ok(Action::SetState {
                    state_id: required("SetState", "state id", state_id)?,
                    value: value.trim().to_string(),
                })
            }
            _ => Err(ActionParseError::UnknownAction(name.to_string())),
        }
    }
}
