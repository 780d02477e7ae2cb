// State management module
//
// This module provides the StateEngine registry, the StateHandlers that own state
// variables, and the change events emitted when either of them changes.

pub mod engine;
pub mod handler;
pub mod variable;

pub use engine::{STATE_ID_SEPARATOR, StateEngine};
pub use handler::{StateHandler, StateProvider, StateTable};
pub use variable::{StateHandle, StateValue, StateVariable};

use thiserror::Error;

/// Change events broadcast by the [`StateEngine`]
///
/// These events notify interested parties (primarily the interface) about
/// registry and value changes without requiring them to poll.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A handler was registered under this id
    HandlerRegistered { handler_id: String },

    /// A handler was unregistered
    HandlerRemoved { handler_id: String },

    /// A state variable took a new value
    ValueChanged { state_id: String, value: String },
}

/// Errors raised by the state registry and state variables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// Registering an id twice is a programming error
    #[error("State handler {0} is already registered")]
    DuplicateHandlerId(String),

    #[error("State id '{0}' has no handler separator")]
    MalformedStateId(String),

    #[error("State handler '{0}' does not exist")]
    HandlerNotFound(String),

    #[error("State '{0}' does not exist")]
    StateNotFound(String),

    #[error("State index {index} out of range ({count} states)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("State '{0}' already exists")]
    DuplicateState(String),

    #[error("State '{state_id}' holds a {expected} value, not {found}")]
    TypeMismatch {
        state_id: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{value}' is not an option of state '{state_id}'")]
    InvalidOption { state_id: String, value: String },

    #[error("State '{0}' is read-only")]
    ReadOnly(String),

    #[error("Invalid value '{value}' for state '{state_id}': {reason}")]
    InvalidValue {
        state_id: String,
        value: String,
        reason: String,
    },
}
