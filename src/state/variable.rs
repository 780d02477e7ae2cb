// State variables
//
// A StateVariable is one identified, typed value owned by a StateHandler. Values
// convert to and from strings so actions and scripts can address them uniformly.

use super::{StateChange, StateError};
use crate::geometry::GridTransform;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared handle to a state variable
pub type StateHandle = Arc<StateVariable>;

/// The value held by a state variable.
///
/// The variant fixes the variable's kind for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// One entry out of the variable's option list
    Option(String),
    GridTransform(GridTransform),
}

impl StateValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StateValue::Bool(_) => "bool",
            StateValue::Int(_) => "int",
            StateValue::Double(_) => "double",
            StateValue::String(_) => "string",
            StateValue::Option(_) => "option",
            StateValue::GridTransform(_) => "grid transform",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            StateValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// String contents of string and option values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(value) | StateValue::Option(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_grid_transform(&self) -> Option<&GridTransform> {
        match self {
            StateValue::GridTransform(value) => Some(value),
            _ => None,
        }
    }

    /// Parse `input` as a value of the same kind as `self`
    fn parse_same_kind(&self, input: &str) -> Result<StateValue, String> {
        match self {
            StateValue::Bool(_) => match input.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(StateValue::Bool(true)),
                "false" | "0" => Ok(StateValue::Bool(false)),
                other => Err(format!("'{}' is not a boolean", other)),
            },
            StateValue::Int(_) => input
                .trim()
                .parse()
                .map(StateValue::Int)
                .map_err(|e| e.to_string()),
            StateValue::Double(_) => input
                .trim()
                .parse()
                .map(StateValue::Double)
                .map_err(|e| e.to_string()),
            StateValue::String(_) => Ok(StateValue::String(input.to_string())),
            StateValue::Option(_) => Ok(StateValue::Option(input.trim().to_string())),
            StateValue::GridTransform(_) => input
                .parse()
                .map(StateValue::GridTransform)
                .map_err(|e: crate::geometry::TransformParseError| e.to_string()),
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(value) => write!(f, "{}", value),
            StateValue::Int(value) => write!(f, "{}", value),
            StateValue::Double(value) => write!(f, "{}", value),
            StateValue::String(value) | StateValue::Option(value) => f.write_str(value),
            StateValue::GridTransform(value) => write!(f, "{}", value),
        }
    }
}

/// One named state variable.
///
/// Owned by its [`StateHandler`](super::StateHandler); the engine only hands out
/// shared handles. Every change of value is broadcast as
/// [`StateChange::ValueChanged`].
pub struct StateVariable {
    id: String,
    name: String,
    value: RwLock<StateValue>,
    options: Option<Vec<String>>,
    read_only: bool,
    notifier: broadcast::Sender<StateChange>,
}

impl StateVariable {
    pub(crate) fn new(
        id: String,
        name: String,
        value: StateValue,
        options: Option<Vec<String>>,
        notifier: broadcast::Sender<StateChange>,
    ) -> Self {
        Self {
            id,
            name,
            value: RwLock::new(value),
            options,
            read_only: false,
            notifier,
        }
    }

    /// Refuse string imports; only the owner changes the value through [`set`](Self::set)
    pub(crate) fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Full id, `<handler_id>::<name>`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name relative to the owning handler
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> StateValue {
        self.value.read().clone()
    }

    /// Whether actions and scripts are barred from changing this state
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Allowed values of an option state
    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    /// Check that `value` is acceptable without storing it
    pub fn validate(&self, value: &StateValue) -> Result<(), StateError> {
        let current = self.value.read();
        if std::mem::discriminant(&*current) != std::mem::discriminant(value) {
            return Err(StateError::TypeMismatch {
                state_id: self.id.clone(),
                expected: current.kind_name(),
                found: value.kind_name(),
            });
        }
        drop(current);

        if let (StateValue::Option(option), Some(options)) = (value, &self.options) {
            if !options.iter().any(|o| o == option) {
                return Err(StateError::InvalidOption {
                    state_id: self.id.clone(),
                    value: option.clone(),
                });
            }
        }
        Ok(())
    }

    /// Parse `input` for this variable's kind and option list without storing it
    pub fn validate_string(&self, input: &str) -> Result<StateValue, StateError> {
        if self.read_only {
            return Err(StateError::ReadOnly(self.id.clone()));
        }

        let parsed = self
            .value
            .read()
            .parse_same_kind(input)
            .map_err(|reason| StateError::InvalidValue {
                state_id: self.id.clone(),
                value: input.to_string(),
                reason,
            })?;
        self.validate(&parsed)?;
        Ok(parsed)
    }

    /// Store a new value.
    ///
    /// # Returns
    /// `Ok(true)` if the value changed, `Ok(false)` if it was already equal
    pub fn set(&self, value: StateValue) -> Result<bool, StateError> {
        self.validate(&value)?;

        {
            let mut current = self.value.write();
            if *current == value {
                return Ok(false);
            }
            *current = value.clone();
        }

        tracing::trace!("State {} set to {}", self.id, value);

        // Ignore send errors - it's OK if no one is listening
        let _ = self.notifier.send(StateChange::ValueChanged {
            state_id: self.id.clone(),
            value: value.to_string(),
        });
        Ok(true)
    }

    /// Set the value from its string form
    pub fn import_from_string(&self, input: &str) -> Result<bool, StateError> {
        let value = self.validate_string(input)?;
        self.set(value)
    }

    pub fn export_to_string(&self) -> String {
        self.value.read().to_string()
    }
}

impl fmt::Debug for StateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateVariable")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .field("options", &self.options)
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(value: StateValue, options: Option<Vec<String>>) -> (StateVariable, broadcast::Receiver<StateChange>) {
        let (tx, rx) = broadcast::channel(16);
        let var = StateVariable::new(
            "Test0::value".to_string(),
            "value".to_string(),
            value,
            options,
            tx,
        );
        (var, rx)
    }

    #[test]
    fn test_set_emits_change() {
        let (var, mut rx) = variable(StateValue::Int(1), None);

        assert!(var.set(StateValue::Int(5)).unwrap());
        assert_eq!(var.get(), StateValue::Int(5));
        assert_eq!(
            rx.try_recv().unwrap(),
            StateChange::ValueChanged {
                state_id: "Test0::value".to_string(),
                value: "5".to_string()
            }
        );
    }

    #[test]
    fn test_set_same_value_is_silent() {
        let (var, mut rx) = variable(StateValue::Bool(true), None);

        assert!(!var.set(StateValue::Bool(true)).unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let (var, _rx) = variable(StateValue::Bool(false), None);

        let err = var.set(StateValue::Int(1)).unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { expected: "bool", found: "int", .. }));
        assert_eq!(var.get(), StateValue::Bool(false));
    }

    #[test]
    fn test_option_outside_list_rejected() {
        let options = vec!["zero".to_string(), "max_value".to_string()];
        let (var, _rx) = variable(StateValue::Option("zero".to_string()), Some(options));

        assert!(var.import_from_string("max_value").unwrap());
        let err = var.import_from_string("median").unwrap_err();
        assert!(matches!(err, StateError::InvalidOption { .. }));
        assert_eq!(var.export_to_string(), "max_value");
    }

    #[test]
    fn test_import_bool_forms() {
        let (var, _rx) = variable(StateValue::Bool(false), None);

        var.import_from_string("TRUE").unwrap();
        assert_eq!(var.get().as_bool(), Some(true));
        var.import_from_string("0").unwrap();
        assert_eq!(var.get().as_bool(), Some(false));
        assert!(var.import_from_string("maybe").is_err());
    }

    #[test]
    fn test_grid_transform_state() {
        let (var, _rx) = variable(StateValue::GridTransform(GridTransform::default()), None);

        var.import_from_string("[4 5 6 1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1]")
            .unwrap();
        assert_eq!(
            var.get().as_grid_transform(),
            Some(&GridTransform::new(4, 5, 6))
        );
        assert!(var.import_from_string("[4 5 6]").is_err());
        assert_eq!(var.get().as_grid_transform().map(|g| g.nx()), Some(4));
    }

    #[test]
    fn test_read_only_state_refuses_imports() {
        let (var, mut rx) = variable(StateValue::String("PaintTool0".to_string()), None);
        let var = var.into_read_only();

        let err = var.import_from_string("Bogus7").unwrap_err();
        assert_eq!(err, StateError::ReadOnly("Test0::value".to_string()));
        assert!(var.validate_string("PaintTool0").is_err());
        assert_eq!(var.export_to_string(), "PaintTool0");
        assert!(rx.try_recv().is_err());

        // The owner still sets it directly
        assert!(var.set(StateValue::String("PaintTool1".to_string())).unwrap());
        assert_eq!(var.export_to_string(), "PaintTool1");
    }
}
