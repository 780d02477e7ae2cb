// State handlers
//
// A StateHandler owns an ordered set of state variables and is registered with the
// StateEngine for as long as it lives.

use super::engine::{STATE_ID_SEPARATOR, StateEngine};
use super::variable::{StateHandle, StateValue, StateVariable};
use super::StateError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Read access the engine needs into a handler's states.
///
/// The engine holds these only through `Weak` references; it never keeps a
/// handler alive.
pub trait StateProvider: Send + Sync {
    /// Number of state variables owned by the handler
    fn number_of_states(&self) -> usize;

    /// Look up a state by its handler-relative name
    fn state(&self, name: &str) -> Option<StateHandle>;

    /// Look up a state by its position in insertion order
    fn state_at(&self, index: usize) -> Option<StateHandle>;
}

/// Insertion-ordered storage behind a [`StateHandler`]
#[derive(Default)]
pub struct StateTable {
    states: RwLock<IndexMap<String, StateHandle>>,
}

impl StateProvider for StateTable {
    fn number_of_states(&self) -> usize {
        self.states.read().len()
    }

    fn state(&self, name: &str) -> Option<StateHandle> {
        self.states.read().get(name).cloned()
    }

    fn state_at(&self, index: usize) -> Option<StateHandle> {
        self.states
            .read()
            .get_index(index)
            .map(|(_, state)| Arc::clone(state))
    }
}

/// Owner of a named group of state variables.
///
/// Construction registers the handler with the [`StateEngine`] and fixes its id;
/// dropping it removes the registration again.
///
/// # Example
/// ```ignore
/// let engine = Arc::new(StateEngine::new());
/// let handler = StateHandler::new(&engine, "View", true)?;   // id "View0"
/// handler.add_state("zoom", StateValue::Double(1.0))?;
/// assert!(engine.get_state("View0::zoom").is_ok());
/// ```
pub struct StateHandler {
    handler_id: String,
    table: Arc<StateTable>,
    engine: Arc<StateEngine>,
}

impl StateHandler {
    /// Register a new handler.
    ///
    /// # Arguments
    /// * `engine` - Registry to register with
    /// * `type_name` - Type prefix of the id, or the full id when `auto_id` is false
    /// * `auto_id` - Append the next per-type sequence number to `type_name`
    ///
    /// # Errors
    /// [`StateError::DuplicateHandlerId`] if the resulting id is already registered
    pub fn new(
        engine: &Arc<StateEngine>,
        type_name: &str,
        auto_id: bool,
    ) -> Result<Self, StateError> {
        let table = Arc::new(StateTable::default());
        let provider: Arc<dyn StateProvider> = table.clone();
        let handler_id =
            engine.register_state_handler(type_name, Arc::downgrade(&provider), auto_id)?;

        Ok(Self {
            handler_id,
            table,
            engine: Arc::clone(engine),
        })
    }

    pub fn handler_id(&self) -> &str {
        &self.handler_id
    }

    pub fn engine(&self) -> &Arc<StateEngine> {
        &self.engine
    }

    /// Add a state variable with the given initial value
    pub fn add_state(&self, name: &str, value: StateValue) -> Result<StateHandle, StateError> {
        self.insert(name, value, None, false)
    }

    /// Add a state that only this handler's owner may change.
    ///
    /// String imports, and therefore `SetState` actions, are rejected with
    /// [`StateError::ReadOnly`].
    pub fn add_read_only_state(
        &self,
        name: &str,
        value: StateValue,
    ) -> Result<StateHandle, StateError> {
        self.insert(name, value, None, true)
    }

    /// Add an option state restricted to `options`
    pub fn add_option_state(
        &self,
        name: &str,
        default: &str,
        options: &[&str],
    ) -> Result<StateHandle, StateError> {
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        if !options.iter().any(|o| o == default) {
            return Err(StateError::InvalidOption {
                state_id: self.full_id(name),
                value: default.to_string(),
            });
        }
        self.insert(name, StateValue::Option(default.to_string()), Some(options), false)
    }

    fn insert(
        &self,
        name: &str,
        value: StateValue,
        options: Option<Vec<String>>,
        read_only: bool,
    ) -> Result<StateHandle, StateError> {
        let state_id = self.full_id(name);
        let mut states = self.table.states.write();
        if states.contains_key(name) {
            return Err(StateError::DuplicateState(state_id));
        }

        let mut state = StateVariable::new(
            state_id,
            name.to_string(),
            value,
            options,
            self.engine.notifier(),
        );
        if read_only {
            state = state.into_read_only();
        }
        let state = Arc::new(state);
        states.insert(name.to_string(), Arc::clone(&state));
        Ok(state)
    }

    fn full_id(&self, name: &str) -> String {
        format!("{}{}{}", self.handler_id, STATE_ID_SEPARATOR, name)
    }

    /// State by handler-relative name
    pub fn state(&self, name: &str) -> Option<StateHandle> {
        self.table.state(name)
    }

    /// State by full id; the handler part must be this handler's id
    pub fn get_state(&self, state_id: &str) -> Result<StateHandle, StateError> {
        match state_id.split_once(STATE_ID_SEPARATOR) {
            Some((handler_id, name)) if handler_id == self.handler_id => self
                .table
                .state(name)
                .ok_or_else(|| StateError::StateNotFound(state_id.to_string())),
            Some(_) => Err(StateError::StateNotFound(state_id.to_string())),
            None => Err(StateError::MalformedStateId(state_id.to_string())),
        }
    }

    pub fn get_state_at(&self, index: usize) -> Result<StateHandle, StateError> {
        self.table
            .state_at(index)
            .ok_or(StateError::IndexOutOfRange {
                index,
                count: self.number_of_states(),
            })
    }

    pub fn number_of_states(&self) -> usize {
        self.table.number_of_states()
    }

    /// All states in insertion order
    pub fn states(&self) -> Vec<StateHandle> {
        self.table.states.read().values().cloned().collect()
    }
}

impl Drop for StateHandler {
    fn drop(&mut self) {
        self.engine.remove_state_handler(&self.handler_id);
    }
}

impl std::fmt::Debug for StateHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandler")
            .field("handler_id", &self.handler_id)
            .field("states", &self.number_of_states())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_id_registration() {
        let engine = Arc::new(StateEngine::new());
        let first = StateHandler::new(&engine, "View", true).unwrap();
        let second = StateHandler::new(&engine, "View", true).unwrap();

        assert_eq!(first.handler_id(), "View0");
        assert_eq!(second.handler_id(), "View1");
        assert!(engine.has_handler("View1"));
    }

    #[test]
    fn test_state_ids_are_prefixed() {
        let engine = Arc::new(StateEngine::new());
        let handler = StateHandler::new(&engine, "Layer", false).unwrap();
        let state = handler.add_state("opacity", StateValue::Double(1.0)).unwrap();

        assert_eq!(state.id(), "Layer::opacity");
        assert_eq!(state.name(), "opacity");
        assert!(Arc::ptr_eq(&handler.get_state("Layer::opacity").unwrap(), &state));
    }

    #[test]
    fn test_duplicate_state_name_rejected() {
        let engine = Arc::new(StateEngine::new());
        let handler = StateHandler::new(&engine, "Layer", true).unwrap();
        handler.add_state("name", StateValue::String("a".into())).unwrap();

        let err = handler
            .add_state("name", StateValue::String("b".into()))
            .unwrap_err();
        assert_eq!(err, StateError::DuplicateState("Layer0::name".to_string()));
        assert_eq!(handler.number_of_states(), 1);
    }

    #[test]
    fn test_option_default_must_be_listed() {
        let engine = Arc::new(StateEngine::new());
        let handler = StateHandler::new(&engine, "Filter", true).unwrap();

        assert!(handler.add_option_state("mode", "zero", &["zero", "one"]).is_ok());
        assert!(matches!(
            handler.add_option_state("other", "two", &["zero", "one"]),
            Err(StateError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_lookup_rejects_foreign_handler_prefix() {
        let engine = Arc::new(StateEngine::new());
        let handler = StateHandler::new(&engine, "A", false).unwrap();
        handler.add_state("x", StateValue::Int(0)).unwrap();

        assert!(handler.get_state("B::x").is_err());
        assert!(matches!(
            handler.get_state("x"),
            Err(StateError::MalformedStateId(_))
        ));
    }

    #[test]
    fn test_drop_unregisters() {
        let engine = Arc::new(StateEngine::new());
        {
            let handler = StateHandler::new(&engine, "Temp", true).unwrap();
            handler.add_state("x", StateValue::Int(0)).unwrap();
            assert_eq!(engine.number_of_states(), 1);
        }
        assert!(!engine.has_handler("Temp0"));
        assert_eq!(engine.number_of_states(), 0);
    }
}
