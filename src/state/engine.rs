// StateEngine - registry of every state handler in the process
//
// Maps handler ids to the (non-owned) state tables of their handlers, hands out
// handler ids, and resolves global state ids. One engine is shared through an Arc
// by everything that owns state.

use super::handler::StateProvider;
use super::variable::StateHandle;
use super::{StateChange, StateError};
use indexmap::IndexMap;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// Separator between the handler id and the local state name
pub const STATE_ID_SEPARATOR: &str = "::";

/// Capacity of the state change broadcast channel
const STATE_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct Registry {
    /// Registration order is the global enumeration order
    handlers: IndexMap<String, Weak<dyn StateProvider>>,

    /// One counter per type name, created on first use and never reset
    counters: HashMap<String, Arc<AtomicUsize>>,
}

/// Thread-safe registry resolving state ids to the handlers that own them.
///
/// Every operation holds the engine's reentrant lock for its full duration, so a
/// thread that already holds it (see [`with_lock`](Self::with_lock)) can call back
/// into the engine without deadlocking.
///
/// # Related Types
///
/// - [`super::StateHandler`]: registers itself here on construction
/// - [`StateChange`]: events broadcast on registration and value changes
pub struct StateEngine {
    registry: ReentrantMutex<RefCell<Registry>>,

    /// Broadcast channel for state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateEngine {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            registry: ReentrantMutex::new(RefCell::new(Registry::default())),
            state_tx,
        }
    }

    /// Register a handler and assign its id.
    ///
    /// With `auto_id` the id is `type_name` followed by the next value of that
    /// type's sequence counter; otherwise it is `type_name` itself.
    ///
    /// # Errors
    /// [`StateError::DuplicateHandlerId`] if the id is already registered. This is a
    /// programming error; the existing registration is left untouched.
    pub fn register_state_handler(
        &self,
        type_name: &str,
        handler: Weak<dyn StateProvider>,
        auto_id: bool,
    ) -> Result<String, StateError> {
        let guard = self.registry.lock();
        let mut registry = guard.borrow_mut();

        let handler_id = if auto_id {
            let counter = registry
                .counters
                .entry(type_name.to_string())
                .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
                .clone();
            format!("{}{}", type_name, counter.fetch_add(1, Ordering::SeqCst))
        } else {
            type_name.to_string()
        };

        if registry.handlers.contains_key(&handler_id) {
            tracing::error!(
                "Trying to register state handler {} that already exists",
                handler_id
            );
            return Err(StateError::DuplicateHandlerId(handler_id));
        }

        registry.handlers.insert(handler_id.clone(), handler);
        drop(registry);

        tracing::debug!("State handler registered with ID {}", handler_id);
        let _ = self.state_tx.send(StateChange::HandlerRegistered {
            handler_id: handler_id.clone(),
        });

        Ok(handler_id)
    }

    /// Remove a handler registration. Removing an unknown id is logged and ignored.
    pub fn remove_state_handler(&self, handler_id: &str) {
        let guard = self.registry.lock();
        let removed = guard.borrow_mut().handlers.shift_remove(handler_id);

        if removed.is_none() {
            tracing::error!(
                "Trying to remove a state handler that does not exist: {}",
                handler_id
            );
            return;
        }

        tracing::debug!("State handler removed: {}", handler_id);
        let _ = self.state_tx.send(StateChange::HandlerRemoved {
            handler_id: handler_id.to_string(),
        });
    }

    /// Resolve a full state id (`<handler_id>::<name>`).
    ///
    /// An id without the separator is rejected as
    /// [`StateError::MalformedStateId`] rather than being guessed at.
    pub fn get_state(&self, state_id: &str) -> Result<StateHandle, StateError> {
        let Some((handler_id, name)) = state_id.split_once(STATE_ID_SEPARATOR) else {
            return Err(StateError::MalformedStateId(state_id.to_string()));
        };

        let guard = self.registry.lock();
        let registry = guard.borrow();
        let handler = registry
            .handlers
            .get(handler_id)
            .and_then(Weak::upgrade)
            .ok_or_else(|| StateError::HandlerNotFound(handler_id.to_string()))?;

        handler
            .state(name)
            .ok_or_else(|| StateError::StateNotFound(state_id.to_string()))
    }

    /// State at `index` in the flattened sequence of every handler's states.
    ///
    /// Handlers are visited in registration order and states in insertion order.
    /// The mapping is only stable while no handler registers or unregisters; wrap
    /// multi-call enumeration in [`with_lock`](Self::with_lock).
    pub fn get_state_at(&self, index: usize) -> Result<StateHandle, StateError> {
        let guard = self.registry.lock();
        let registry = guard.borrow();

        let mut offset = 0;
        for handler in registry.handlers.values().filter_map(Weak::upgrade) {
            let count = handler.number_of_states();
            if index < offset + count {
                return handler
                    .state_at(index - offset)
                    .ok_or(StateError::IndexOutOfRange { index, count: offset + count });
            }
            offset += count;
        }

        Err(StateError::IndexOutOfRange {
            index,
            count: offset,
        })
    }

    /// Total number of state variables across all registered handlers
    pub fn number_of_states(&self) -> usize {
        let guard = self.registry.lock();
        let registry = guard.borrow();
        registry
            .handlers
            .values()
            .filter_map(Weak::upgrade)
            .map(|handler| handler.number_of_states())
            .sum()
    }

    pub fn has_handler(&self, handler_id: &str) -> bool {
        self.registry.lock().borrow().handlers.contains_key(handler_id)
    }

    /// Registered handler ids in registration order
    pub fn handler_ids(&self) -> Vec<String> {
        self.registry.lock().borrow().handlers.keys().cloned().collect()
    }

    /// Run `f` while holding the engine lock.
    ///
    /// Engine calls made from inside `f` on the same thread re-enter the lock, so
    /// `number_of_states()` followed by `get_state_at()` sees one consistent
    /// registry.
    pub fn with_lock<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.registry.lock();
        f(self)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Sender handed to state variables so their changes reach subscribers
    pub(crate) fn notifier(&self) -> broadcast::Sender<StateChange> {
        self.state_tx.clone()
    }
}

impl Default for StateEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StateHandler, StateValue};

    fn handler_with_states(engine: &Arc<StateEngine>, type_name: &str, n: usize) -> StateHandler {
        let handler = StateHandler::new(engine, type_name, true).unwrap();
        for i in 0..n {
            handler
                .add_state(&format!("s{}", i), StateValue::Int(i as i64))
                .unwrap();
        }
        handler
    }

    #[test]
    fn test_counter_is_per_type() {
        let engine = Arc::new(StateEngine::new());
        let a0 = StateHandler::new(&engine, "A", true).unwrap();
        let b0 = StateHandler::new(&engine, "B", true).unwrap();
        let a1 = StateHandler::new(&engine, "A", true).unwrap();

        assert_eq!(a0.handler_id(), "A0");
        assert_eq!(b0.handler_id(), "B0");
        assert_eq!(a1.handler_id(), "A1");
    }

    #[test]
    fn test_counter_not_reused_after_removal() {
        let engine = Arc::new(StateEngine::new());
        drop(StateHandler::new(&engine, "Tool", true).unwrap());
        let next = StateHandler::new(&engine, "Tool", true).unwrap();

        assert_eq!(next.handler_id(), "Tool1");
    }

    #[test]
    fn test_duplicate_explicit_id() {
        let engine = Arc::new(StateEngine::new());
        let first = handler_with_states(&engine, "X", 0);
        let explicit = StateHandler::new(&engine, "Fixed", false).unwrap();
        explicit.add_state("a", StateValue::Bool(true)).unwrap();

        let err = StateHandler::new(&engine, "Fixed", false).unwrap_err();
        assert_eq!(err, StateError::DuplicateHandlerId("Fixed".to_string()));

        // Original registration still resolves
        assert!(engine.get_state("Fixed::a").is_ok());
        assert_eq!(engine.handler_ids(), vec!["X0".to_string(), "Fixed".to_string()]);
        drop(first);
    }

    #[test]
    fn test_global_index_spans_handlers() {
        let engine = Arc::new(StateEngine::new());
        let _a = handler_with_states(&engine, "A", 2);
        let _b = handler_with_states(&engine, "B", 3);

        assert_eq!(engine.number_of_states(), 5);
        assert_eq!(engine.get_state_at(0).unwrap().id(), "A0::s0");
        assert_eq!(engine.get_state_at(2).unwrap().id(), "B0::s0");
        assert_eq!(engine.get_state_at(4).unwrap().id(), "B0::s2");
        assert_eq!(
            engine.get_state_at(5).unwrap_err(),
            StateError::IndexOutOfRange { index: 5, count: 5 }
        );
    }

    #[test]
    fn test_lookup_failures_are_distinct() {
        let engine = Arc::new(StateEngine::new());
        let _a = handler_with_states(&engine, "A", 1);

        assert!(matches!(engine.get_state("A0"), Err(StateError::MalformedStateId(_))));
        assert!(matches!(engine.get_state("Z0::s0"), Err(StateError::HandlerNotFound(_))));
        assert!(matches!(engine.get_state("A0::nope"), Err(StateError::StateNotFound(_))));
        assert_eq!(engine.get_state("A0::s0").unwrap().get(), StateValue::Int(0));
    }

    #[test]
    fn test_remove_unknown_handler_is_tolerated() {
        let engine = StateEngine::new();
        engine.remove_state_handler("ghost");
        assert_eq!(engine.number_of_states(), 0);
    }

    #[test]
    fn test_with_lock_reenters() {
        let engine = Arc::new(StateEngine::new());
        let _a = handler_with_states(&engine, "A", 3);

        let ids = engine.with_lock(|engine| {
            (0..engine.number_of_states())
                .map(|i| engine.get_state_at(i).map(|s| s.id().to_string()))
                .collect::<Result<Vec<_>, _>>()
        });
        assert_eq!(ids.unwrap(), vec!["A0::s0", "A0::s1", "A0::s2"]);
    }

    #[test]
    fn test_registration_events() {
        let engine = Arc::new(StateEngine::new());
        let mut rx = engine.subscribe();

        let handler = StateHandler::new(&engine, "Ev", true).unwrap();
        drop(handler);

        assert_eq!(
            rx.try_recv().unwrap(),
            StateChange::HandlerRegistered { handler_id: "Ev0".to_string() }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StateChange::HandlerRemoved { handler_id: "Ev0".to_string() }
        );
    }
}
