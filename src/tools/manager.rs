// ToolManager - owner of all open tools
//
// Tracks the open tools and the active tool, and notifies the interface when tools
// are opened, closed or activated. The manager is a StateHandler itself; its
// read-only `active_tool` state mirrors the active tool id.

use super::tool::{Tool, ToolHandle, ToolKind};
use super::ToolError;
use crate::signal::{Connection, Signal};
use crate::state::{StateEngine, StateError, StateHandle, StateHandler, StateValue};
use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::sync::Arc;

/// Explicit handler id of the tool manager
pub const TOOL_MANAGER_ID: &str = "ToolManager";

/// Open tools keyed by tool id, in the order they were opened
pub type ToolList = IndexMap<String, ToolHandle>;

/// Holds the tool list lock; other threads cannot open, close or activate tools
/// until it is dropped
pub struct ToolListGuard<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<ToolList>>,
}

impl ToolListGuard<'_> {
    /// Release the lock (same as dropping the guard)
    pub fn unlock(self) {}
}

/// Manages the set of open tools.
///
/// Tool-list changes and their notifications happen under one reentrant lock, so
/// a consumer that holds [`lock_tool_list`](Self::lock_tool_list) while it connects
/// and enumerates sees every tool exactly once: either in the enumeration or
/// through a later notification.
///
/// Notification callbacks run on whichever thread changed the tool list.
pub struct ToolManager {
    handler: StateHandler,
    active_tool_state: StateHandle,
    engine: Arc<StateEngine>,
    tools: ReentrantMutex<RefCell<ToolList>>,
    open_tool_signal: Signal<ToolHandle>,
    close_tool_signal: Signal<ToolHandle>,
    activate_tool_signal: Signal<ToolHandle>,
}

impl ToolManager {
    /// Create the tool manager and register it under [`TOOL_MANAGER_ID`]
    pub fn new(engine: &Arc<StateEngine>) -> Result<Self, StateError> {
        let handler = StateHandler::new(engine, TOOL_MANAGER_ID, false)?;
        // Only activate_tool and close_tool move the active tool
        let active_tool_state =
            handler.add_read_only_state("active_tool", StateValue::String(String::new()))?;

        Ok(Self {
            handler,
            active_tool_state,
            engine: Arc::clone(engine),
            tools: ReentrantMutex::new(RefCell::new(IndexMap::new())),
            open_tool_signal: Signal::new(),
            close_tool_signal: Signal::new(),
            activate_tool_signal: Signal::new(),
        })
    }

    pub fn handler(&self) -> &StateHandler {
        &self.handler
    }

    /// Instantiate a tool of `kind` and make it the active tool
    ///
    /// # Returns
    /// The id of the new tool
    pub fn open_tool(&self, kind: ToolKind) -> Result<String, ToolError> {
        let tool = Arc::new(Tool::new(&self.engine, kind)?);
        let toolid = tool.toolid().to_string();

        let _guard = self.tools.lock();
        self.tools
            .lock()
            .borrow_mut()
            .insert(toolid.clone(), Arc::clone(&tool));

        tracing::info!("Opened tool {}", toolid);
        self.open_tool_signal.emit(tool);
        self.activate_tool(&toolid)?;

        Ok(toolid)
    }

    /// Close a tool. If it was active, the most recently opened remaining tool
    /// becomes active.
    pub fn close_tool(&self, toolid: &str) -> Result<(), ToolError> {
        let _guard = self.tools.lock();
        let tool = self
            .tools
            .lock()
            .borrow_mut()
            .shift_remove(toolid)
            .ok_or_else(|| ToolError::UnknownToolId(toolid.to_string()))?;

        let was_active = self.active_toolid().as_deref() == Some(toolid);
        tool.deactivate();

        tracing::info!("Closed tool {}", toolid);
        self.close_tool_signal.emit(tool);

        if was_active {
            let next = self.tools.lock().borrow().keys().last().cloned();
            match next {
                Some(next) => self.activate_tool(&next)?,
                None => self.set_active_toolid(""),
            }
        }

        Ok(())
    }

    /// Make `toolid` the active tool. Activating the active tool is a no-op.
    pub fn activate_tool(&self, toolid: &str) -> Result<(), ToolError> {
        let _guard = self.tools.lock();
        let tool = self
            .get_tool(toolid)
            .ok_or_else(|| ToolError::UnknownToolId(toolid.to_string()))?;

        let previous = self.active_toolid();
        if previous.as_deref() == Some(toolid) {
            return Ok(());
        }

        if let Some(previous) = previous.and_then(|id| self.get_tool(&id)) {
            previous.deactivate();
        }
        tool.activate();
        self.set_active_toolid(toolid);

        tracing::debug!("Active tool is now {}", toolid);
        self.activate_tool_signal.emit(tool);
        Ok(())
    }

    fn set_active_toolid(&self, toolid: &str) {
        if let Err(e) = self
            .active_tool_state
            .set(StateValue::String(toolid.to_string()))
        {
            tracing::error!("Failed to record active tool {}: {}", toolid, e);
        }
    }

    /// Id of the active tool, if any
    pub fn active_toolid(&self) -> Option<String> {
        self.active_tool_state
            .get()
            .as_str()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    pub fn is_toolid(&self, toolid: &str) -> bool {
        self.tools.lock().borrow().contains_key(toolid)
    }

    pub fn get_tool(&self, toolid: &str) -> Option<ToolHandle> {
        self.tools.lock().borrow().get(toolid).cloned()
    }

    /// Snapshot of the open tools
    pub fn tool_list(&self) -> ToolList {
        self.tools.lock().borrow().clone()
    }

    pub fn num_tools(&self) -> usize {
        self.tools.lock().borrow().len()
    }

    /// Block tool-list changes from other threads until the guard is dropped.
    ///
    /// The owning thread may keep calling the manager while holding the guard.
    pub fn lock_tool_list(&self) -> ToolListGuard<'_> {
        ToolListGuard {
            _guard: self.tools.lock(),
        }
    }

    pub fn connect_open_tool<F>(&self, callback: F) -> Connection
    where
        F: Fn(ToolHandle) + Send + Sync + 'static,
    {
        self.open_tool_signal.connect(callback)
    }

    pub fn connect_close_tool<F>(&self, callback: F) -> Connection
    where
        F: Fn(ToolHandle) + Send + Sync + 'static,
    {
        self.close_tool_signal.connect(callback)
    }

    pub fn connect_activate_tool<F>(&self, callback: F) -> Connection
    where
        F: Fn(ToolHandle) + Send + Sync + 'static,
    {
        self.activate_tool_signal.connect(callback)
    }
}
