// ToolsDock - headless model of the tools dock widget
//
// Keeps one ToolWidget per open tool inside a ToolBox. The ToolBox is only ever
// changed on the interface thread: tool-manager notifications that arrive on any
// other thread are posted to the interface loop as ToolEvents and applied there.

use crate::action::{Action, ActionDispatcher};
use crate::event_loop::EventLoopHandle;
use crate::signal::Connection;
use crate::tools::{ToolHandle, ToolKind, ToolManager};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

/// Title shown on the dock
pub const DOCK_TITLE: &str = "Tools/Plugins";

/// Tool-manager notification, marshaled to the interface thread.
///
/// Events carry snapshots, never the tool itself, so a queued event cannot keep
/// a closed tool's states registered.
#[derive(Debug, Clone)]
pub enum ToolEvent {
    Open(ToolWidget),
    Close(String),
    Activate(String),
}

impl ToolEvent {
    fn opened(tool: &ToolHandle) -> Self {
        ToolEvent::Open(ToolWidget::for_tool(tool))
    }

    fn closed(tool: &ToolHandle) -> Self {
        ToolEvent::Close(tool.toolid().to_string())
    }

    fn activated(tool: &ToolHandle) -> Self {
        ToolEvent::Activate(tool.toolid().to_string())
    }
}

/// What the dock displays for one tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolWidget {
    pub toolid: String,
    pub kind: ToolKind,
    /// Page title, e.g. "Paint Brush 0"
    pub title: String,
    pub description: &'static str,
    /// Full ids of the states the widget edits, in display order
    pub state_ids: Vec<String>,
}

impl ToolWidget {
    /// Build the widget matching the tool's kind
    pub fn for_tool(tool: &ToolHandle) -> Self {
        let info = tool.kind().info();
        Self {
            toolid: tool.toolid().to_string(),
            kind: tool.kind(),
            title: format!("{} {}", tool.menu_name(), tool.toolid_number()),
            description: info.description,
            state_ids: tool
                .handler()
                .states()
                .iter()
                .map(|state| state.id().to_string())
                .collect(),
        }
    }
}

/// Ordered pages of tool widgets with one current page
#[derive(Debug)]
pub struct ToolBox {
    widgets: IndexMap<String, ToolWidget>,
    active: Option<String>,
    owner: ThreadId,
    last_mutation: Option<ThreadId>,
}

impl ToolBox {
    fn new(owner: ThreadId) -> Self {
        Self {
            widgets: IndexMap::new(),
            active: None,
            owner,
            last_mutation: None,
        }
    }

    fn touch(&mut self) {
        let current = std::thread::current().id();
        debug_assert_eq!(current, self.owner, "ToolBox changed off the interface thread");
        self.last_mutation = Some(current);
    }

    fn add_tool(&mut self, widget: ToolWidget) {
        self.touch();
        self.widgets.insert(widget.toolid.clone(), widget);
    }

    fn remove_tool(&mut self, toolid: &str) -> bool {
        self.touch();
        if self.active.as_deref() == Some(toolid) {
            self.active = None;
        }
        self.widgets.shift_remove(toolid).is_some()
    }

    fn set_active_tool(&mut self, toolid: &str) -> bool {
        self.touch();
        if !self.widgets.contains_key(toolid) {
            return false;
        }
        self.active = Some(toolid.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn contains(&self, toolid: &str) -> bool {
        self.widgets.contains_key(toolid)
    }

    pub fn widget(&self, toolid: &str) -> Option<&ToolWidget> {
        self.widgets.get(toolid)
    }

    pub fn widget_at(&self, index: usize) -> Option<&ToolWidget> {
        self.widgets.get_index(index).map(|(_, widget)| widget)
    }

    pub fn index_of(&self, toolid: &str) -> Option<usize> {
        self.widgets.get_index_of(toolid)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &ToolWidget> {
        self.widgets.values()
    }

    pub fn active_toolid(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Index of the current page
    pub fn current_index(&self) -> Option<usize> {
        self.active.as_deref().and_then(|id| self.index_of(id))
    }

    /// Thread that last changed the tool box
    pub fn last_mutation_thread(&self) -> Option<ThreadId> {
        self.last_mutation
    }
}

/// Dock listing the open tools.
///
/// Create it with [`ToolsDock::new`]; it is built on the interface thread from a
/// locked snapshot of the tool list and then follows the tool manager.
pub struct ToolsDock {
    interface: EventLoopHandle,
    tools: Arc<ToolManager>,
    dispatcher: Arc<ActionDispatcher>,
    toolbox: Mutex<ToolBox>,
    connections: Mutex<Vec<Connection>>,
}

impl ToolsDock {
    /// Build the dock on the interface thread.
    ///
    /// Returns `None` if the interface loop has stopped.
    pub fn new(
        interface: EventLoopHandle,
        tools: Arc<ToolManager>,
        dispatcher: Arc<ActionDispatcher>,
    ) -> Option<Arc<Self>> {
        let loop_handle = interface.clone();
        loop_handle.invoke(move || Self::build(interface, tools, dispatcher))
    }

    fn build(
        interface: EventLoopHandle,
        tools: Arc<ToolManager>,
        dispatcher: Arc<ActionDispatcher>,
    ) -> Arc<Self> {
        let dock = Arc::new(Self {
            toolbox: Mutex::new(ToolBox::new(interface.thread_id())),
            interface,
            tools: Arc::clone(&tools),
            dispatcher,
            connections: Mutex::new(Vec::new()),
        });

        // Tool list changes are held off until the dock is in sync
        let guard = tools.lock_tool_list();

        let connections = vec![
            tools.connect_open_tool(Self::forward(&dock, ToolEvent::opened)),
            tools.connect_close_tool(Self::forward(&dock, ToolEvent::closed)),
            tools.connect_activate_tool(Self::forward(&dock, ToolEvent::activated)),
        ];
        *dock.connections.lock() = connections;

        for tool in tools.tool_list().values() {
            dock.open_tool(ToolWidget::for_tool(tool));
        }
        if let Some(active) = tools.active_toolid() {
            dock.activate_tool(&active);
        }

        guard.unlock();
        tracing::debug!("{} dock built with {} tools", DOCK_TITLE, dock.toolbox.lock().len());
        dock
    }

    /// Slot that turns a tool-manager notification into a ToolEvent for this dock
    fn forward(
        dock: &Arc<Self>,
        make_event: fn(&ToolHandle) -> ToolEvent,
    ) -> impl Fn(ToolHandle) + Send + Sync + 'static {
        let weak = Arc::downgrade(dock);
        let interface = dock.interface.clone();
        move |tool| Self::handle_tool_event(&interface, weak.clone(), make_event(&tool))
    }

    /// Apply `event` on the interface thread.
    ///
    /// Off the interface thread the event is posted to the interface loop and
    /// nothing else happens. Events for a dock that no longer exists are dropped.
    pub fn handle_tool_event(interface: &EventLoopHandle, dock: Weak<Self>, event: ToolEvent) {
        if !interface.is_current_thread() {
            tracing::debug!("Marshaling {:?} to the '{}' thread", event, interface.name());
            let hop = interface.clone();
            interface.post(move || Self::handle_tool_event(&hop, dock, event));
            return;
        }

        let Some(dock) = dock.upgrade() else {
            return;
        };
        match event {
            ToolEvent::Open(widget) => dock.open_tool(widget),
            ToolEvent::Close(toolid) => dock.close_tool(&toolid),
            ToolEvent::Activate(toolid) => dock.activate_tool(&toolid),
        }
    }

    fn open_tool(&self, widget: ToolWidget) {
        let mut toolbox = self.toolbox.lock();
        if toolbox.contains(&widget.toolid) {
            tracing::debug!("Widget for {} already exists", widget.toolid);
            return;
        }
        tracing::debug!("Adding widget '{}' for {}", widget.title, widget.toolid);
        toolbox.add_tool(widget);
    }

    fn close_tool(&self, toolid: &str) {
        if !self.toolbox.lock().remove_tool(toolid) {
            tracing::error!("Widget with toolid '{}' does not exist", toolid);
        }
    }

    fn activate_tool(&self, toolid: &str) {
        if !self.toolbox.lock().set_active_tool(toolid) {
            tracing::warn!("Cannot activate missing widget '{}'", toolid);
        }
    }

    /// The user selected page `index`: ask the application to activate that tool
    pub fn tool_changed(&self, index: usize) -> bool {
        let toolid = self.toolbox.lock().widget_at(index).map(|w| w.toolid.clone());
        match toolid {
            Some(toolid) => self.dispatcher.post_action(Action::activate_tool(toolid)),
            None => {
                tracing::warn!("Tool page {} does not exist", index);
                false
            }
        }
    }

    /// The user closed page `index`: ask the application to close that tool
    pub fn close_requested(&self, index: usize) -> bool {
        let toolid = self.toolbox.lock().widget_at(index).map(|w| w.toolid.clone());
        match toolid {
            Some(toolid) => self.dispatcher.post_action(Action::close_tool(toolid)),
            None => {
                tracing::warn!("Tool page {} does not exist", index);
                false
            }
        }
    }

    /// Inspect the tool box
    pub fn with_toolbox<R>(&self, f: impl FnOnce(&ToolBox) -> R) -> R {
        f(&self.toolbox.lock())
    }

    pub fn title(&self) -> &'static str {
        DOCK_TITLE
    }

    pub fn tool_manager(&self) -> &Arc<ToolManager> {
        &self.tools
    }
}

impl Drop for ToolsDock {
    fn drop(&mut self) {
        for connection in self.connections.get_mut().iter_mut() {
            connection.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;
    use crate::state::StateEngine;

    struct Harness {
        interface: EventLoop,
        application: EventLoop,
        tools: Arc<ToolManager>,
        dispatcher: Arc<ActionDispatcher>,
    }

    fn harness() -> Harness {
        let interface = EventLoop::spawn("interface").unwrap();
        let application = EventLoop::spawn("application").unwrap();
        let engine = Arc::new(StateEngine::new());
        let tools = Arc::new(ToolManager::new(&engine).unwrap());
        let dispatcher = Arc::new(ActionDispatcher::new(
            engine,
            tools.clone(),
            application.handle(),
            10,
        ));
        Harness {
            interface,
            application,
            tools,
            dispatcher,
        }
    }

    fn dock(h: &Harness) -> Arc<ToolsDock> {
        ToolsDock::new(h.interface.handle(), h.tools.clone(), h.dispatcher.clone()).unwrap()
    }

    #[test]
    fn test_dock_built_from_open_tools() {
        let h = harness();
        h.tools.open_tool(ToolKind::MaskDataFilter).unwrap();
        h.tools.open_tool(ToolKind::PaintTool).unwrap();

        let dock = dock(&h);
        dock.with_toolbox(|toolbox| {
            assert_eq!(toolbox.len(), 2);
            assert_eq!(toolbox.widget_at(0).map(|w| w.title.as_str()), Some("Mask Data 0"));
            assert_eq!(toolbox.active_toolid(), Some("PaintTool0"));
            assert_eq!(toolbox.current_index(), Some(1));
            assert_eq!(
                toolbox.widget("PaintTool0").map(|w| w.state_ids.len()),
                Some(4)
            );
        });
    }

    #[test]
    fn test_changes_follow_tool_manager() {
        let h = harness();
        let dock = dock(&h);

        let id = h.tools.open_tool(ToolKind::PaintTool).unwrap();
        assert!(h.interface.handle().flush());
        assert_eq!(dock.with_toolbox(|t| t.active_toolid().map(str::to_string)), Some(id.clone()));

        h.tools.close_tool(&id).unwrap();
        assert!(h.interface.handle().flush());
        dock.with_toolbox(|toolbox| {
            assert!(toolbox.is_empty());
            assert_eq!(toolbox.active_toolid(), None);
        });
    }

    #[test]
    fn test_tool_changed_posts_activation() {
        let h = harness();
        h.tools.open_tool(ToolKind::MaskDataFilter).unwrap();
        h.tools.open_tool(ToolKind::PaintTool).unwrap();
        let dock = dock(&h);

        assert!(dock.tool_changed(0));
        assert!(!dock.tool_changed(5));
        assert!(h.application.handle().flush());
        assert!(h.interface.handle().flush());

        assert_eq!(h.tools.active_toolid().as_deref(), Some("MaskDataFilter0"));
        assert_eq!(dock.with_toolbox(|t| t.current_index()), Some(0));
    }

    #[test]
    fn test_close_requested_posts_close() {
        let h = harness();
        h.tools.open_tool(ToolKind::PaintTool).unwrap();
        let dock = dock(&h);

        assert!(dock.close_requested(0));
        assert!(h.application.handle().flush());
        assert!(h.interface.handle().flush());
        assert_eq!(h.tools.num_tools(), 0);
        assert!(dock.with_toolbox(|t| t.is_empty()));
    }

    #[test]
    fn test_dropped_dock_disconnects() {
        let h = harness();
        let dock = dock(&h);
        drop(dock);

        // Nothing left to notify, and nothing panics
        h.tools.open_tool(ToolKind::PaintTool).unwrap();
        assert!(h.interface.handle().flush());
    }
}
