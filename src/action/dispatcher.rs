// ActionDispatcher - serializes actions and owns the undo history
//
// dispatch() validates and runs an action while holding the undo-buffer mutex, so
// actions from different threads never interleave. post_action() queues a dispatch
// onto the application thread.

use super::context::UndoReplayContext;
use super::{Action, ActionContext, ActionEnv, ActionSource, DefaultActionContext, UndoBuffer};
use crate::event_loop::EventLoopHandle;
use crate::metrics::Metrics;
use crate::state::StateEngine;
use crate::tools::ToolManager;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct ActionDispatcher {
    engine: Arc<StateEngine>,
    tools: Arc<ToolManager>,
    application: EventLoopHandle,
    undo: Mutex<UndoBuffer>,
    metrics: Metrics,
}

impl ActionDispatcher {
    pub fn new(
        engine: Arc<StateEngine>,
        tools: Arc<ToolManager>,
        application: EventLoopHandle,
        undo_depth: usize,
    ) -> Self {
        Self {
            engine,
            tools,
            application,
            undo: Mutex::new(UndoBuffer::new(undo_depth)),
            metrics: Metrics::new(),
        }
    }

    /// Validate and run `action`.
    ///
    /// Must not be called from a tool-manager or state notification callback:
    /// those run while an action is executing and the undo mutex is held.
    pub fn dispatch(&self, action: &Action, context: &dyn ActionContext) -> bool {
        let mut buffer = self.undo.lock();
        let mut env = ActionEnv {
            engine: &self.engine,
            tools: &self.tools,
            undo: &mut buffer,
        };

        tracing::debug!("Dispatching {} ({:?})", action, context.source());
        if !action.validate(&env, context) {
            tracing::warn!("Rejected action: {}", action);
            self.metrics.record_rejected();
            return false;
        }

        if action.run(&mut env, context) {
            self.metrics.record_dispatched();
            true
        } else {
            tracing::warn!("Action failed: {}", action);
            self.metrics.record_rejected();
            false
        }
    }

    /// Queue `action` for dispatch on the application thread. Reports are logged.
    pub fn post_action(self: &Arc<Self>, action: Action) -> bool {
        self.post_action_with_context(
            action,
            Arc::new(DefaultActionContext::new(ActionSource::Application)),
        )
    }

    /// Queue `action` for dispatch on the application thread, reporting to `context`
    pub fn post_action_with_context(
        self: &Arc<Self>,
        action: Action,
        context: Arc<dyn ActionContext>,
    ) -> bool {
        let dispatcher = Arc::clone(self);
        tracing::debug!("Posting {} to '{}'", action, self.application.name());

        let posted = self.application.post(move || {
            dispatcher.dispatch(&action, context.as_ref());
        });
        if posted {
            self.metrics.record_posted();
        }
        posted
    }

    /// Revert the newest undo entry.
    ///
    /// An entry whose inverse no longer validates (for example because the tool
    /// it refers to was closed) is discarded and the error reported.
    pub fn undo(&self, context: &dyn ActionContext) -> bool {
        let mut buffer = self.undo.lock();
        let Some(entry) = buffer.pop_undo() else {
            context.report_message("Nothing to undo");
            return false;
        };

        let replay = UndoReplayContext::new(context);
        let mut env = ActionEnv {
            engine: &self.engine,
            tools: &self.tools,
            undo: &mut buffer,
        };

        if !entry.undo.validate(&env, &replay) || !entry.undo.run(&mut env, &replay) {
            tracing::error!("Discarding undo entry '{}': {}", entry.tag, entry.undo);
            return false;
        }

        tracing::debug!("Undid '{}'", entry.tag);
        buffer.push_redo(entry);
        self.metrics.record_undone();
        true
    }

    /// Replay the most recently undone entry
    pub fn redo(&self, context: &dyn ActionContext) -> bool {
        let mut buffer = self.undo.lock();
        let Some(entry) = buffer.pop_redo() else {
            context.report_message("Nothing to redo");
            return false;
        };

        let replay = UndoReplayContext::new(context);
        let mut env = ActionEnv {
            engine: &self.engine,
            tools: &self.tools,
            undo: &mut buffer,
        };

        if !entry.redo.validate(&env, &replay) || !entry.redo.run(&mut env, &replay) {
            tracing::error!("Discarding redo entry '{}': {}", entry.tag, entry.redo);
            return false;
        }

        tracing::debug!("Redid '{}'", entry.tag);
        buffer.push_redone(entry);
        self.metrics.record_redone();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.undo.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.lock().can_redo()
    }

    pub fn undo_tag(&self) -> Option<String> {
        self.undo.lock().undo_tag().map(str::to_string)
    }

    pub fn redo_tag(&self) -> Option<String> {
        self.undo.lock().redo_tag().map(str::to_string)
    }

    pub fn undo_count(&self) -> usize {
        self.undo.lock().undo_count()
    }

    pub fn clear_undo_history(&self) {
        self.undo.lock().clear();
    }

    pub fn engine(&self) -> &Arc<StateEngine> {
        &self.engine
    }

    pub fn tool_manager(&self) -> &Arc<ToolManager> {
        &self.tools
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
