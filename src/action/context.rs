use parking_lot::Mutex;

/// Where an action came from. Actions replayed from the undo buffer must not
/// record new undo entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSource {
    Interface,
    Script,
    Application,
    UndoBuffer,
}

/// Channel through which an action reports back to whoever issued it
#[cfg_attr(test, mockall::automock)]
pub trait ActionContext: Send + Sync {
    /// Report why an action was rejected or failed
    fn report_error(&self, error: &str);

    /// Report an informational message
    fn report_message(&self, message: &str);

    fn source(&self) -> ActionSource;
}

/// True unless the action is being replayed by the undo buffer
pub fn need_undo(context: &dyn ActionContext) -> bool {
    context.source() != ActionSource::UndoBuffer
}

/// Context that logs every report and keeps a copy for later inspection
#[derive(Debug)]
pub struct DefaultActionContext {
    source: ActionSource,
    errors: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

impl DefaultActionContext {
    pub fn new(source: ActionSource) -> Self {
        Self {
            source,
            errors: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.errors.lock().last().cloned()
    }
}

impl Default for DefaultActionContext {
    fn default() -> Self {
        Self::new(ActionSource::Interface)
    }
}

impl ActionContext for DefaultActionContext {
    fn report_error(&self, error: &str) {
        tracing::warn!("Action error ({:?}): {}", self.source, error);
        self.errors.lock().push(error.to_string());
    }

    fn report_message(&self, message: &str) {
        tracing::info!("{}", message);
        self.messages.lock().push(message.to_string());
    }

    fn source(&self) -> ActionSource {
        self.source
    }
}

/// Wraps the caller's context while the undo buffer replays an action; reports
/// go to the caller, the source reads as [`ActionSource::UndoBuffer`]
pub(crate) struct UndoReplayContext<'a> {
    inner: &'a dyn ActionContext,
}

impl<'a> UndoReplayContext<'a> {
    pub(crate) fn new(inner: &'a dyn ActionContext) -> Self {
        Self { inner }
    }
}

impl ActionContext for UndoReplayContext<'_> {
    fn report_error(&self, error: &str) {
        self.inner.report_error(error);
    }

    fn report_message(&self, message: &str) {
        self.inner.report_message(message);
    }

    fn source(&self) -> ActionSource {
        ActionSource::UndoBuffer
    }
}
