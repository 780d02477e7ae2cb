use super::ToolError;
use crate::state::{StateEngine, StateError, StateHandle, StateHandler, StateValue};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared handle to an open tool
pub type ToolHandle = Arc<Tool>;

/// Static description of a tool type, as shown in menus and tool boxes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub menu_label: &'static str,
    pub menu: &'static str,
    pub shortcut_key: &'static str,
    pub url: &'static str,
}

const MASK_DATA_FILTER_INFO: ToolInfo = ToolInfo {
    name: "MaskDataFilter",
    description: "Cut a masked region out of a data layer",
    menu_label: "Mask Data",
    menu: "Filters",
    shortcut_key: "Alt+J",
    url: "http://seg3d.org/",
};

const PAINT_TOOL_INFO: ToolInfo = ToolInfo {
    name: "PaintTool",
    description: "Paint on a mask layer",
    menu_label: "Paint Brush",
    menu: "Tools",
    shortcut_key: "Alt+P",
    url: "http://seg3d.org/",
};

/// Options of the MaskDataFilter `replace_with` state
pub const REPLACE_WITH_OPTIONS: [&str; 3] = ["zero", "max_value", "min_value"];

/// Default radius of the paint brush, in voxels
pub const DEFAULT_BRUSH_RADIUS: i64 = 23;

/// Every tool type the application can instantiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    MaskDataFilter,
    PaintTool,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::MaskDataFilter, ToolKind::PaintTool];

    pub fn info(&self) -> &'static ToolInfo {
        match self {
            ToolKind::MaskDataFilter => &MASK_DATA_FILTER_INFO,
            ToolKind::PaintTool => &PAINT_TOOL_INFO,
        }
    }

    /// Prefix of the tool ids of this type
    pub fn type_name(&self) -> &'static str {
        self.info().name
    }

    fn install_states(&self, handler: &StateHandler) -> Result<(), StateError> {
        match self {
            ToolKind::MaskDataFilter => {
                handler.add_state("target_layer", StateValue::String(String::new()))?;
                handler.add_state("mask_layer", StateValue::String(String::new()))?;
                handler.add_option_state("replace_with", "zero", &REPLACE_WITH_OPTIONS)?;
                handler.add_state("replace", StateValue::Bool(false))?;
            }
            ToolKind::PaintTool => {
                handler.add_state("target_layer", StateValue::String(String::new()))?;
                handler.add_state("mask_constraint_layer", StateValue::String(String::new()))?;
                handler.add_state("brush_radius", StateValue::Int(DEFAULT_BRUSH_RADIUS))?;
                handler.add_state("erase", StateValue::Bool(false))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.type_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ToolError::UnknownToolType(s.to_string()))
    }
}

/// One interactive mode, e.g. a filter panel or a paint brush.
///
/// A tool is a [`StateHandler`] registered as `<TypeName><sequence>`; its states
/// configure the tool and are addressable as `<toolid>::<state>`.
pub struct Tool {
    kind: ToolKind,
    handler: StateHandler,
    toolid_number: usize,
    active: AtomicBool,
}

impl Tool {
    /// Create a tool and register its states
    pub fn new(engine: &Arc<StateEngine>, kind: ToolKind) -> Result<Self, ToolError> {
        let handler = StateHandler::new(engine, kind.type_name(), true)?;
        kind.install_states(&handler)?;

        let toolid_number = handler
            .handler_id()
            .strip_prefix(kind.type_name())
            .and_then(|n| n.parse().ok())
            .unwrap_or_default();

        Ok(Self {
            kind,
            handler,
            toolid_number,
            active: AtomicBool::new(false),
        })
    }

    pub fn toolid(&self) -> &str {
        self.handler.handler_id()
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Sequence number part of the tool id
    pub fn toolid_number(&self) -> usize {
        self.toolid_number
    }

    pub fn menu_name(&self) -> &'static str {
        self.kind.info().menu_label
    }

    pub fn state(&self, name: &str) -> Option<StateHandle> {
        self.handler.state(name)
    }

    pub fn handler(&self) -> &StateHandler {
        &self.handler
    }

    /// Called by the tool manager when the tool becomes the active tool
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
        tracing::debug!("Tool {} activated", self.toolid());
    }

    /// Called by the tool manager when another tool takes over, or on close
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        tracing::debug!("Tool {} deactivated", self.toolid());
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("toolid", &self.toolid())
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}
