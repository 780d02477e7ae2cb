// Interface module
//
// Headless widget models. Everything here is changed on the interface thread only.

pub mod tools_dock;

pub use tools_dock::{DOCK_TITLE, ToolBox, ToolEvent, ToolWidget, ToolsDock};
