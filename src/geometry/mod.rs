//! Geometry value types that travel through the state system.
//!
//! Only the pieces the action/state core persists are modelled here: a plain
//! 4x4 [`Transform`] and the [`GridTransform`] that pairs it with a grid size.

pub mod grid_transform;
pub mod transform;

pub use grid_transform::{GridTransform, TransformParseError};
pub use transform::Transform;
