//! Output side of the remapper
//!
//! - [`mouse`] - virtual pointer emitter fed from the shared input state
//! - [`lighting`] - time-of-day keyboard lighting, suppressed in mouse mode
//! - [`color`] - palette math used by the lighting controller

pub mod color;
pub mod error;
pub mod lighting;
pub mod mouse;

pub use error::MappingError;
pub use lighting::{LightingControl, LightingMode, RgbLighting};
pub use mouse::{PointerControl, PointerState, VirtualMouse};
