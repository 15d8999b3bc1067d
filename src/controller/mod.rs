//! Controller subsystem - gamepad input handling
//!
//! 1. [`input_state`] - last known value of every gamepad input
//! 2. [`dispatcher`] - consumes gamepad events and drives the outputs
//! 3. [`controller_handle`] - runs dispatcher, mouse and lighting as one unit
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Dispatcher ──► InputState ──► VirtualMouse tick loop
//!                 │
//!                 ├─────────► VirtualMouse (enable/disable/write)
//!                 └─────────► RgbLighting (mouse/time_of_day)
//! ```

pub mod controller_handle;
pub mod dispatcher;
pub mod input_state;

pub use controller_handle::{ControllerError, ControllerHandle};
pub use dispatcher::GamepadDispatcher;
pub use input_state::InputState;
