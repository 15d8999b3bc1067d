//! Device layer - seams to the hardware the remapper talks to
//!
//! Three collaborators sit behind traits so the remapping core never touches a
//! device node directly:
//!
//! ```text
//! Gamepad (evdev) ──► EventSource ──► Dispatcher ──► OutputSink (uinput mouse)
//!                                         │
//!                                         └──────► DeviceControl (hidraw)
//! ```
//!
//! The Linux implementations live in [`evdev_device`] and [`hid_control`].

pub mod codes;
pub mod evdev_device;
pub mod hid_control;

use async_trait::async_trait;

pub use codes::{ChannelKind, RawEvent};

/// Colour of a single key, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Half of the keyboard matrix addressed by one lighting payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowBand {
    Upper,
    Lower,
}

/// Errors raised by device adapters
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("Failed to open device {path}: {reason}")]
    OpenError { path: String, reason: String },

    #[error("Device lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Ordered, blocking stream of events from the physical gamepad
///
/// `Ok(None)` means the device went away; the stream cannot be restarted.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Result<Option<RawEvent>, DeviceError>;
}

/// Virtual output device
///
/// `write` stages a single event; `sync` closes the current frame so the
/// host sees all staged changes together.
pub trait OutputSink: Send {
    fn write(&mut self, kind: ChannelKind, code: u16, value: i32) -> Result<(), DeviceError>;

    fn sync(&mut self) -> Result<(), DeviceError>;
}

/// Control channel of the physical device (profiles and lighting)
pub trait DeviceControl: Send + Sync {
    /// Return the device to its default profile
    fn reset_profile(&self) -> Result<(), DeviceError>;

    /// Paint three rows of one band with the given per-column colours
    fn send_rows(&self, band: RowBand, rows: &[Vec<Rgb>; 3]) -> Result<(), DeviceError>;
}
