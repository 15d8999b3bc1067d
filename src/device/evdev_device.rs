//! evdev/uinput adapters for the physical gamepad and the virtual mouse

use super::{ChannelKind, DeviceError, EventSource, OutputSink, RawEvent};
use crate::config::Capabilities;
use async_trait::async_trait;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, Device, EventStream, EventType, InputEvent, Key, RelativeAxisType};
use std::path::Path;
use tracing::{debug, info, warn};

// errno reported by reads on a node whose device was unplugged
const ENODEV: i32 = 19;

/// Event stream of the physical gamepad
pub struct GamepadEvents {
    stream: EventStream,
}

impl GamepadEvents {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let device = Device::open(path).map_err(|e| DeviceError::OpenError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(
            "Opened gamepad {} at {}",
            device.name().unwrap_or("<unnamed>"),
            path.display()
        );

        let stream = device.into_event_stream()?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl EventSource for GamepadEvents {
    async fn next_event(&mut self) -> Result<Option<RawEvent>, DeviceError> {
        loop {
            let event = match self.stream.next_event().await {
                Ok(event) => event,
                Err(e) if e.raw_os_error() == Some(ENODEV) => {
                    warn!("Gamepad disconnected");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            match ChannelKind::from_raw(event.event_type().0) {
                Some(kind) => return Ok(Some(RawEvent::new(kind, event.code(), event.value()))),
                None => debug!("Skipping untracked event type {:?}", event.event_type()),
            }
        }
    }
}

/// uinput mouse/keyboard that receives the remapped output
///
/// Writes are staged and flushed by [`OutputSink::sync`], which lets the kernel
/// see a whole tick as one frame. Only the mouse tick syncs, so key writes made
/// while the pointer is parked (releases, negative axis buttons) pile up here
/// and reach the host together on the first tick after the next enable.
pub struct VirtualMouseDevice {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl VirtualMouseDevice {
    pub fn create(name: &str, capabilities: &Capabilities) -> Result<Self, DeviceError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in &capabilities.keys {
            keys.insert(Key::new(*code));
        }

        let mut relative_axes = AttributeSet::<RelativeAxisType>::new();
        for code in &capabilities.relative_axes {
            relative_axes.insert(RelativeAxisType(*code));
        }

        let device = VirtualDeviceBuilder::new()?
            .name(name)
            .with_keys(&keys)?
            .with_relative_axes(&relative_axes)?
            .build()?;

        info!(
            "Created virtual device '{}' with {} keys and {} relative axes",
            name,
            capabilities.keys.len(),
            capabilities.relative_axes.len()
        );

        Ok(Self {
            device,
            pending: Vec::new(),
        })
    }
}

impl OutputSink for VirtualMouseDevice {
    fn write(&mut self, kind: ChannelKind, code: u16, value: i32) -> Result<(), DeviceError> {
        self.pending
            .push(InputEvent::new(EventType(kind.raw()), code, value));
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DeviceError> {
        // emit() appends the SYN_REPORT itself
        let events = std::mem::take(&mut self.pending);
        self.device.emit(&events)?;
        Ok(())
    }
}
