//! Gamepad event dispatcher
//!
//! Single consumer of the gamepad event stream and the only writer of the
//! shared [`InputState`]. For every event it
//!
//! 1. wakes the pointer and suppresses lighting if the value is positive,
//! 2. records the value,
//! 3. applies at most one remap rule: key pass-through, the disable button,
//!    or an axis driving a pair of buttons.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Dispatching
//! ```

use crate::config::{DispatcherSettings, RemapConfig};
use crate::controller::input_state::InputState;
use crate::device::{ChannelKind, DeviceError, EventSource, RawEvent};
use crate::mapping::{LightingControl, MappingError, PointerControl};
use statum::{machine, state};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Gamepad disconnected")]
    Disconnected,

    #[error("Failed to read gamepad event: {0}")]
    SourceError(#[from] DeviceError),

    #[error("Failed to drive output: {0}")]
    OutputError(#[from] MappingError),
}

#[state]
#[derive(Debug, Clone)]
pub enum DispatchState {
    Initializing,
    Dispatching,
}

#[machine]
pub struct GamepadDispatcher<S: DispatchState> {
    input_state: Arc<InputState>,
    pointer: Arc<dyn PointerControl>,
    lighting: Arc<dyn LightingControl>,
    remap: RemapConfig,
    settings: DispatcherSettings,

    // Held flag for every button produced by an axis
    pressed_axis_buttons: BTreeMap<u16, bool>,
}

impl GamepadDispatcher<Initializing> {
    pub fn create(
        input_state: Arc<InputState>,
        pointer: Arc<dyn PointerControl>,
        lighting: Arc<dyn LightingControl>,
        remap: RemapConfig,
        settings: DispatcherSettings,
    ) -> Self {
        debug!("Creating gamepad dispatcher with settings: {:?}", settings);
        Self::new(
            input_state,
            pointer,
            lighting,
            remap,
            settings,
            BTreeMap::new(),
        )
    }

    /// Reset held flags for every axis button and start dispatching
    pub fn start(mut self) -> GamepadDispatcher<Dispatching> {
        self.pressed_axis_buttons = self
            .remap
            .axis_button_map
            .values()
            .flat_map(|(negative, positive)| [(*negative, false), (*positive, false)])
            .collect();

        info!(
            "Dispatcher ready: {} key mappings, {} axis button pairs, disable button {}",
            self.remap.key_map.len(),
            self.remap.axis_button_map.len(),
            self.remap.disable_button
        );
        self.transition()
    }
}

impl GamepadDispatcher<Dispatching> {
    pub fn is_held(&self, button: u16) -> bool {
        self.pressed_axis_buttons
            .get(&button)
            .copied()
            .unwrap_or(false)
    }

    /// Apply one gamepad event
    pub async fn handle_event(&mut self, event: RawEvent) -> Result<(), DispatchError> {
        let RawEvent { kind, code, value } = event;

        // Any activity wakes the pointer, before the remap rules run
        if value > 0 {
            self.pointer.enable();
            self.lighting.mouse();
        }

        self.input_state.record(kind, code, value);

        match kind {
            ChannelKind::Key => {
                if let Some(&target) = self.remap.key_map.get(&code) {
                    self.pointer.write(ChannelKind::Key, target, value)?;
                } else if code == self.remap.disable_button && value > 0 {
                    info!("Disable button pressed");
                    self.pointer.disable()?;
                    // let events already in flight drain before lighting returns
                    tokio::time::sleep(self.settings.disable_pause).await;
                    self.lighting.time_of_day()?;
                }
            }
            ChannelKind::Absolute => {
                if let Some(&(negative, positive)) = self.remap.axis_button_map.get(&code) {
                    self.axis_buttons(negative, positive, value)?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn axis_buttons(&mut self, negative: u16, positive: u16, value: i32) -> Result<(), DispatchError> {
        if value == 0 {
            // Back at rest: release whichever side is still held
            for button in [negative, positive] {
                if self.is_held(button) {
                    self.pointer.write(ChannelKind::Key, button, 0)?;
                    self.pressed_axis_buttons.insert(button, false);
                }
            }
            return Ok(());
        }

        // A direct sign flip does not release the opposite side; it stays
        // flagged until the axis returns to 0.
        let button = if value > 0 { positive } else { negative };
        self.pointer.write(ChannelKind::Key, button, 1)?;
        self.pressed_axis_buttons.insert(button, true);
        Ok(())
    }

    /// Consume the gamepad until cancellation or disconnect
    pub async fn run(
        mut self,
        mut source: Box<dyn EventSource>,
        cancel: CancellationToken,
    ) -> Result<(), DispatchError> {
        info!("Starting gamepad dispatch loop");

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = source.next_event() => event?,
            };

            match event {
                Some(event) => {
                    debug!("Gamepad event: {}", event);
                    self.handle_event(event).await?;
                }
                None => {
                    error!("Gamepad event stream ended");
                    return Err(DispatchError::Disconnected);
                }
            }
        }

        info!("Dispatch loop stopped");
        Ok(())
    }
}
