//! Controller Handle - wires the remapper together and runs it
//!
//! Builds the shared input state, the virtual mouse, the lighting controller
//! and the dispatcher from one [`AppConfig`], then drives the three loops
//! concurrently:
//!
//! ```text
//!                 ┌──► GamepadDispatcher::run ──┐
//! CancellationToken ─► VirtualMouse::run ────────┼──► first error / cancel stops all
//!                 └──► RgbLighting::run ────────┘
//! ```
//!
//! The loops succeed or fail as a unit: when one returns an error the others
//! are dropped and the token is cancelled, so nothing keeps running half-way.

use crate::config::AppConfig;
use crate::controller::dispatcher::{DispatchError, Dispatching, GamepadDispatcher};
use crate::controller::input_state::InputState;
use crate::device::{DeviceControl, EventSource, OutputSink};
use crate::mapping::{LightingControl, MappingError, RgbLighting, VirtualMouse};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Dispatcher error: {0}")]
    DispatchError(#[from] DispatchError),

    #[error("Virtual mouse error: {0}")]
    MouseError(#[source] MappingError),

    #[error("Lighting error: {0}")]
    LightingError(#[source] MappingError),
}

pub struct ControllerHandle {
    source: Box<dyn EventSource>,
    dispatcher: GamepadDispatcher<Dispatching>,
    mouse: Arc<VirtualMouse>,
    lighting: Arc<RgbLighting>,
}

impl ControllerHandle {
    pub fn new(
        config: &AppConfig,
        source: Box<dyn EventSource>,
        sink: Box<dyn OutputSink>,
        control: Arc<dyn DeviceControl>,
    ) -> Self {
        info!("Initializing controller");
        let input_state = Arc::new(InputState::new());

        let mouse = Arc::new(VirtualMouse::new(
            sink,
            input_state.clone(),
            &config.remap,
            control.clone(),
            config.mouse.clone(),
        ));
        let lighting = Arc::new(RgbLighting::new(control, config.lighting.clone()));

        let dispatcher = GamepadDispatcher::create(
            input_state,
            mouse.clone(),
            lighting.clone(),
            config.remap.clone(),
            config.dispatcher.clone(),
        )
        .start();

        Self {
            source,
            dispatcher,
            mouse,
            lighting,
        }
    }

    /// Paint the initial lighting, then run all loops until cancel or failure
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ControllerError> {
        let Self {
            source,
            dispatcher,
            mouse,
            lighting,
        } = self;

        lighting
            .time_of_day()
            .map_err(ControllerError::LightingError)?;

        info!("Controller running");
        let result = tokio::try_join!(
            async {
                dispatcher
                    .run(source, cancel.clone())
                    .await
                    .map_err(ControllerError::from)
            },
            async {
                mouse
                    .run(cancel.clone())
                    .await
                    .map_err(ControllerError::MouseError)
            },
            async {
                lighting
                    .run(cancel.clone())
                    .await
                    .map_err(ControllerError::LightingError)
            },
        );

        cancel.cancel();
        match result {
            Ok(_) => {
                info!("Controller stopped");
                Ok(())
            }
            Err(e) => {
                error!("Controller stopped on error: {}", e);
                Err(e)
            }
        }
    }
}
