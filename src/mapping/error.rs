//! Errors of the output side (virtual mouse and lighting)

use crate::device::DeviceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// Writing to the virtual mouse failed
    #[error("Virtual mouse error: {0}")]
    OutputError(#[source] DeviceError),

    /// The control channel rejected a profile or lighting command
    #[error("Device control error: {0}")]
    ControlError(#[source] DeviceError),

    /// Internal state could not be accessed
    #[error("State error: {0}")]
    StateError(String),
}
