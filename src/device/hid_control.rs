//! Control channel of the Wooting keyboard over hidraw
//!
//! The keyboard accepts two kinds of vendor messages: 8-byte feature reports
//! carrying a command and four parameter bytes, and larger output buffers used
//! for raw colour data. Both start with the `0xD0 0xDA` magic.

use super::{DeviceControl, DeviceError, Rgb, RowBand};
use hidapi::{HidApi, HidDevice};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const MAGIC: [u8; 2] = [0xD0, 0xDA];
const FEATURE_REPORT_ID: u8 = 0x01;
const BUFFER_REPORT_ID: u8 = 0x00;
const BUFFER_LEN: usize = 257;

const CMD_ACTIVATE_PROFILE: u8 = 23;
const REPORT_UPPER_ROWS_RGB: u8 = 0x0B;
const REPORT_LOWER_ROWS_RGB: u8 = 0x0C;

/// Feature report for a command with a big-endian 32-bit parameter
pub fn feature_report(command: u8, parameter: u32) -> [u8; 8] {
    let p = parameter.to_be_bytes();
    [FEATURE_REPORT_ID, MAGIC[0], MAGIC[1], command, p[0], p[1], p[2], p[3]]
}

/// Colour buffer for one band: header followed by row-major RGB triplets
pub fn rows_report(band: RowBand, rows: &[Vec<Rgb>; 3]) -> Vec<u8> {
    let code = match band {
        RowBand::Upper => REPORT_UPPER_ROWS_RGB,
        RowBand::Lower => REPORT_LOWER_ROWS_RGB,
    };

    let mut buffer = Vec::with_capacity(BUFFER_LEN);
    buffer.extend_from_slice(&[BUFFER_REPORT_ID, MAGIC[0], MAGIC[1], code]);
    for color in rows.iter().flatten() {
        if buffer.len() + 3 > BUFFER_LEN {
            break;
        }
        buffer.extend_from_slice(&[color.r, color.g, color.b]);
    }
    buffer.resize(BUFFER_LEN, 0);
    buffer
}

pub struct WootingControl {
    device: Mutex<HidDevice>,
}

impl WootingControl {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let api = HidApi::new()?;
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| {
            DeviceError::OpenError {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        let device = api.open_path(&c_path)?;
        info!("Opened control channel at {}", path.display());

        Ok(Self {
            device: Mutex::new(device),
        })
    }

    fn with_device<T>(
        &self,
        f: impl FnOnce(&HidDevice) -> Result<T, hidapi::HidError>,
    ) -> Result<T, DeviceError> {
        let device = self
            .device
            .lock()
            .map_err(|e| DeviceError::LockPoisoned(e.to_string()))?;
        Ok(f(&*device)?)
    }
}

impl DeviceControl for WootingControl {
    fn reset_profile(&self) -> Result<(), DeviceError> {
        debug!("Activating default profile");
        let report = feature_report(CMD_ACTIVATE_PROFILE, 0);
        self.with_device(|device| device.send_feature_report(&report))
    }

    fn send_rows(&self, band: RowBand, rows: &[Vec<Rgb>; 3]) -> Result<(), DeviceError> {
        let report = rows_report(band, rows);
        let written = self.with_device(|device| device.write(&report))?;
        debug!("Sent {:?} rows ({} bytes)", band, written);
        Ok(())
    }
}
