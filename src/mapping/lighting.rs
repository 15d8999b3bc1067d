//! Ambient keyboard lighting
//!
//! Repaints the time-of-day palette on a slow timer. Pointer activity
//! suppresses the repaint so the lighting set by the active profile stays
//! visible; an explicit [`LightingControl::time_of_day`] paints at once and
//! lets the timer repaint again.
//!
//! # State Machine
//!
//! ```text
//!              mouse()
//! TimeOfDay ───────────► Suppressed
//!     ▲                      │
//!     └──────────────────────┘
//!          time_of_day()
//! ```

use crate::config::LightingSettings;
use crate::device::{DeviceControl, RowBand};
use crate::mapping::color;
use crate::mapping::MappingError;
use chrono::{Local, Timelike};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Operations the dispatcher drives on the lighting controller
pub trait LightingControl: Send + Sync {
    /// Paint the palette for the current time and re-arm the timer
    fn time_of_day(&self) -> Result<(), MappingError>;

    /// Pointer mode: stop timer repaints until the next `time_of_day`
    fn mouse(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingMode {
    TimeOfDay,
    Suppressed,
}

pub struct RgbLighting {
    control: Arc<dyn DeviceControl>,
    mode_tx: watch::Sender<LightingMode>,
    settings: LightingSettings,
}

impl RgbLighting {
    pub fn new(control: Arc<dyn DeviceControl>, settings: LightingSettings) -> Self {
        let (mode_tx, _) = watch::channel(LightingMode::TimeOfDay);
        Self {
            control,
            mode_tx,
            settings,
        }
    }

    pub fn mode(&self) -> LightingMode {
        *self.mode_tx.borrow()
    }

    /// Paint the palette for an explicit wall-clock time
    pub fn paint(&self, hour: u32, minute: u32) -> Result<(), MappingError> {
        let row = color::time_of_day_row(hour, minute);
        let rows = [row.clone(), row.clone(), row];

        for band in [RowBand::Upper, RowBand::Lower] {
            self.control
                .send_rows(band, &rows)
                .map_err(MappingError::ControlError)?;
        }
        debug!("Painted time-of-day palette for {:02}:{:02}", hour, minute);
        Ok(())
    }

    /// Timer loop, runs until cancelled or the device rejects a payload
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MappingError> {
        info!(
            "Starting lighting loop (repaint every {:?})",
            self.settings.repaint_interval
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.repaint_interval) => {}
            }

            match self.mode() {
                LightingMode::TimeOfDay => self.time_of_day()?,
                LightingMode::Suppressed => debug!("Repaint suppressed in mouse mode"),
            }
        }

        info!("Lighting loop stopped");
        Ok(())
    }
}

impl LightingControl for RgbLighting {
    fn time_of_day(&self) -> Result<(), MappingError> {
        self.mode_tx.send_replace(LightingMode::TimeOfDay);
        let now = Local::now();
        self.paint(now.hour(), now.minute())
    }

    fn mouse(&self) {
        let previous = self.mode_tx.send_replace(LightingMode::Suppressed);
        if previous != LightingMode::Suppressed {
            info!("Lighting suppressed for mouse mode");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::mouse::tests::CountingControl;
    use std::time::Duration;

    fn lighting() -> (Arc<RgbLighting>, Arc<CountingControl>) {
        let control = Arc::new(CountingControl::default());
        let lighting = Arc::new(RgbLighting::new(
            control.clone(),
            LightingSettings::default(),
        ));
        (lighting, control)
    }

    fn payloads(control: &CountingControl) -> usize {
        control.row_payloads.lock().unwrap().len()
    }

    #[test]
    fn test_paint_sends_upper_and_lower_rows() {
        let (lighting, control) = lighting();
        lighting.paint(6, 0).unwrap();

        let sent = control.row_payloads.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, RowBand::Upper);
        assert_eq!(sent[1].0, RowBand::Lower);
        let (_, rows) = &sent[0];
        assert_eq!(rows[0].len(), color::COLUMNS);
        assert_eq!(rows[0], rows[1]);
        assert_eq!(rows[1], rows[2]);
    }

    #[test]
    fn test_time_of_day_clears_suppression() {
        let (lighting, control) = lighting();

        lighting.mouse();
        assert_eq!(lighting.mode(), LightingMode::Suppressed);
        // mouse() never touches the device
        assert_eq!(payloads(&control), 0);

        lighting.time_of_day().unwrap();
        assert_eq!(lighting.mode(), LightingMode::TimeOfDay);
        assert_eq!(payloads(&control), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_repaints_unless_suppressed() {
        let (lighting, control) = lighting();
        let cancel = CancellationToken::new();
        let task = {
            let lighting = lighting.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { lighting.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(payloads(&control), 2);

        lighting.mouse();
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(payloads(&control), 2);

        // explicit repaint lifts the suppression
        lighting.time_of_day().unwrap();
        assert_eq!(payloads(&control), 4);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(payloads(&control), 6);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }
}
