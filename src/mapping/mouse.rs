//! Virtual pointer emitter
//!
//! Turns stick positions into relative pointer motion. While enabled, the tick
//! loop samples every mapped absolute axis each interval, passes it through a
//! tangent response curve and emits one frame of relative events. While
//! disabled, the loop parks on a watch channel and wakes as soon as
//! [`PointerControl::enable`] flips the state.
//!
//! # State Machine
//!
//! ```text
//!            enable()
//! Disabled ───────────► Enabled
//!     ▲                    │
//!     └────────────────────┘
//!       disable() (+ profile reset)
//! ```

use crate::config::{MouseSettings, RemapConfig};
use crate::controller::input_state::InputState;
use crate::device::{ChannelKind, DeviceControl, OutputSink, RawEvent};
use crate::mapping::MappingError;
use std::f64::consts::FRAC_PI_2;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Operations the dispatcher drives on the pointer emitter
pub trait PointerControl: Send + Sync {
    /// Resume pointer emission; no-op when already enabled
    fn enable(&self);

    /// Stop pointer emission and reset the physical device profile
    fn disable(&self) -> Result<(), MappingError>;

    /// Emit one event straight to the virtual device, regardless of state
    fn write(&self, kind: ChannelKind, code: u16, value: i32) -> Result<(), MappingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerState {
    Disabled,
    Enabled,
}

impl PointerState {
    pub fn is_enabled(self) -> bool {
        self == PointerState::Enabled
    }
}

/// Stick value to pointer delta
///
/// Close to linear around the centre, steep towards `saturation`. Odd in
/// `value`, so both stick directions respond identically.
pub fn pointer_curve(value: i32, saturation: f64, gain: f64) -> i32 {
    let angle = f64::from(value) * FRAC_PI_2 / saturation;
    (angle.tan() * gain).round() as i32
}

pub struct VirtualMouse {
    sink: Mutex<Box<dyn OutputSink>>,
    input_state: Arc<InputState>,
    // (absolute axis, relative axis)
    axes: Vec<(u16, u16)>,
    control: Arc<dyn DeviceControl>,
    state_tx: watch::Sender<PointerState>,
    settings: MouseSettings,
}

impl VirtualMouse {
    pub fn new(
        sink: Box<dyn OutputSink>,
        input_state: Arc<InputState>,
        remap: &RemapConfig,
        control: Arc<dyn DeviceControl>,
        settings: MouseSettings,
    ) -> Self {
        let axes = remap
            .axis_rel_map
            .iter()
            .map(|(abs, rel)| (*abs, *rel))
            .collect();
        let (state_tx, _) = watch::channel(PointerState::Disabled);

        Self {
            sink: Mutex::new(sink),
            input_state,
            axes,
            control,
            state_tx,
            settings,
        }
    }

    pub fn state(&self) -> PointerState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PointerState> {
        self.state_tx.subscribe()
    }

    fn with_sink<T>(
        &self,
        f: impl FnOnce(&mut dyn OutputSink) -> Result<T, MappingError>,
    ) -> Result<T, MappingError> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|e| MappingError::StateError(format!("Output sink lock poisoned: {}", e)))?;
        f(sink.as_mut())
    }

    /// Emit one frame of relative motion for every mapped axis
    fn tick(&self) -> Result<(), MappingError> {
        self.with_sink(|sink| {
            for (abs, rel) in &self.axes {
                let value = self.input_state.axis(*abs);
                let relative =
                    pointer_curve(value, self.settings.axis_saturation, self.settings.gain);
                sink.write(ChannelKind::Relative, *rel, relative)
                    .map_err(MappingError::OutputError)?;
            }
            sink.sync().map_err(MappingError::OutputError)
        })
    }

    /// Tick loop, runs until cancelled or a write fails
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MappingError> {
        info!(
            "Starting virtual mouse loop ({} axes, {:?} tick)",
            self.axes.len(),
            self.settings.tick_interval
        );
        let mut state_rx = self.state_tx.subscribe();

        loop {
            if self.state().is_enabled() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.tick_interval) => {}
                }
            } else {
                debug!("Virtual mouse parked");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    res = wait_enabled(&mut state_rx) => res?,
                }
                debug!("Virtual mouse woken");
            }

            // disabled while sleeping
            if !self.state().is_enabled() {
                continue;
            }
            self.tick()?;
        }

        info!("Virtual mouse loop stopped");
        Ok(())
    }
}

async fn wait_enabled(state_rx: &mut watch::Receiver<PointerState>) -> Result<(), MappingError> {
    state_rx
        .wait_for(|state| state.is_enabled())
        .await
        .map_err(|e| MappingError::StateError(e.to_string()))?;
    Ok(())
}

impl PointerControl for VirtualMouse {
    fn enable(&self) {
        let changed = self.state_tx.send_if_modified(|state| {
            if state.is_enabled() {
                false
            } else {
                *state = PointerState::Enabled;
                true
            }
        });
        if changed {
            info!("Virtual mouse enabled");
        }
    }

    fn disable(&self) -> Result<(), MappingError> {
        self.control
            .reset_profile()
            .map_err(MappingError::ControlError)?;
        self.state_tx.send_replace(PointerState::Disabled);
        info!("Virtual mouse disabled");
        Ok(())
    }

    fn write(&self, kind: ChannelKind, code: u16, value: i32) -> Result<(), MappingError> {
        debug!("Writing {}", RawEvent::new(kind, code, value));
        self.with_sink(|sink| {
            sink.write(kind, code, value)
                .map_err(MappingError::OutputError)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::device::codes::*;
    use crate::device::{DeviceError, RawEvent, Rgb, RowBand};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Frame marker as recorded by sinks
    pub(crate) fn sync_event() -> RawEvent {
        RawEvent::new(ChannelKind::Sync, SYN_REPORT, 0)
    }

    /// Sink that records every staged event and frame boundary
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub events: Arc<Mutex<Vec<RawEvent>>>,
    }

    impl OutputSink for RecordingSink {
        fn write(&mut self, kind: ChannelKind, code: u16, value: i32) -> Result<(), DeviceError> {
            self.events
                .lock()
                .unwrap()
                .push(RawEvent::new(kind, code, value));
            Ok(())
        }

        fn sync(&mut self) -> Result<(), DeviceError> {
            self.events.lock().unwrap().push(sync_event());
            Ok(())
        }
    }

    /// Sink whose device has gone away
    pub(crate) struct BrokenSink;

    impl OutputSink for BrokenSink {
        fn write(&mut self, _: ChannelKind, _: u16, _: i32) -> Result<(), DeviceError> {
            Err(DeviceError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
        }

        fn sync(&mut self) -> Result<(), DeviceError> {
            Err(DeviceError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
        }
    }

    #[derive(Default)]
    pub(crate) struct CountingControl {
        pub resets: AtomicUsize,
        pub row_payloads: Mutex<Vec<(RowBand, [Vec<Rgb>; 3])>>,
    }

    impl DeviceControl for CountingControl {
        fn reset_profile(&self) -> Result<(), DeviceError> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn send_rows(&self, band: RowBand, rows: &[Vec<Rgb>; 3]) -> Result<(), DeviceError> {
            self.row_payloads.lock().unwrap().push((band, rows.clone()));
            Ok(())
        }
    }

    fn two_axis_remap() -> RemapConfig {
        RemapConfig {
            key_map: Default::default(),
            axis_rel_map: [(ABS_X, REL_X), (ABS_Y, REL_Y)].into_iter().collect(),
            axis_button_map: Default::default(),
            disable_button: BTN_START,
        }
    }

    fn mouse_with(
        sink: Box<dyn OutputSink>,
    ) -> (Arc<VirtualMouse>, Arc<InputState>, Arc<CountingControl>) {
        let state = Arc::new(InputState::new());
        let control = Arc::new(CountingControl::default());
        let mouse = Arc::new(VirtualMouse::new(
            sink,
            state.clone(),
            &two_axis_remap(),
            control.clone(),
            MouseSettings::default(),
        ));
        (mouse, state, control)
    }

    fn frames(events: &[RawEvent]) -> usize {
        events.iter().filter(|e| e.kind == ChannelKind::Sync).count()
    }

    #[test]
    fn test_curve_is_odd_and_centered() {
        assert_eq!(pointer_curve(0, 34000.0, 10.0), 0);
        for value in [1, 500, 1081, 5000, 17000, 25000, 32767] {
            assert_eq!(
                pointer_curve(-value, 34000.0, 10.0),
                -pointer_curve(value, 34000.0, 10.0)
            );
        }
    }

    #[test]
    fn test_curve_shape() {
        // quarter of the saturation range -> tan(pi/8) * 10
        assert_eq!(pointer_curve(8500, 34000.0, 10.0), 4);
        // half -> tan(pi/4) * 10
        assert_eq!(pointer_curve(17000, 34000.0, 10.0), 10);
        // near full deflection accelerates hard
        assert!(pointer_curve(32767, 34000.0, 10.0) > 100);
        // small deflections round to no motion
        assert_eq!(pointer_curve(500, 34000.0, 10.0), 0);

        let mut last = 0;
        for value in (0..=32767).step_by(1024) {
            let relative = pointer_curve(value, 34000.0, 10.0);
            assert!(relative >= last);
            last = relative;
        }
    }

    #[test]
    fn test_write_passes_through_while_disabled() {
        let sink = RecordingSink::default();
        let (mouse, _, _) = mouse_with(Box::new(sink.clone()));

        assert_eq!(mouse.state(), PointerState::Disabled);
        mouse.write(ChannelKind::Key, KEY_CAPSLOCK, 1).unwrap();

        assert_eq!(
            *sink.events.lock().unwrap(),
            vec![RawEvent::key(KEY_CAPSLOCK, 1)]
        );
    }

    #[test]
    fn test_enable_is_idempotent() {
        let (mouse, _, _) = mouse_with(Box::new(RecordingSink::default()));
        let mut rx = mouse.subscribe();

        mouse.enable();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        mouse.enable();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(mouse.state(), PointerState::Enabled);
    }

    #[test]
    fn test_disable_resets_profile_every_time() {
        let (mouse, _, control) = mouse_with(Box::new(RecordingSink::default()));

        mouse.enable();
        mouse.disable().unwrap();
        mouse.disable().unwrap();

        assert_eq!(mouse.state(), PointerState::Disabled);
        assert_eq!(control.resets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_loop_emits_frames_per_tick() {
        let sink = RecordingSink::default();
        let (mouse, state, _) = mouse_with(Box::new(sink.clone()));
        state.record(ChannelKind::Absolute, ABS_X, 17000);
        state.record(ChannelKind::Absolute, ABS_Y, -17000);

        let cancel = CancellationToken::new();
        mouse.enable();
        let task = {
            let mouse = mouse.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { mouse.run(cancel).await })
        };

        // already enabled: first frame after one interval, then 100 ms
        tokio::time::sleep(Duration::from_millis(125)).await;
        cancel.cancel();
        task.await.unwrap().unwrap();

        let events = sink.events.lock().unwrap().clone();
        assert_eq!(frames(&events), 2);
        assert_eq!(
            events[..3],
            [
                RawEvent::new(ChannelKind::Relative, REL_X, 10),
                RawEvent::new(ChannelKind::Relative, REL_Y, -10),
                sync_event(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_loop_stays_parked() {
        let sink = RecordingSink::default();
        let (mouse, state, _) = mouse_with(Box::new(sink.clone()));
        state.record(ChannelKind::Absolute, ABS_X, 20000);

        let cancel = CancellationToken::new();
        let task = {
            let mouse = mouse.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { mouse.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(sink.events.lock().unwrap().is_empty());

        // wakes immediately once enabled
        mouse.enable();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(frames(&sink.events.lock().unwrap()), 1);

        mouse.disable().unwrap();
        let before = sink.events.lock().unwrap().len();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.events.lock().unwrap().len(), before);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_enable_does_not_add_ticks() {
        let sink = RecordingSink::default();
        let (mouse, _, _) = mouse_with(Box::new(sink.clone()));

        let cancel = CancellationToken::new();
        mouse.enable();
        let task = {
            let mouse = mouse.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { mouse.run(cancel).await })
        };

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(11)).await;
            mouse.enable();
        }
        // 110 ms elapsed: frames at 50 and 100
        cancel.cancel();
        task.await.unwrap().unwrap();

        assert_eq!(frames(&sink.events.lock().unwrap()), 2);
    }

    #[tokio::test]
    async fn test_write_failure_ends_loop() {
        let (mouse, _, _) = mouse_with(Box::new(BrokenSink));
        mouse.enable();

        let result = mouse.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(MappingError::OutputError(_))));
    }

    #[tokio::test]
    async fn test_cancel_stops_parked_loop() {
        let (mouse, _, _) = mouse_with(Box::new(RecordingSink::default()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(mouse.run(cancel).await.is_ok());
    }
}
