pub mod config;
pub mod controller;
pub mod device;
pub mod mapping;

use crate::config::AppConfig;
use crate::controller::ControllerHandle;
use crate::device::evdev_device::{GamepadEvents, VirtualMouseDevice};
use crate::device::hid_control::WootingControl;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Turn a gamepad into a mouse and keyboard, with time-of-day keyboard lighting
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Gamepad event node, e.g. /dev/input/event5
    #[arg(long, env = "WOOTING_MOUSE_EVENT_DEVICE")]
    event_device: PathBuf,

    /// hidraw node of the keyboard control interface
    #[arg(long, env = "WOOTING_MOUSE_CONTROL_DEVICE")]
    control_device: PathBuf,

    /// Configuration file, defaults to the user config directory
    #[arg(long, env = "WOOTING_MOUSE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())
        .map_err(|e| eyre!("Failed to load configuration: {}", e))?;

    let source = GamepadEvents::open(&cli.event_device)
        .map_err(|e| eyre!("Failed to open gamepad: {}", e))?;
    let control = WootingControl::open(&cli.control_device)
        .map_err(|e| eyre!("Failed to open keyboard control interface: {}", e))?;
    let sink = VirtualMouseDevice::create(&config.mouse.device_name, &config.remap.capabilities())
        .map_err(|e| eyre!("Failed to create virtual mouse: {}", e))?;

    let handle = ControllerHandle::new(
        &config,
        Box::new(source),
        Box::new(sink),
        Arc::new(control),
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    handle
        .run(cancel)
        .await
        .map_err(|e| eyre!("Controller failed: {}", e))?;

    info!("Shut down cleanly");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                    _ = terminate.recv() => info!("Received SIGTERM"),
                    _ = cancel.cancelled() => return,
                }
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                    _ = cancel.cancelled() => return,
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
            _ = cancel.cancelled() => return,
        }
    }

    info!("Shutting down");
    cancel.cancel();
}
