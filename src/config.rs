//! Remap profile and timing settings
//!
//! The profile is read once at startup from TOML and never changes afterwards.
//! Codes are written as Linux names in the file and resolved to numbers here.

use crate::device::codes::{self, ChannelKind};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Unknown {kind} code name: {name}")]
    UnknownCode { kind: ChannelKind, name: String },
}

/// Static remap tables, keyed by physical code
#[derive(Debug, Clone, PartialEq)]
pub struct RemapConfig {
    /// Physical button -> emitted key/button
    pub key_map: BTreeMap<u16, u16>,
    /// Physical absolute axis -> emitted relative axis
    pub axis_rel_map: BTreeMap<u16, u16>,
    /// Physical absolute axis -> (button for negative values, button for positive values)
    pub axis_button_map: BTreeMap<u16, (u16, u16)>,
    /// Button that switches pointer emission off
    pub disable_button: u16,
}

/// What the virtual device declares it can emit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub keys: BTreeSet<u16>,
    pub relative_axes: BTreeSet<u16>,
}

impl RemapConfig {
    pub fn capabilities(&self) -> Capabilities {
        let mut keys: BTreeSet<u16> = self.key_map.values().copied().collect();
        for (negative, positive) in self.axis_button_map.values() {
            keys.insert(*negative);
            keys.insert(*positive);
        }

        let mut relative_axes: BTreeSet<u16> = self.axis_rel_map.values().copied().collect();
        // Hosts expect the legacy wheel axes next to the high-resolution ones
        if relative_axes.contains(&codes::REL_WHEEL_HI_RES) {
            relative_axes.insert(codes::REL_WHEEL);
        }
        if relative_axes.contains(&codes::REL_HWHEEL_HI_RES) {
            relative_axes.insert(codes::REL_HWHEEL);
        }

        Capabilities {
            keys,
            relative_axes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseSettings {
    pub device_name: String,
    pub tick_interval: Duration,
    /// Axis magnitude that maps to a quarter turn of the response curve
    pub axis_saturation: f64,
    pub gain: f64,
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            device_name: "Wooting Virtual Mouse for Gamepad".to_string(),
            tick_interval: Duration::from_millis(50),
            axis_saturation: 34000.0,
            gain: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherSettings {
    /// Pause after the disable button before lighting is restored
    pub disable_pause: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            disable_pause: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightingSettings {
    pub repaint_interval: Duration,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            repaint_interval: Duration::from_secs(60),
        }
    }
}

/// Fully resolved application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub remap: RemapConfig,
    pub mouse: MouseSettings,
    pub dispatcher: DispatcherSettings,
    pub lighting: LightingSettings,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            key_map: BTreeMap::from([
                (codes::BTN_SOUTH, codes::KEY_CAPSLOCK),
                (codes::BTN_TL, codes::KEY_LEFTCTRL),
                (codes::BTN_TR, codes::KEY_LEFTALT),
                (codes::BTN_EAST, codes::BTN_LEFT),
                (codes::BTN_NORTH, codes::BTN_MIDDLE),
                (codes::BTN_WEST, codes::BTN_RIGHT),
            ]),
            axis_rel_map: BTreeMap::from([
                (codes::ABS_X, codes::REL_X),
                (codes::ABS_Y, codes::REL_Y),
                (codes::ABS_RX, codes::REL_HWHEEL_HI_RES),
                (codes::ABS_RY, codes::REL_WHEEL_HI_RES),
            ]),
            axis_button_map: BTreeMap::from([(
                codes::ABS_HAT0X,
                (codes::BTN_BACK, codes::BTN_FORWARD),
            )]),
            disable_button: codes::BTN_START,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remap: RemapConfig::default(),
            mouse: MouseSettings::default(),
            dispatcher: DispatcherSettings::default(),
            lighting: LightingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path, the user config dir, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let content = fs::read_to_string(&path).map_err(|source| {
                    ConfigError::ReadError {
                        path: path.clone(),
                        source,
                    }
                })?;
                Self::from_toml(&content)
            }
            None => {
                info!("No configuration file found, using built-in profile");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let config = file.resolve()?;
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wooting-mouse").join("config.toml"))
}

// On-disk form, with code names instead of numbers

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    mouse: MouseSection,
    gamepad: GamepadSection,
    lighting: LightingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct MouseSection {
    device_name: String,
    tick_interval_ms: u64,
    axis_saturation: f64,
    gain: f64,
    axes: BTreeMap<String, String>,
}

impl Default for MouseSection {
    fn default() -> Self {
        let settings = MouseSettings::default();
        Self {
            device_name: settings.device_name,
            tick_interval_ms: settings.tick_interval.as_millis() as u64,
            axis_saturation: settings.axis_saturation,
            gain: settings.gain,
            axes: names(&[
                ("ABS_X", "REL_X"),
                ("ABS_Y", "REL_Y"),
                ("ABS_RX", "REL_HWHEEL_HI_RES"),
                ("ABS_RY", "REL_WHEEL_HI_RES"),
            ]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct GamepadSection {
    mouse_disable: String,
    disable_pause_ms: u64,
    keys: BTreeMap<String, String>,
    axis_buttons: BTreeMap<String, [String; 2]>,
}

impl Default for GamepadSection {
    fn default() -> Self {
        let mut axis_buttons = BTreeMap::new();
        axis_buttons.insert(
            "ABS_HAT0X".to_string(),
            ["BTN_BACK".to_string(), "BTN_FORWARD".to_string()],
        );

        Self {
            mouse_disable: "BTN_START".to_string(),
            disable_pause_ms: DispatcherSettings::default().disable_pause.as_millis() as u64,
            keys: names(&[
                ("BTN_SOUTH", "KEY_CAPSLOCK"),
                ("BTN_TL", "KEY_LEFTCTRL"),
                ("BTN_TR", "KEY_LEFTALT"),
                ("BTN_EAST", "BTN_LEFT"),
                ("BTN_NORTH", "BTN_MIDDLE"),
                ("BTN_WEST", "BTN_RIGHT"),
            ]),
            axis_buttons,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LightingSection {
    repaint_interval_s: u64,
}

impl Default for LightingSection {
    fn default() -> Self {
        Self {
            repaint_interval_s: LightingSettings::default().repaint_interval.as_secs(),
        }
    }
}

fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

fn resolve(kind: ChannelKind, name: &str) -> Result<u16, ConfigError> {
    codes::code_from_name(kind, name).ok_or_else(|| ConfigError::UnknownCode {
        kind,
        name: name.to_string(),
    })
}

impl ConfigFile {
    fn resolve(self) -> Result<AppConfig, ConfigError> {
        let key_map = self
            .gamepad
            .keys
            .iter()
            .map(|(from, to)| {
                Ok((
                    resolve(ChannelKind::Key, from)?,
                    resolve(ChannelKind::Key, to)?,
                ))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let axis_rel_map = self
            .mouse
            .axes
            .iter()
            .map(|(from, to)| {
                Ok((
                    resolve(ChannelKind::Absolute, from)?,
                    resolve(ChannelKind::Relative, to)?,
                ))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let axis_button_map = self
            .gamepad
            .axis_buttons
            .iter()
            .map(|(axis, [negative, positive])| {
                Ok((
                    resolve(ChannelKind::Absolute, axis)?,
                    (
                        resolve(ChannelKind::Key, negative)?,
                        resolve(ChannelKind::Key, positive)?,
                    ),
                ))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        let disable_button = resolve(ChannelKind::Key, &self.gamepad.mouse_disable)?;

        Ok(AppConfig {
            remap: RemapConfig {
                key_map,
                axis_rel_map,
                axis_button_map,
                disable_button,
            },
            mouse: MouseSettings {
                device_name: self.mouse.device_name,
                tick_interval: Duration::from_millis(self.mouse.tick_interval_ms),
                axis_saturation: self.mouse.axis_saturation,
                gain: self.mouse.gain,
            },
            dispatcher: DispatcherSettings {
                disable_pause: Duration::from_millis(self.gamepad.disable_pause_ms),
            },
            lighting: LightingSettings {
                repaint_interval: Duration::from_secs(self.lighting.repaint_interval_s),
            },
        })
    }
}
