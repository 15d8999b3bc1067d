//! Linux input event vocabulary
//!
//! Event types and the subset of codes from `linux/input-event-codes.h` that the
//! remap profiles refer to. Codes stay plain `u16` so the remap tables can carry
//! keys, buttons and axes without converting between evdev wrapper types.

use std::fmt;

/// Category of an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    Sync,
    Key,
    Relative,
    Absolute,
}

impl ChannelKind {
    /// Map a raw `EV_*` number; other event types (MSC, LED, FF, ...) are not tracked
    pub fn from_raw(event_type: u16) -> Option<Self> {
        match event_type {
            EV_SYN => Some(ChannelKind::Sync),
            EV_KEY => Some(ChannelKind::Key),
            EV_REL => Some(ChannelKind::Relative),
            EV_ABS => Some(ChannelKind::Absolute),
            _ => None,
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            ChannelKind::Sync => EV_SYN,
            ChannelKind::Key => EV_KEY,
            ChannelKind::Relative => EV_REL,
            ChannelKind::Absolute => EV_ABS,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Sync => write!(f, "EV_SYN"),
            ChannelKind::Key => write!(f, "EV_KEY"),
            ChannelKind::Relative => write!(f, "EV_REL"),
            ChannelKind::Absolute => write!(f, "EV_ABS"),
        }
    }
}

/// One event as read from or written to an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: ChannelKind,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(kind: ChannelKind, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    pub fn key(code: u16, value: i32) -> Self {
        Self::new(ChannelKind::Key, code, value)
    }

    pub fn absolute(code: u16, value: i32) -> Self {
        Self::new(ChannelKind::Absolute, code, value)
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match code_name(self.kind, self.code) {
            Some(name) => write!(f, "{} {} {}", self.kind, name, self.value),
            None => write!(f, "{} {:#06x} {}", self.kind, self.code, self.value),
        }
    }
}

// Event types
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;

pub const SYN_REPORT: u16 = 0x00;

// Keyboard keys
pub const KEY_ESC: u16 = 1;
pub const KEY_TAB: u16 = 15;
pub const KEY_ENTER: u16 = 28;
pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_LEFTALT: u16 = 56;
pub const KEY_SPACE: u16 = 57;
pub const KEY_CAPSLOCK: u16 = 58;
pub const KEY_LEFTMETA: u16 = 125;

// Mouse buttons
pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_SIDE: u16 = 0x113;
pub const BTN_EXTRA: u16 = 0x114;
pub const BTN_FORWARD: u16 = 0x115;
pub const BTN_BACK: u16 = 0x116;

// Gamepad buttons
pub const BTN_SOUTH: u16 = 0x130;
pub const BTN_EAST: u16 = 0x131;
pub const BTN_NORTH: u16 = 0x133;
pub const BTN_WEST: u16 = 0x134;
pub const BTN_TL: u16 = 0x136;
pub const BTN_TR: u16 = 0x137;
pub const BTN_TL2: u16 = 0x138;
pub const BTN_TR2: u16 = 0x139;
pub const BTN_SELECT: u16 = 0x13a;
pub const BTN_START: u16 = 0x13b;
pub const BTN_MODE: u16 = 0x13c;
pub const BTN_THUMBL: u16 = 0x13d;
pub const BTN_THUMBR: u16 = 0x13e;

// Relative axes
pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;
pub const REL_WHEEL_HI_RES: u16 = 0x0b;
pub const REL_HWHEEL_HI_RES: u16 = 0x0c;

// Absolute axes
pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_HAT0X: u16 = 0x10;
pub const ABS_HAT0Y: u16 = 0x11;

const KEY_NAMES: &[(&str, u16)] = &[
    ("KEY_ESC", KEY_ESC),
    ("KEY_TAB", KEY_TAB),
    ("KEY_ENTER", KEY_ENTER),
    ("KEY_LEFTCTRL", KEY_LEFTCTRL),
    ("KEY_LEFTSHIFT", KEY_LEFTSHIFT),
    ("KEY_LEFTALT", KEY_LEFTALT),
    ("KEY_SPACE", KEY_SPACE),
    ("KEY_CAPSLOCK", KEY_CAPSLOCK),
    ("KEY_LEFTMETA", KEY_LEFTMETA),
    ("BTN_LEFT", BTN_LEFT),
    ("BTN_RIGHT", BTN_RIGHT),
    ("BTN_MIDDLE", BTN_MIDDLE),
    ("BTN_SIDE", BTN_SIDE),
    ("BTN_EXTRA", BTN_EXTRA),
    ("BTN_FORWARD", BTN_FORWARD),
    ("BTN_BACK", BTN_BACK),
    ("BTN_SOUTH", BTN_SOUTH),
    ("BTN_A", BTN_SOUTH),
    ("BTN_EAST", BTN_EAST),
    ("BTN_B", BTN_EAST),
    ("BTN_NORTH", BTN_NORTH),
    ("BTN_X", BTN_NORTH),
    ("BTN_WEST", BTN_WEST),
    ("BTN_Y", BTN_WEST),
    ("BTN_TL", BTN_TL),
    ("BTN_TR", BTN_TR),
    ("BTN_TL2", BTN_TL2),
    ("BTN_TR2", BTN_TR2),
    ("BTN_SELECT", BTN_SELECT),
    ("BTN_START", BTN_START),
    ("BTN_MODE", BTN_MODE),
    ("BTN_THUMBL", BTN_THUMBL),
    ("BTN_THUMBR", BTN_THUMBR),
];

const REL_NAMES: &[(&str, u16)] = &[
    ("REL_X", REL_X),
    ("REL_Y", REL_Y),
    ("REL_HWHEEL", REL_HWHEEL),
    ("REL_WHEEL", REL_WHEEL),
    ("REL_WHEEL_HI_RES", REL_WHEEL_HI_RES),
    ("REL_HWHEEL_HI_RES", REL_HWHEEL_HI_RES),
];

const ABS_NAMES: &[(&str, u16)] = &[
    ("ABS_X", ABS_X),
    ("ABS_Y", ABS_Y),
    ("ABS_Z", ABS_Z),
    ("ABS_RX", ABS_RX),
    ("ABS_RY", ABS_RY),
    ("ABS_RZ", ABS_RZ),
    ("ABS_HAT0X", ABS_HAT0X),
    ("ABS_HAT0Y", ABS_HAT0Y),
];

fn table(kind: ChannelKind) -> &'static [(&'static str, u16)] {
    match kind {
        ChannelKind::Key => KEY_NAMES,
        ChannelKind::Relative => REL_NAMES,
        ChannelKind::Absolute => ABS_NAMES,
        ChannelKind::Sync => &[("SYN_REPORT", SYN_REPORT)],
    }
}

/// Resolve a Linux code name such as `"BTN_SOUTH"` within a channel
pub fn code_from_name(kind: ChannelKind, name: &str) -> Option<u16> {
    let name = name.trim();
    table(kind)
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Name used when logging events; aliases resolve to the first listed name
pub fn code_name(kind: ChannelKind, code: u16) -> Option<&'static str> {
    table(kind)
        .iter()
        .find(|(_, candidate)| *candidate == code)
        .map(|(name, _)| *name)
}
