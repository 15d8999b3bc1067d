//! Time-of-day palette for the keyboard backlight
//!
//! The hue walks once around the colour wheel per day. A row is split into
//! three bands that are shifted slightly in hue, giving a soft gradient across
//! the keyboard. The base colour comes from HLS; the band shift is done in
//! HSLuv so every step looks equally far apart.

use crate::device::Rgb;

/// Columns in one keyboard row
pub const COLUMNS: usize = 21;

/// Hue in `[0, 1)` for a wall-clock time
pub fn time_of_day_hue(hour: u32, minute: u32) -> f64 {
    f64::from(hour * 60 + minute) / (24.0 * 60.0)
}

/// HSLuv hue shift in degrees for a column
fn band_offset(column: usize) -> f64 {
    match column {
        0..=9 => 0.0,
        10..=11 => 10.0,
        _ => 20.0,
    }
}

/// HLS to RGB, all components in `[0, 1]`
pub fn hls_to_rgb(hue: f64, lightness: f64, saturation: f64) -> (f64, f64, f64) {
    if saturation == 0.0 {
        return (lightness, lightness, lightness);
    }
    let m2 = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let m1 = 2.0 * lightness - m2;

    (
        hue_channel(m1, m2, hue + 1.0 / 3.0),
        hue_channel(m1, m2, hue),
        hue_channel(m1, m2, hue - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn to_rgb((r, g, b): (f64, f64, f64)) -> Rgb {
    let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0) as u8;
    Rgb {
        r: channel(r),
        g: channel(g),
        b: channel(b),
    }
}

/// One row of colours for the given time
pub fn time_of_day_row(hour: u32, minute: u32) -> Vec<Rgb> {
    let base = hls_to_rgb(time_of_day_hue(hour, minute), 0.5, 1.0);
    let (h, s, l) = hsluv::rgb_to_hsluv(base);

    (0..COLUMNS)
        .map(|column| to_rgb(hsluv::hsluv_to_rgb((h + band_offset(column), s, l))))
        .collect()
}
