//! Color types and helpers

use palette::{FromColor, Hsl};
use thiserror::Error;

/// Normalized RGB color, each channel in [0, 1]
pub type Color = palette::Srgb<f32>;

/// Quantized color, as sent on the wire
pub type DeviceColor = palette::Srgb<u8>;

pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
pub const RED: Color = Color::new(1.0, 0.0, 0.0);

/// `#d7d7d7`, shown by the game while a match is running
pub const SENTINEL_GRAY: Color = Color::new(215.0 / 255.0, 215.0 / 255.0, 215.0 / 255.0);

pub trait ColorExt: Sized {
    /// HSL lightness of this color
    fn luminance(&self) -> f32;

    /// Return this color with its HSL lightness replaced, keeping hue and saturation
    fn with_luminance(&self, luminance: f32) -> Self;

    /// Clamp all channels to [0, 1]
    fn clamped(&self) -> Self;

    /// Convert to 8-bit channels, rounding half away from zero
    fn quantize(&self) -> DeviceColor;
}

impl ColorExt for Color {
    fn luminance(&self) -> f32 {
        let hsl: Hsl = Hsl::from_color(self.clamped());
        hsl.lightness
    }

    fn with_luminance(&self, luminance: f32) -> Self {
        let mut hsl: Hsl = Hsl::from_color(self.clamped());
        hsl.lightness = luminance.clamp(0.0, 1.0);
        Color::from_color(hsl).clamped()
    }

    fn clamped(&self) -> Self {
        Color::new(
            clamp_channel(self.red),
            clamp_channel(self.green),
            clamp_channel(self.blue),
        )
    }

    fn quantize(&self) -> DeviceColor {
        let c = self.clamped();
        DeviceColor::new(quantize_channel(c.red), quantize_channel(c.green), quantize_channel(c.blue))
    }
}

fn clamp_channel(c: f32) -> f32 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}

fn quantize_channel(c: f32) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert a captured 8-bit color to a normalized one
pub fn from_device(color: DeviceColor) -> Color {
    Color::new(
        f32::from(color.red) / 255.0,
        f32::from(color.green) / 255.0,
        f32::from(color.blue) / 255.0,
    )
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseColorError {
    #[error("invalid hex color '{0}': expected 3 or 6 hex digits")]
    InvalidLength(String),
    #[error("invalid hex color '{0}': {1}")]
    InvalidDigit(String, hex::FromHexError),
}

/// Parse an hex color literal (`#rrggbb`, `rrggbb`, `#rgb` or `rgb`)
///
/// Short literals expand each digit `d` to `d * 16`, so `#fff` is `(240, 240, 240)`.
pub fn parse_hex(value: &str) -> Result<DeviceColor, ParseColorError> {
    let digits = value.trim().trim_start_matches('#');

    match digits.len() {
        6 => {
            let mut bytes = [0u8; 3];
            hex::decode_to_slice(digits, &mut bytes)
                .map_err(|error| ParseColorError::InvalidDigit(value.to_owned(), error))?;
            Ok(DeviceColor::new(bytes[0], bytes[1], bytes[2]))
        }
        3 => {
            let mut bytes = [0u8; 3];
            for (index, (dst, src)) in bytes.iter_mut().zip(digits.chars()).enumerate() {
                let digit = src.to_digit(16).ok_or_else(|| {
                    ParseColorError::InvalidDigit(
                        value.to_owned(),
                        hex::FromHexError::InvalidHexCharacter { c: src, index },
                    )
                })?;
                *dst = (digit * 16) as u8;
            }
            Ok(DeviceColor::new(bytes[0], bytes[1], bytes[2]))
        }
        _ => Err(ParseColorError::InvalidLength(value.to_owned())),
    }
}
