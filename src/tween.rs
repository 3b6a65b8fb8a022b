//! Time-parameterized color curves

use std::f32::consts::PI;
use std::time::{Duration, Instant};

use strum_macros::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::color::{Color, ColorExt, BLACK};

/// Easing curve applied to the luminance of the start color
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EasingKind {
    /// One half cosine period: full, dark, full
    Cosine,
    /// One full cosine period: two pulses
    QuickCosine,
    /// Same as [EasingKind::QuickCosine], never below 20% luminance
    QuickCosineFloor,
    /// Same as [EasingKind::Cosine], never below 20% luminance
    CosineFloor,
    /// Three on/off blinks, on for 80% of each blink
    Square,
}

impl EasingKind {
    /// Evaluate the curve for the given color at `rate` in [0, 1]
    pub fn apply(self, color: Color, rate: f32) -> Color {
        let l = color.luminance();

        match self {
            EasingKind::Cosine => color.with_luminance(l * (PI * rate).cos().abs()),
            EasingKind::QuickCosine => color.with_luminance(l * (2. * PI * rate).cos().abs()),
            EasingKind::QuickCosineFloor => {
                color.with_luminance(l * (0.8 * (2. * PI * rate).cos().abs() + 0.2))
            }
            EasingKind::CosineFloor => {
                color.with_luminance(l * (0.8 * (PI * rate).cos().abs() + 0.2))
            }
            EasingKind::Square => {
                if (rate * 3.).rem_euclid(1.) < 0.8 {
                    color
                } else {
                    BLACK
                }
            }
        }
    }
}

impl Default for EasingKind {
    fn default() -> Self {
        Self::QuickCosine
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TweenError {
    #[error("tween duration must be positive")]
    InvalidDuration,
}

/// An animated color, started at a given instant
#[derive(Debug, Clone)]
pub struct Tween {
    color: Color,
    kind: EasingKind,
    duration: Duration,
    start: Instant,
}

impl Tween {
    pub fn new(
        color: Color,
        kind: EasingKind,
        duration: Duration,
        start: Instant,
    ) -> Result<Self, TweenError> {
        if duration.is_zero() {
            return Err(TweenError::InvalidDuration);
        }

        Ok(Self {
            color,
            kind,
            duration,
            start,
        })
    }

    pub fn kind(&self) -> EasingKind {
        self.kind
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Fraction of the duration elapsed at `now`, in [0, 1]
    pub fn rate(&self, now: Instant) -> f32 {
        let since = now.saturating_duration_since(self.start);
        (since.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }

    /// True once strictly more than the duration has elapsed
    pub fn is_done(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) > self.duration
    }

    pub fn color_at(&self, now: Instant) -> Color {
        self.kind.apply(self.color, self.rate(now))
    }
}
