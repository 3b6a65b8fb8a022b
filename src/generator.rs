//! Screen state machine deriving the output color

use std::time::{Duration, Instant};

use strum_macros::{Display, EnumString};

use crate::{
    color::{Color, ColorExt, BLACK, RED, SENTINEL_GRAY, WHITE},
    tween::{EasingKind, Tween, TweenError},
};

/// Luminance factor applied in dimmed mode
pub const DIM_FACTOR: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Forward the primary sample
    Capture,
    /// Play the pulse animation
    Pulsing,
    /// Output black until the sentinel reappears
    Idle,
}

impl Default for State {
    fn default() -> Self {
        Self::Capture
    }
}

/// How the output color is derived from the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GeneratorMode {
    /// Two-pixel game state machine
    Pulse,
    /// Mean color of the whole screen
    Average,
}

impl Default for GeneratorMode {
    fn default() -> Self {
        Self::Pulse
    }
}

/// Animation played when both samples turn white
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSettings {
    pub color: Color,
    pub easing: EasingKind,
    pub duration: Duration,
}

impl Default for PulseSettings {
    fn default() -> Self {
        Self {
            color: RED,
            easing: EasingKind::QuickCosine,
            duration: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GeneratorSettings {
    pub mode: GeneratorMode,
    pub pulse: PulseSettings,
    /// Scale the output luminance by [DIM_FACTOR]
    pub dimmed: bool,
}

/// Interprets two screen samples per tick as a game state and emits one color
///
/// Sentinel colors are compared exactly, so the capture source must deliver
/// unfiltered pixels.
#[derive(Debug)]
pub struct ColorGenerator {
    settings: GeneratorSettings,
    state: State,
    tween: Option<Tween>,
}

impl ColorGenerator {
    pub fn new(settings: GeneratorSettings) -> Result<Self, TweenError> {
        if settings.pulse.duration.is_zero() {
            return Err(TweenError::InvalidDuration);
        }

        Ok(Self {
            settings,
            state: State::default(),
            tween: None,
        })
    }

    pub fn mode(&self) -> GeneratorMode {
        self.settings.mode
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn tween(&self) -> Option<&Tween> {
        self.tween.as_ref()
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "state change");

            if self.state == State::Pulsing {
                self.tween = None;
            }

            self.state = state;
        }
    }

    fn start_pulse(&mut self, now: Instant) -> Result<(), TweenError> {
        let pulse = self.settings.pulse;
        self.tween = Some(Tween::new(pulse.color, pulse.easing, pulse.duration, now)?);
        self.set_state(State::Pulsing);
        Ok(())
    }

    /// Advance the state machine by one tick
    ///
    /// # Parameters
    ///
    /// * `now`: time of the current tick
    /// * `primary`: color sampled at the primary point
    /// * `secondary`: color sampled at the secondary point
    pub fn tick(&mut self, now: Instant, primary: Color, secondary: Color) -> Color {
        if self.state == State::Capture && primary == WHITE && secondary == WHITE {
            if let Err(error) = self.start_pulse(now) {
                // Unreachable: the duration is checked in the constructor
                error!(error = %error, "cannot start pulse");
            }
        }

        let color = match (self.state, self.tween.as_ref()) {
            (State::Pulsing, Some(tween)) => {
                let color = tween.color_at(now);

                // The final color is still emitted on this tick
                if tween.is_done(now) {
                    self.set_state(State::Capture);
                }

                color
            }
            _ => {
                if secondary == SENTINEL_GRAY {
                    self.set_state(State::Capture);
                    primary
                } else {
                    self.set_state(State::Idle);
                    BLACK
                }
            }
        };

        trace!(state = ?self.state, ?color, "tick");
        self.dim(color)
    }

    /// Emit the mean color of the screen
    ///
    /// The state machine is not involved, only dimming applies.
    pub fn tick_average(&mut self, mean: Color) -> Color {
        trace!(?mean, "average tick");
        self.dim(mean)
    }

    fn dim(&self, color: Color) -> Color {
        if self.settings.dimmed {
            color.with_luminance(color.luminance() * DIM_FACTOR)
        } else {
            color
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::DeviceColor;

    const BLUE: Color = Color::new(0.0, 0.0, 1.0);

    fn generator() -> ColorGenerator {
        ColorGenerator::new(GeneratorSettings::default()).expect("valid settings")
    }

    #[test]
    fn rejects_zero_pulse_duration() {
        let mut settings = GeneratorSettings::default();
        settings.pulse.duration = Duration::ZERO;

        assert_eq!(
            ColorGenerator::new(settings).unwrap_err(),
            TweenError::InvalidDuration
        );
    }

    #[test]
    fn forwards_primary_on_sentinel() {
        let mut gen = generator();
        let now = Instant::now();

        assert_eq!(gen.tick(now, BLUE, SENTINEL_GRAY), BLUE);
        assert_eq!(gen.state(), State::Capture);
    }

    #[test]
    fn idles_without_sentinel() {
        let mut gen = generator();
        let now = Instant::now();

        assert_eq!(gen.tick(now, BLUE, BLUE), BLACK);
        assert_eq!(gen.state(), State::Idle);

        // Stays idle
        assert_eq!(gen.tick(now, BLUE, Color::new(0.5, 0.5, 0.5)), BLACK);
        assert_eq!(gen.state(), State::Idle);

        // And resumes capture when the sentinel is back
        assert_eq!(gen.tick(now, BLUE, SENTINEL_GRAY), BLUE);
        assert_eq!(gen.state(), State::Capture);
    }

    #[test]
    fn sentinel_is_compared_exactly() {
        let mut gen = generator();
        let almost = Color::new(0.843, 0.843, 0.843);

        assert_eq!(gen.tick(Instant::now(), BLUE, almost), BLACK);
        assert_eq!(gen.state(), State::Idle);
    }

    #[test]
    fn white_starts_pulse() {
        let mut gen = generator();
        let now = Instant::now();

        let color = gen.tick(now, WHITE, WHITE);
        assert_eq!(gen.state(), State::Pulsing);
        assert_eq!(color.quantize(), DeviceColor::new(255, 0, 0));

        let tween = gen.tween().expect("tween started");
        assert_eq!(tween.start(), now);
        assert_eq!(tween.kind(), EasingKind::QuickCosine);
        assert_eq!(tween.duration(), Duration::from_secs(2));
    }

    #[test]
    fn white_while_idle_does_not_pulse() {
        let mut gen = generator();
        let now = Instant::now();

        gen.tick(now, BLUE, BLUE);
        assert_eq!(gen.state(), State::Idle);

        assert_eq!(gen.tick(now, WHITE, WHITE), BLACK);
        assert_eq!(gen.state(), State::Idle);
    }

    #[test]
    fn pulse_ignores_samples() {
        let mut gen = generator();
        let start = Instant::now();

        gen.tick(start, WHITE, WHITE);

        let color = gen.tick(start + Duration::from_millis(500), BLUE, BLUE);
        assert_eq!(gen.state(), State::Pulsing);
        assert!(color.luminance() < 1e-4);
    }

    #[test]
    fn pulse_episode() {
        let mut gen = generator();
        let start = Instant::now();
        let fps = 30;

        gen.tick(start, WHITE, WHITE);

        let mut captured_at = None;
        for i in 1..=2 * fps + 1 {
            let t = i as f64 / fps as f64;
            let color = gen.tick(start + Duration::from_secs_f64(t), BLUE, SENTINEL_GRAY);

            let rate = (t / 2.0).min(1.0) as f32;
            let expected = 0.5 * (2. * std::f32::consts::PI * rate).cos().abs();
            assert!(
                (color.luminance() - expected).abs() < 1e-3,
                "tick {}: luminance {} expected {}",
                i,
                color.luminance(),
                expected
            );

            if gen.state() == State::Capture {
                assert!(captured_at.is_none(), "returned to capture twice");
                captured_at = Some(i);
            }
        }

        // The tick at exactly t = 2s is still part of the pulse
        assert_eq!(captured_at, Some(2 * fps + 1));
        assert!(gen.tween().is_none());

        // Back in capture, samples are forwarded again
        let later = start + Duration::from_secs(3);
        assert_eq!(gen.tick(later, BLUE, SENTINEL_GRAY), BLUE);
    }

    #[test]
    fn dimmed_mode() {
        let mut gen = ColorGenerator::new(GeneratorSettings {
            dimmed: true,
            ..Default::default()
        })
        .expect("valid settings");

        let color = gen.tick(Instant::now(), WHITE, SENTINEL_GRAY);
        assert!((color.luminance() - DIM_FACTOR).abs() < 1e-6);
    }

    #[test]
    fn average_forwards_mean() {
        let mut gen = ColorGenerator::new(GeneratorSettings {
            mode: GeneratorMode::Average,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(gen.mode(), GeneratorMode::Average);

        let mean = Color::new(0.5, 0.25, 0.5);
        assert_eq!(gen.tick_average(mean), mean);
        // White means nothing to the averaging mode
        assert_eq!(gen.tick_average(WHITE), WHITE);
        assert_eq!(gen.state(), State::Capture);
    }

    #[test]
    fn average_is_dimmed() {
        let mut gen = ColorGenerator::new(GeneratorSettings {
            mode: GeneratorMode::Average,
            dimmed: true,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            gen.tick_average(RED).quantize(),
            DeviceColor::new(204, 0, 0)
        );
    }
}
