//! Fixed-rate capture and dispatch loop

use std::time::Duration;

use thiserror::Error;
use tokio::{select, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    color::{Color, ColorExt},
    generator::{ColorGenerator, GeneratorMode},
    grabber::{CaptureError, Grabber, Point},
    transport::{SendReport, Transport},
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("invalid tick rate: {0} Hz")]
    InvalidTickRate(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSettings {
    /// Ticks per second
    pub tick_rate: f64,
    /// Skip sending a color equal to the last one sent
    pub suppress_unchanged: bool,
    /// Deadline for capturing both samples of a tick
    pub capture_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            suppress_unchanged: true,
            capture_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub ticks: u64,
    pub sent: u64,
    pub suppressed: u64,
    /// Individual peer deliveries that failed
    pub failed: u64,
}

/// Drives the generator from the grabber and forwards its colors to the transport
pub struct Dispatcher {
    grabber: Box<dyn Grabber>,
    generator: ColorGenerator,
    transport: Transport,
    primary: Point,
    secondary: Point,
    settings: DispatchSettings,
    period: Duration,
    last_sent: Option<Color>,
}

impl Dispatcher {
    pub fn new(
        grabber: Box<dyn Grabber>,
        generator: ColorGenerator,
        transport: Transport,
        (primary, secondary): (Point, Point),
        settings: DispatchSettings,
    ) -> Result<Self, DispatchError> {
        if !settings.tick_rate.is_finite() || settings.tick_rate <= 0. {
            return Err(DispatchError::InvalidTickRate(settings.tick_rate));
        }

        Ok(Self {
            grabber,
            generator,
            transport,
            primary,
            secondary,
            settings,
            period: Duration::from_secs_f64(1. / settings.tick_rate),
            last_sent: None,
        })
    }

    pub fn generator(&self) -> &ColorGenerator {
        &self.generator
    }

    pub fn into_transport(self) -> Transport {
        self.transport
    }

    async fn capture(&mut self) -> Result<(Color, Color), CaptureError> {
        let timeout = self.settings.capture_timeout;
        let (primary, secondary) = (self.primary, self.secondary);
        let grabber = &mut self.grabber;

        tokio::time::timeout(timeout, async move {
            grabber.begin_frame().await?;
            let primary = grabber.sample(primary).await?;
            let secondary = grabber.sample(secondary).await?;
            Ok::<_, CaptureError>((primary, secondary))
        })
        .await
        .map_err(|_| CaptureError::Timeout(timeout))?
    }

    async fn capture_mean(&mut self) -> Result<Color, CaptureError> {
        let timeout = self.settings.capture_timeout;
        let grabber = &mut self.grabber;

        tokio::time::timeout(timeout, async move {
            grabber.begin_frame().await?;
            grabber.mean().await
        })
        .await
        .map_err(|_| CaptureError::Timeout(timeout))?
    }

    /// Run one tick at `now`
    ///
    /// Returns the delivery report, or `None` if the send was suppressed.
    pub async fn tick(&mut self, now: Instant) -> Result<Option<SendReport>, DispatchError> {
        let color = match self.generator.mode() {
            GeneratorMode::Pulse => {
                let (primary, secondary) = self.capture().await?;
                self.generator.tick(now.into_std(), primary, secondary)
            }
            GeneratorMode::Average => {
                let mean = self.capture_mean().await?;
                self.generator.tick_average(mean)
            }
        };

        if self.settings.suppress_unchanged && self.last_sent == Some(color) {
            return Ok(None);
        }

        let device_color = color.quantize();
        trace!(?device_color, "sending");

        let report = self.transport.send(device_color).await;
        self.last_sent = Some(color);

        Ok(Some(report))
    }

    /// Run until `cancel` is triggered or a capture fails
    ///
    /// Cancellation is honored between ticks only, so a started send always completes.
    /// Late ticks are not caught up.
    #[instrument(skip_all, fields(tick_rate = self.settings.tick_rate))]
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<DispatchStats, DispatchError> {
        let mut stats = DispatchStats::default();

        info!(
            primary = %self.primary,
            secondary = %self.secondary,
            peers = self.transport.len(),
            suppress_unchanged = self.settings.suppress_unchanged,
            "dispatcher started"
        );

        while !cancel.is_cancelled() {
            let tick_start = Instant::now();

            match self.tick(tick_start).await {
                Ok(Some(report)) => {
                    stats.sent += 1;
                    stats.failed += report.failed as u64;
                }
                Ok(None) => {
                    stats.suppressed += 1;
                }
                Err(error) => {
                    error!(error = %error, ticks = stats.ticks, "dispatcher stopped");
                    return Err(error);
                }
            }

            stats.ticks += 1;

            select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(tick_start + self.period) => {}
            }
        }

        info!(?stats, "dispatcher cancelled");
        Ok(stats)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.generator.state())
            .field("transport", &self.transport)
            .field("settings", &self.settings)
            .finish()
    }
}
