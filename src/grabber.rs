//! Screen capture boundary
//!
//! The daemon does not talk to the windowing system itself. Grabbers sample
//! pixels out of a source provided by the host: a screenshot file kept up to
//! date by an external tool, or fixed colors for dry runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    color::{self, Color, DeviceColor, ParseColorError, BLACK},
    models::{self, GrabberConfig},
};

mod image;
pub use self::image::{frame_mean, ImageGrabber};

/// Screen coordinates of a monitored pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("i/o error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot decode screenshot: {0}")]
    Image(#[from] ::image::ImageError),
    #[error("point {point} is outside of the {width}x{height} screen")]
    OutOfBounds {
        point: Point,
        width: u32,
        height: u32,
    },
    #[error("no frame captured")]
    NoFrame,
    #[error("this source cannot average a frame")]
    Unsupported,
    #[error("capture did not complete within {0:?}")]
    Timeout(Duration),
    #[error("capture task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl CaptureError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_owned(),
            source,
        }
    }
}

#[async_trait]
pub trait Grabber: Send {
    /// Prepare a new frame. All samples taken until the next call come from the same frame.
    async fn begin_frame(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Sample the color of a single pixel in the current frame
    async fn sample(&mut self, point: Point) -> Result<Color, CaptureError>;

    /// Mean color of the current frame
    async fn mean(&mut self) -> Result<Color, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}

/// Grabber returning fixed colors
#[derive(Debug, Clone)]
pub struct SolidGrabber {
    default: Color,
    colors: HashMap<Point, Color>,
}

impl SolidGrabber {
    pub fn new(default: Color) -> Self {
        Self {
            default,
            colors: HashMap::new(),
        }
    }

    pub fn with(mut self, point: Point, color: DeviceColor) -> Self {
        self.colors.insert(point, color::from_device(color));
        self
    }
}

impl Default for SolidGrabber {
    fn default() -> Self {
        Self::new(BLACK)
    }
}

#[async_trait]
impl Grabber for SolidGrabber {
    async fn sample(&mut self, point: Point) -> Result<Color, CaptureError> {
        Ok(self.colors.get(&point).copied().unwrap_or(self.default))
    }

    /// The configured points are single pixels, the screen is the default color
    async fn mean(&mut self) -> Result<Color, CaptureError> {
        Ok(self.default)
    }
}

/// Build the grabber described by the capture configuration
pub fn from_config(config: &models::Capture) -> Result<Box<dyn Grabber>, ParseColorError> {
    let grabber: Box<dyn Grabber> = match &config.source {
        GrabberConfig::Image { path } => Box::new(ImageGrabber::new(path)),
        GrabberConfig::Solid { primary, secondary } => Box::new(
            SolidGrabber::default()
                .with(config.primary, color::parse_hex(primary)?)
                .with(config.secondary, color::parse_hex(secondary)?),
        ),
    };

    Ok(grabber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::SENTINEL_GRAY;

    #[tokio::test]
    async fn solid_grabber_colors() {
        let primary = Point::new(134, 59);
        let secondary = Point::new(1706, 75);

        let mut grabber = SolidGrabber::default()
            .with(primary, DeviceColor::new(0, 0, 255))
            .with(secondary, DeviceColor::new(215, 215, 215));

        grabber.begin_frame().await.unwrap();
        assert_eq!(
            grabber.sample(primary).await.unwrap(),
            Color::new(0.0, 0.0, 1.0)
        );
        assert_eq!(grabber.sample(secondary).await.unwrap(), SENTINEL_GRAY);
        assert_eq!(grabber.sample(Point::new(0, 0)).await.unwrap(), BLACK);
    }

    #[tokio::test]
    async fn solid_from_config() {
        let config = models::Capture {
            source: GrabberConfig::Solid {
                primary: "#0000ff".to_owned(),
                secondary: "#d7d7d7".to_owned(),
            },
            ..Default::default()
        };

        let mut grabber = from_config(&config).expect("valid colors");
        assert_eq!(
            grabber.sample(config.secondary).await.unwrap(),
            SENTINEL_GRAY
        );

        let config = models::Capture {
            source: GrabberConfig::Solid {
                primary: "blue".to_owned(),
                secondary: "#d7d7d7".to_owned(),
            },
            ..Default::default()
        };
        assert!(from_config(&config).is_err());
    }
}
