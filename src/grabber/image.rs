use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;

use super::{CaptureError, Grabber, Point};
use crate::color::{self, Color, DeviceColor};

/// Samples pixels from a screenshot file
///
/// The file is re-read on every frame, so an external tool writing the
/// screenshot (`scrot`, `grim`, a compositor hook, ...) drives the capture.
pub struct ImageGrabber {
    path: PathBuf,
    frame: Option<RgbImage>,
}

/// Per-channel mean of all pixels, `None` for an empty frame
pub fn frame_mean(frame: &RgbImage) -> Option<Color> {
    let count = frame.pixels().len() as u64;
    if count == 0 {
        return None;
    }

    let sums = frame.pixels().fold([0u64; 3], |mut sums, pixel| {
        for (sum, channel) in sums.iter_mut().zip(pixel.0.iter()) {
            *sum += u64::from(*channel);
        }
        sums
    });

    let [r, g, b] = sums.map(|sum| (sum as f64 / count as f64 / 255.) as f32);
    Some(Color::new(r, g, b))
}

impl ImageGrabber {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_owned(),
            frame: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Grabber for ImageGrabber {
    async fn begin_frame(&mut self) -> Result<(), CaptureError> {
        self.frame = None;

        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|error| CaptureError::io(&self.path, error))?;

        // Decoding a full screenshot takes a few ms, keep it off the reactor
        let frame = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&data).map(|image| image.to_rgb8())
        })
        .await??;

        trace!(width = frame.width(), height = frame.height(), "decoded frame");
        self.frame = Some(frame);
        Ok(())
    }

    async fn sample(&mut self, point: Point) -> Result<Color, CaptureError> {
        let frame = self.frame.as_ref().ok_or(CaptureError::NoFrame)?;

        let pixel = frame
            .get_pixel_checked(point.x, point.y)
            .ok_or(CaptureError::OutOfBounds {
                point,
                width: frame.width(),
                height: frame.height(),
            })?;

        let [r, g, b] = pixel.0;
        Ok(color::from_device(DeviceColor::new(r, g, b)))
    }

    async fn mean(&mut self) -> Result<Color, CaptureError> {
        let frame = self.frame.as_ref().ok_or(CaptureError::NoFrame)?;
        frame_mean(frame).ok_or(CaptureError::NoFrame)
    }
}

impl std::fmt::Debug for ImageGrabber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageGrabber")
            .field("path", &self.path)
            .finish()
    }
}
