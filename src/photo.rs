use crate::device::DevicePosition;
use crate::error::CameraError;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// Encoding of a photo payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// JPEG compressed bytes
    Jpeg,
    /// Packed 8-bit RGB, row-major, no padding
    Rgb24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Jpeg => 0, // Variable size, compressed
            PixelFormat::Rgb24 => 3,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, PixelFormat::Jpeg)
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            PixelFormat::Jpeg => "jpg",
            PixelFormat::Rgb24 => "rgb",
        }
    }
}

/// Display orientation tag carried alongside the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

impl Orientation {
    /// Orientation after a horizontal flip of the displayed image.
    ///
    /// Flipping swaps the rotation direction for the quarter turns, so a
    /// sensor image tagged `Right` becomes `LeftMirrored`.
    pub fn mirrored(&self) -> Orientation {
        match self {
            Orientation::Up => Orientation::UpMirrored,
            Orientation::Down => Orientation::DownMirrored,
            Orientation::Left => Orientation::RightMirrored,
            Orientation::Right => Orientation::LeftMirrored,
            Orientation::UpMirrored => Orientation::Up,
            Orientation::DownMirrored => Orientation::Down,
            Orientation::LeftMirrored => Orientation::Right,
            Orientation::RightMirrored => Orientation::Left,
        }
    }

    pub fn is_mirrored(&self) -> bool {
        matches!(
            self,
            Orientation::UpMirrored
                | Orientation::DownMirrored
                | Orientation::LeftMirrored
                | Orientation::RightMirrored
        )
    }
}

/// Photo delivered to the presentation layer
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Identifier of the capture request that produced this image
    pub id: Uuid,
    /// Time the backend finished processing the photo
    pub timestamp: SystemTime,
    /// Encoded or raw payload
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub orientation: Orientation,
    /// Position of the device that took the photo
    pub position: DevicePosition,
    /// Whether a horizontal mirror has been applied
    pub mirrored: bool,
}

impl CapturedImage {
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Mirror the image horizontally.
    ///
    /// Raw payloads are flipped pixel by pixel. Compressed payloads keep their
    /// bytes and get the mirrored orientation tag instead.
    pub fn into_mirrored(self) -> Result<CapturedImage, CameraError> {
        let (data, orientation) = match self.format {
            PixelFormat::Jpeg => (Arc::clone(&self.data), self.orientation.mirrored()),
            PixelFormat::Rgb24 => {
                let raw = RgbImage::from_raw(self.width, self.height, self.data.to_vec())
                    .ok_or_else(|| CameraError::CaptureFailed {
                        details: format!(
                            "RGB payload of {} bytes does not match {}x{}",
                            self.data.len(),
                            self.width,
                            self.height
                        ),
                    })?;
                (
                    Arc::new(imageops::flip_horizontal(&raw).into_raw()),
                    self.orientation,
                )
            }
        };

        Ok(CapturedImage {
            data,
            orientation,
            mirrored: !self.mirrored,
            ..self
        })
    }
}
