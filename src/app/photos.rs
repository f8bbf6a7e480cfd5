use crate::device::DevicePosition;
use crate::error::{Result, ShutterError};
use crate::photo::{CapturedImage, Orientation, PixelFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// JSON sidecar written next to a saved photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub capture_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub position: DevicePosition,
    pub mirrored: bool,
    pub orientation: Orientation,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub byte_len: usize,
}

impl From<&CapturedImage> for PhotoMetadata {
    fn from(image: &CapturedImage) -> Self {
        Self {
            capture_id: image.id,
            captured_at: DateTime::<Utc>::from(image.timestamp),
            position: image.position,
            mirrored: image.mirrored,
            orientation: image.orientation,
            format: image.format,
            width: image.width,
            height: image.height,
            byte_len: image.byte_len(),
        }
    }
}

/// Writes delivered photos to the capture directory
#[derive(Debug, Clone)]
pub struct PhotoWriter {
    output_dir: PathBuf,
    save_metadata: bool,
}

impl PhotoWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P, save_metadata: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            save_metadata,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save the payload under a timestamped name; returns the photo path
    pub async fn save(&self, image: &CapturedImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            ShutterError::component(
                "photo_writer",
                &format!("Failed to create output directory: {}", e),
            )
        })?;

        let stem = file_stem(image);
        let photo_path = self
            .output_dir
            .join(format!("{}.{}", stem, image.format.file_extension()));

        fs::write(&photo_path, image.data.as_slice())
            .await
            .map_err(|e| {
                ShutterError::component(
                    "photo_writer",
                    &format!("Failed to write photo file: {}", e),
                )
            })?;

        if self.save_metadata {
            let metadata = PhotoMetadata::from(image);
            let metadata_json = serde_json::to_string_pretty(&metadata).map_err(|e| {
                ShutterError::component(
                    "photo_writer",
                    &format!("Failed to serialize metadata: {}", e),
                )
            })?;

            let metadata_path = self.output_dir.join(format!("{}.json", stem));
            fs::write(&metadata_path, metadata_json)
                .await
                .map_err(|e| {
                    ShutterError::component(
                        "photo_writer",
                        &format!("Failed to write metadata file: {}", e),
                    )
                })?;
            debug!("Saved metadata to {}", metadata_path.display());
        }

        info!(
            "Saved {} photo ({} bytes) to {}",
            image.position,
            image.byte_len(),
            photo_path.display()
        );
        Ok(photo_path)
    }
}

fn file_stem(image: &CapturedImage) -> String {
    let timestamp = DateTime::<Utc>::from(image.timestamp);
    let id = image.id.simple().to_string();
    format!(
        "photo_{}_{}",
        timestamp.format("%Y%m%d_%H%M%S_%3f"),
        &id[..8]
    )
}
