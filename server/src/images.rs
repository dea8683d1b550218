//! Cover image processing and storage.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use rand::RngCore;

pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Tiff,
];

/// Maximum upload size for a cover (5MB).
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

pub const COVER_WIDTH: u32 = 800;
pub const COVER_HEIGHT: u32 = 600;
pub const JPEG_QUALITY: u8 = 90;

/// Shipped with the frontend and never deleted.
pub const DEFAULT_COVER: &str = "default.png";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image is too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("Unsupported image format: {0}")]
    Unsupported(String),
    #[error("Failed to decode image: {0}")]
    Undecodable(String),
    #[error("Invalid image name: {0}")]
    InvalidName(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Detect the format from magic bytes, crop-resize to the cover size and re-encode as JPEG.
pub fn process_cover(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    if data.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge {
            size: data.len(),
            max: MAX_IMAGE_SIZE,
        });
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::Undecodable(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| ImageError::Unsupported("unknown".to_string()))?;
    if !ALLOWED_FORMATS.contains(&format) {
        return Err(ImageError::Unsupported(format!("{:?}", format)));
    }

    let img = reader
        .decode()
        .map_err(|e| ImageError::Undecodable(e.to_string()))?;

    // resize_to_fill keeps the aspect ratio and crops the overflow
    let cover = img.resize_to_fill(COVER_WIDTH, COVER_HEIGHT, FilterType::Lanczos3);
    let rgb = DynamicImage::ImageRgb8(cover.to_rgb8());

    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    Ok(buf)
}

fn random_name() -> String {
    let mut bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{}.jpg", hex::encode(bytes))
}

/// Stored names are bare file names: no separators, no parent references.
fn check_name(name: &str) -> Result<(), ImageError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(ImageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Directory of cover images, served publicly under `/{UPLOADS_DIR_NAME}/recipe-images`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, ImageError> {
        check_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Processes and writes a cover, returning its generated file name.
    pub async fn save(&self, data: Vec<u8>) -> Result<String, ImageError> {
        let jpeg = tokio::task::spawn_blocking(move || process_cover(&data))
            .await
            .map_err(|e| ImageError::Encode(e.to_string()))??;

        tokio::fs::create_dir_all(&self.dir).await?;
        let name = random_name();
        tokio::fs::write(self.dir.join(&name), jpeg).await?;

        tracing::debug!(image = %name, "saved cover image");
        Ok(name)
    }

    /// Removes a cover. The default cover and already-missing files are left alone;
    /// other failures are logged and swallowed.
    pub async fn delete(&self, name: &str) {
        if name.is_empty() || name == DEFAULT_COVER {
            return;
        }
        let path = match self.path_for(name) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "refusing to delete image");
                return;
            }
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(image = %name, "deleted cover image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(image = %name, error = %e, "failed to delete image"),
        }
    }
}
