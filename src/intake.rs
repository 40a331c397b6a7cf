use image::io::Reader as ImageReader;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::config::ImageLimits;
use crate::error::{Result, VisionError};

/// An uploaded image that passed every intake check.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    bytes: Arc<[u8]>,
    format: ImageFormat,
    pub width: u32,
    pub height: u32,
    digest: String,
}

/// What the result reports about the uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    pub size_bytes: usize,
}

impl ValidatedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "image/png",
            _ => "image/jpeg",
        }
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            width: self.width,
            height: self.height,
            mime_type: self.mime_type().to_string(),
            size_bytes: self.bytes.len(),
        }
    }

    /// Hex SHA-256 of the raw upload.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Checks size, type, decodability and resolution of an upload.
pub fn validate_image(bytes: &[u8], filename: Option<&str>, limits: &ImageLimits) -> Result<ValidatedImage> {
    if bytes.is_empty() {
        return Err(VisionError::EmptyUpload);
    }

    if bytes.len() > limits.max_file_size_bytes() {
        return Err(VisionError::ImageTooLarge {
            max_mb: limits.max_file_size_mb,
        });
    }

    if let Some(ext) = filename.and_then(|name| Path::new(name).extension()).and_then(|e| e.to_str()) {
        let ext = ext.to_lowercase();
        if !is_allowed(&ext, limits) {
            return Err(VisionError::UnsupportedFormat(ext));
        }
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VisionError::InvalidImage(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| VisionError::InvalidImage("unrecognized image data".to_string()))?;

    let format_name = match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        other => return Err(VisionError::UnsupportedFormat(format!("{:?}", other).to_lowercase())),
    };
    if !is_allowed(format_name, limits) {
        return Err(VisionError::UnsupportedFormat(format_name.to_string()));
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| VisionError::InvalidImage(e.to_string()))?;

    if width < limits.min_width || height < limits.min_height {
        return Err(VisionError::ImageTooSmall {
            min_width: limits.min_width,
            min_height: limits.min_height,
        });
    }
    if width > limits.max_width || height > limits.max_height {
        return Err(VisionError::ResolutionTooLarge {
            max_width: limits.max_width,
            max_height: limits.max_height,
        });
    }

    // Headers can lie; make sure the pixel data decodes too
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| VisionError::InvalidImage(e.to_string()))?;

    let digest = hex::encode(Sha256::digest(bytes));

    Ok(ValidatedImage {
        bytes: Arc::from(bytes),
        format,
        width,
        height,
        digest,
    })
}

fn is_allowed(format: &str, limits: &ImageLimits) -> bool {
    let aliases: &[&str] = match format {
        "jpg" | "jpeg" => &["jpg", "jpeg"],
        other => return limits.allowed_formats.iter().any(|f| f.eq_ignore_ascii_case(other)),
    };
    limits
        .allowed_formats
        .iter()
        .any(|f| aliases.iter().any(|a| f.eq_ignore_ascii_case(a)))
}
