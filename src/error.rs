use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Image is too small. Please upload a larger image (at least {min_width}x{min_height} pixels).")]
    ImageTooSmall { min_width: u32, min_height: u32 },

    #[error("Image is too large. Please upload an image smaller than {max_mb}MB.")]
    ImageTooLarge { max_mb: u64 },

    #[error("Image is too large. Maximum resolution is {max_width}x{max_height} pixels.")]
    ResolutionTooLarge { max_width: u32, max_height: u32 },

    #[error("Unsupported image format '{0}'. Please upload a JPG, JPEG or PNG file.")]
    UnsupportedFormat(String),

    #[error("Error loading image: {0}")]
    InvalidImage(String),

    #[error("No image data was uploaded")]
    EmptyUpload,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{stage} model error: {message}")]
    Model { stage: &'static str, message: String },

    #[error("Nutrition API error: {0}")]
    Nutrition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VisionError {
    pub fn model(stage: &'static str, err: impl std::fmt::Display) -> Self {
        VisionError::Model {
            stage,
            message: err.to_string(),
        }
    }

    /// True for errors caused by the uploaded data or request parameters.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VisionError::ImageTooSmall { .. }
                | VisionError::ImageTooLarge { .. }
                | VisionError::ResolutionTooLarge { .. }
                | VisionError::UnsupportedFormat(_)
                | VisionError::InvalidImage(_)
                | VisionError::EmptyUpload
                | VisionError::InvalidRequest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VisionError>;
