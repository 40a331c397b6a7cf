pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod food;
pub mod intake;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod recipe;

// Re-export commonly used items
pub use config::AppConfig;
pub use error::{Result, VisionError};
pub use pipeline::{RecipePipeline, RecipeResult};
