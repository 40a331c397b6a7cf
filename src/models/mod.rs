//! Model stages of the recipe pipeline.
//!
//! Each stage is a trait so the pipeline can run against hosted inference,
//! a chat-completion provider, or an in-process fake in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::intake::ValidatedImage;
use crate::recipe::RecipePrompt;

pub mod backends;
pub mod manager;

pub use backends::{CompletionRecipeWriter, HfCaptioner, HfFoodClassifier, HfRecipeWriter};
pub use manager::ModelManager;

/// One ranked classifier label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn unknown() -> Self {
        Self::new("Unknown", 0.0)
    }

    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &ValidatedImage) -> Result<String>;

    fn model_id(&self) -> String;
}

#[async_trait]
pub trait FoodClassifier: Send + Sync {
    /// At most `top_k` predictions, highest confidence first.
    async fn classify(&self, image: &ValidatedImage, top_k: usize) -> Result<Vec<Prediction>>;

    fn model_id(&self) -> String;
}

#[async_trait]
pub trait RecipeWriter: Send + Sync {
    async fn write_recipe(&self, prompt: &RecipePrompt) -> Result<String>;

    fn model_id(&self) -> String;
}
