use async_trait::async_trait;
use serde_json::json;

use super::{Captioner, FoodClassifier, Prediction, RecipeWriter};
use crate::config::GenerationConfig;
use crate::error::{Result, VisionError};
use crate::intake::ValidatedImage;
use crate::providers::huggingface::HuggingFaceClient;
use crate::providers::traits::CompletionProvider;
use crate::recipe::RecipePrompt;

pub struct HfCaptioner {
    client: HuggingFaceClient,
    model: String,
    max_length: u32,
    num_beams: u32,
}

impl HfCaptioner {
    pub fn new(client: HuggingFaceClient, model: String, generation: &GenerationConfig) -> Self {
        Self {
            client,
            model,
            max_length: generation.max_caption_length,
            num_beams: generation.caption_num_beams,
        }
    }
}

#[async_trait]
impl Captioner for HfCaptioner {
    async fn caption(&self, image: &ValidatedImage) -> Result<String> {
        let parameters = json!({
            "max_length": self.max_length,
            "num_beams": self.num_beams,
            "do_sample": false,
        });

        let caption = self
            .client
            .image_to_text(&self.model, image.bytes(), parameters)
            .await
            .map_err(|e| VisionError::model("Caption", e))?;

        if caption.is_empty() {
            return Err(VisionError::model("Caption", "empty caption"));
        }
        Ok(caption)
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

pub struct HfFoodClassifier {
    client: HuggingFaceClient,
    model: String,
}

impl HfFoodClassifier {
    pub fn new(client: HuggingFaceClient, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl FoodClassifier for HfFoodClassifier {
    async fn classify(&self, image: &ValidatedImage, top_k: usize) -> Result<Vec<Prediction>> {
        let labels = self
            .client
            .classify_image(&self.model, image.bytes(), top_k.max(1))
            .await
            .map_err(|e| VisionError::model("Classifier", e))?;

        if labels.is_empty() {
            return Err(VisionError::model("Classifier", "no labels returned"));
        }

        Ok(labels
            .into_iter()
            .map(|l| Prediction::new(l.label, l.score))
            .collect())
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

/// Sequence-to-sequence recipe generation on the hosted inference API.
pub struct HfRecipeWriter {
    client: HuggingFaceClient,
    model: String,
    generation: GenerationConfig,
}

impl HfRecipeWriter {
    pub fn new(client: HuggingFaceClient, model: String, generation: GenerationConfig) -> Self {
        Self {
            client,
            model,
            generation,
        }
    }

    fn parameters(&self) -> serde_json::Value {
        let g = &self.generation;
        json!({
            "max_length": g.max_recipe_length,
            "min_length": g.min_recipe_length,
            "num_beams": g.num_beams,
            "temperature": g.temperature,
            "top_p": g.top_p,
            "repetition_penalty": g.repetition_penalty,
            "no_repeat_ngram_size": g.no_repeat_ngram_size,
            "early_stopping": true,
        })
    }
}

#[async_trait]
impl RecipeWriter for HfRecipeWriter {
    async fn write_recipe(&self, prompt: &RecipePrompt) -> Result<String> {
        let input = prompt.render_truncated(self.generation.max_prompt_tokens);

        let recipe = self
            .client
            .text_to_text(&self.model, &input, self.parameters())
            .await
            .map_err(|e| VisionError::model("Recipe", e))?;

        if recipe.is_empty() {
            return Err(VisionError::model("Recipe", "empty recipe"));
        }
        Ok(recipe)
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

/// Recipe generation through a chat-completion provider.
pub struct CompletionRecipeWriter {
    provider: Box<dyn CompletionProvider + Send + Sync>,
    model: String,
    max_prompt_tokens: usize,
}

impl CompletionRecipeWriter {
    pub async fn new(provider: Box<dyn CompletionProvider + Send + Sync>, max_prompt_tokens: usize) -> Result<Self> {
        let model = provider
            .get_model_info()
            .await
            .map_err(|e| VisionError::model("Recipe", e))?;

        Ok(Self {
            model: format!("{}:{}", provider.name().to_lowercase(), model),
            provider,
            max_prompt_tokens,
        })
    }
}

#[async_trait]
impl RecipeWriter for CompletionRecipeWriter {
    async fn write_recipe(&self, prompt: &RecipePrompt) -> Result<String> {
        let input = prompt.render_truncated(self.max_prompt_tokens);

        let recipe = self
            .provider
            .complete(&input)
            .await
            .map_err(|e| VisionError::model("Recipe", e))?;

        let recipe = recipe.trim().to_string();
        if recipe.is_empty() {
            return Err(VisionError::model("Recipe", "empty recipe"));
        }
        Ok(recipe)
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}
