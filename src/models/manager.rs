use std::sync::Arc;
use std::time::Duration;

use super::{
    Captioner, CompletionRecipeWriter, FoodClassifier, HfCaptioner, HfFoodClassifier, HfRecipeWriter, RecipeWriter,
};
use crate::config::{AppConfig, Device, ProviderConfig, RecipeBackend};
use crate::error::{Result, VisionError};
use crate::providers::deepseek::DeepSeekProvider;
use crate::providers::gemini::GeminiProvider;
use crate::providers::huggingface::HuggingFaceClient;
use crate::providers::openai::OpenAIProvider;
use crate::providers::openrouter::OpenRouterProvider;
use crate::providers::traits::CompletionProvider;
use crate::recipe::CHEF_SYSTEM_PROMPT;

/// Model backends built once at startup and shared by every request.
#[derive(Clone)]
pub struct ModelManager {
    pub captioner: Arc<dyn Captioner>,
    pub classifier: Arc<dyn FoodClassifier>,
    pub recipe_writer: Arc<dyn RecipeWriter>,
    device: Device,
}

impl ModelManager {
    pub async fn load(config: &AppConfig) -> Result<Self> {
        let models = &config.models;
        let device = models.device.resolve();

        let hf = HuggingFaceClient::new(
            &models.inference_url,
            config.secrets.hf_token.clone(),
            Duration::from_secs(models.request_timeout_secs),
            models.wait_for_model,
        )
        .map_err(|e| VisionError::Config(e.to_string()))?;

        if config.secrets.hf_token.is_none() {
            tracing::warn!("HF_TOKEN is not set, hosted inference requests will be rate limited");
        }

        let captioner = Arc::new(HfCaptioner::new(
            hf.clone(),
            models.caption_model.clone(),
            &config.generation,
        ));
        let classifier = Arc::new(HfFoodClassifier::new(hf.clone(), models.classifier_model.clone()));

        let recipe_writer: Arc<dyn RecipeWriter> = match models.recipe_backend {
            RecipeBackend::HuggingFace => Arc::new(HfRecipeWriter::new(
                hf,
                models.recipe_model.clone(),
                config.generation.clone(),
            )),
            backend => {
                let provider = completion_provider(backend).await?;
                Arc::new(CompletionRecipeWriter::new(provider, config.generation.max_prompt_tokens).await?)
            }
        };

        tracing::info!(
            device = device.as_str(),
            caption = %captioner.model_id(),
            classifier = %classifier.model_id(),
            recipe = %recipe_writer.model_id(),
            "Models loaded"
        );

        Ok(Self {
            captioner,
            classifier,
            recipe_writer,
            device,
        })
    }

    pub fn from_parts(
        captioner: Arc<dyn Captioner>,
        classifier: Arc<dyn FoodClassifier>,
        recipe_writer: Arc<dyn RecipeWriter>,
        device: Device,
    ) -> Self {
        Self {
            captioner,
            classifier,
            recipe_writer,
            device,
        }
    }

    /// The resolved device, never `Auto`.
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn model_ids(&self) -> [(&'static str, String); 3] {
        [
            ("caption", self.captioner.model_id()),
            ("classifier", self.classifier.model_id()),
            ("recipe", self.recipe_writer.model_id()),
        ]
    }
}

async fn completion_provider(backend: RecipeBackend) -> Result<Box<dyn CompletionProvider + Send + Sync>> {
    let name = backend.to_string();
    let api_key = ProviderConfig::api_key(&name).ok_or_else(|| {
        VisionError::Config(format!(
            "No API key found for {}. Set {}_API_KEY in your environment.",
            name,
            name.to_uppercase()
        ))
    })?;
    let system_message = CHEF_SYSTEM_PROMPT.to_string();

    let provider: Box<dyn CompletionProvider + Send + Sync> = match backend {
        RecipeBackend::DeepSeek => Box::new(DeepSeekProvider::new(api_key, system_message).await.map_err(init_error)?),
        RecipeBackend::OpenAI => Box::new(OpenAIProvider::new(api_key, system_message).await.map_err(init_error)?),
        RecipeBackend::Gemini => Box::new(GeminiProvider::new(api_key, system_message).await.map_err(init_error)?),
        RecipeBackend::OpenRouter => {
            Box::new(OpenRouterProvider::new(api_key, system_message).await.map_err(init_error)?)
        }
        RecipeBackend::HuggingFace => {
            return Err(VisionError::Config(
                "huggingface is not a chat-completion backend".to_string(),
            ))
        }
    };

    tracing::info!(provider = provider.name(), "Recipe backend initialized");
    Ok(provider)
}

fn init_error(e: anyhow::Error) -> VisionError {
    VisionError::Config(format!("Failed to initialize recipe provider: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_with_hosted_backends() {
        let mut config = AppConfig::default();
        config.models.device = Device::Cpu;

        let manager = ModelManager::load(&config).await.unwrap();
        assert_eq!(manager.device(), Device::Cpu);

        let ids = manager.model_ids();
        assert_eq!(ids[0], ("caption", "Salesforce/blip-image-captioning-base".to_string()));
        assert_eq!(ids[2].1, "google/flan-t5-large");
    }

    #[tokio::test]
    async fn test_invalid_inference_url_is_config_error() {
        let mut config = AppConfig::default();
        config.models.inference_url = "not a url".to_string();

        assert!(matches!(
            ModelManager::load(&config).await,
            Err(VisionError::Config(_))
        ));
    }
}
