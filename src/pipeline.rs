use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{CacheKey, ResultCache};
use crate::config::{AppConfig, FeatureFlags, ImageLimits, RecipeSettings};
use crate::error::Result;
use crate::food::{FoodConfig, NutritionEstimator, NutritionFacts, NutritionService};
use crate::intake::{validate_image, ImageSummary, ValidatedImage};
use crate::models::{ModelManager, Prediction};
use crate::recipe::{export_filename, format_recipe_text, RecipePrompt, RecipeRequest};

pub const CAPTION_FALLBACK: &str = "Unable to generate caption";
pub const RECIPE_FALLBACK: &str = "Unable to generate recipe. Please try again.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResult {
    pub id: Uuid,
    pub dish: String,
    pub image: ImageSummary,
    pub caption: String,
    pub predictions: Vec<Prediction>,
    pub recipe: String,
    pub nutrition: Option<NutritionFacts>,
    pub request: RecipeRequest,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl RecipeResult {
    pub fn export_text(&self) -> String {
        format_recipe_text(
            &self.dish,
            &self.caption,
            &self.recipe,
            self.nutrition.as_ref(),
            &self.request,
        )
    }

    pub fn export_filename(&self) -> String {
        export_filename(&self.dish)
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Caption,
    Classify,
    Recipe,
    Nutrition,
    Done,
}

impl Stage {
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Caption => 25,
            Stage::Classify => 50,
            Stage::Recipe => 75,
            Stage::Nutrition => 90,
            Stage::Done => 100,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Stage::Caption => "Analyzing image...",
            Stage::Classify => "Detecting food items...",
            Stage::Recipe => "Generating recipe...",
            Stage::Nutrition => "Estimating nutrition...",
            Stage::Done => "Done",
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, stage: Stage);
}

/// Reports stages to the log only.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, stage: Stage) {
        tracing::debug!(percent = stage.percent(), "{}", stage.message());
    }
}

pub struct RecipePipeline {
    models: ModelManager,
    nutrition: Arc<dyn NutritionEstimator>,
    cache: ResultCache,
    limits: ImageLimits,
    settings: RecipeSettings,
    features: FeatureFlags,
    recipes_generated: AtomicUsize,
}

impl RecipePipeline {
    pub fn new(config: &AppConfig, models: ModelManager, nutrition: Arc<dyn NutritionEstimator>) -> Self {
        Self {
            models,
            nutrition,
            cache: ResultCache::new(&config.cache),
            limits: config.limits.clone(),
            settings: config.recipe.clone(),
            features: config.features.clone(),
            recipes_generated: AtomicUsize::new(0),
        }
    }

    /// Builds every model backend and the nutrition service from config.
    pub async fn load(config: &AppConfig) -> Result<Self> {
        let models = ModelManager::load(config).await?;
        let nutrition = NutritionService::new(&FoodConfig::from_secrets(&config.secrets));
        Ok(Self::new(config, models, Arc::new(nutrition)))
    }

    pub fn models(&self) -> &ModelManager {
        &self.models
    }

    pub fn nutrition_uses_api(&self) -> bool {
        self.nutrition.uses_api()
    }

    pub fn recipes_generated(&self) -> usize {
        self.recipes_generated.load(Ordering::Relaxed)
    }

    pub fn cached(&self, id: &Uuid) -> Option<Arc<RecipeResult>> {
        self.cache.get(id)
    }

    /// Validates raw upload bytes, then runs every stage.
    pub async fn analyze(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
        request: RecipeRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Arc<RecipeResult>> {
        let image = validate_image(bytes, filename, &self.limits)?;
        self.run(&image, request, progress).await
    }

    /// Runs caption, classification, recipe and nutrition for an already
    /// validated image. Model failures degrade to fallback values with a
    /// warning; only an invalid request is an error.
    pub async fn run(
        &self,
        image: &ValidatedImage,
        request: RecipeRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Arc<RecipeResult>> {
        request.check(&self.settings)?;

        let key = CacheKey {
            digest: image.digest().to_string(),
            request: request.clone(),
        };
        if let Some(result) = self.cache.lookup(&key) {
            tracing::info!(id = %result.id, "Serving recipe from cache");
            progress.report(Stage::Done);
            return Ok(result);
        }

        let mut warnings = Vec::new();

        progress.report(Stage::Caption);
        let caption = match self.models.captioner.caption(image).await {
            Ok(caption) => caption,
            Err(e) => {
                tracing::error!(error = %e, "Error generating caption");
                warnings.push(format!("Error generating caption: {}", e));
                CAPTION_FALLBACK.to_string()
            }
        };

        progress.report(Stage::Classify);
        let top_k = if self.features.top_k_predictions {
            request.top_k()
        } else {
            1
        };
        let predictions = match self.models.classifier.classify(image, top_k).await {
            Ok(predictions) if !predictions.is_empty() => rank(predictions, top_k),
            Ok(_) => {
                warnings.push("Error classifying food: no predictions".to_string());
                vec![Prediction::unknown()]
            }
            Err(e) => {
                tracing::error!(error = %e, "Error classifying food");
                warnings.push(format!("Error classifying food: {}", e));
                vec![Prediction::unknown()]
            }
        };
        let dish = predictions[0].label.clone();

        progress.report(Stage::Recipe);
        let prompt = RecipePrompt::new(dish.clone(), caption.clone(), request.clone());
        let recipe = match self.models.recipe_writer.write_recipe(&prompt).await {
            Ok(recipe) => recipe,
            Err(e) => {
                tracing::error!(error = %e, "Error generating recipe");
                warnings.push(format!("Error generating recipe: {}", e));
                RECIPE_FALLBACK.to_string()
            }
        };

        progress.report(Stage::Nutrition);
        let nutrition = if self.features.nutrition_estimates {
            Some(self.nutrition.estimate(&dish).await)
        } else {
            None
        };

        let result = Arc::new(RecipeResult {
            id: Uuid::new_v4(),
            dish,
            image: image.summary(),
            caption,
            predictions,
            recipe,
            nutrition,
            request,
            warnings,
            created_at: Utc::now(),
        });

        // Degraded results stay downloadable but a retry must rerun the models
        let total = if result.is_degraded() {
            self.cache.remember(Arc::clone(&result));
            self.recipes_generated()
        } else {
            self.cache.insert(key, Arc::clone(&result));
            self.recipes_generated.fetch_add(1, Ordering::Relaxed) + 1
        };
        progress.report(Stage::Done);

        tracing::info!(
            id = %result.id,
            dish = %result.dish,
            warnings = result.warnings.len(),
            recipes_generated = total,
            "Recipe generated"
        );
        Ok(result)
    }
}

fn rank(mut predictions: Vec<Prediction>, top_k: usize) -> Vec<Prediction> {
    predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    predictions.truncate(top_k.max(1));
    predictions
}
