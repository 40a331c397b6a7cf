use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

#[cfg(feature = "usda")]
use crate::food::api::usda::UsdaClient;
use crate::food::config::FoodConfig;

/// Approximate macro nutrients; see [`NutritionFacts::basis`] for the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: String,
    pub protein: String,
    pub carbs: String,
    pub fat: String,
    pub source: NutritionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutritionSource {
    Table,
    Default,
    Usda,
}

impl NutritionFacts {
    pub fn new(calories: &str, protein: &str, carbs: &str, fat: &str) -> Self {
        Self {
            calories: calories.to_string(),
            protein: protein.to_string(),
            carbs: carbs.to_string(),
            fat: fat.to_string(),
            source: NutritionSource::Table,
        }
    }

    pub fn is_approximate(&self) -> bool {
        self.source == NutritionSource::Default
    }

    /// FoodData Central reports per 100 g; the table is per serving.
    pub fn basis(&self) -> &'static str {
        match self.source {
            NutritionSource::Usda => "per 100 g",
            NutritionSource::Table | NutritionSource::Default => "per serving",
        }
    }
}

lazy_static! {
    // Ordered: the first key contained in the dish name wins
    static ref NUTRITION_TABLE: Vec<(&'static str, NutritionFacts)> = vec![
        ("pizza", NutritionFacts::new("285", "12g", "36g", "10g")),
        ("burger", NutritionFacts::new("540", "25g", "40g", "27g")),
        ("salad", NutritionFacts::new("150", "5g", "15g", "8g")),
        ("pasta", NutritionFacts::new("350", "13g", "60g", "7g")),
        ("sushi", NutritionFacts::new("200", "9g", "30g", "6g")),
    ];
    static ref DEFAULT_NUTRITION: NutritionFacts = NutritionFacts {
        source: NutritionSource::Default,
        ..NutritionFacts::new("~300", "~15g", "~40g", "~12g")
    };
}

/// Static lookup: a case-insensitive substring match of a table key in the
/// dish name, otherwise the approximate default.
pub fn estimate_nutrition(dish: &str) -> NutritionFacts {
    let dish_lower = dish.to_lowercase();

    NUTRITION_TABLE
        .iter()
        .find(|(key, _)| dish_lower.contains(key))
        .map(|(_, facts)| facts.clone())
        .unwrap_or_else(|| DEFAULT_NUTRITION.clone())
}

#[async_trait]
pub trait NutritionEstimator: Send + Sync {
    async fn estimate(&self, dish: &str) -> NutritionFacts;

    /// Whether estimates may come from an online database.
    fn uses_api(&self) -> bool {
        false
    }
}

/// Static table by default; consults USDA FoodData Central first when an API
/// key is configured.
#[derive(Debug, Clone, Default)]
pub struct NutritionService {
    #[cfg(feature = "usda")]
    usda: Option<UsdaClient>,
}

impl NutritionService {
    pub fn new(config: &FoodConfig) -> Self {
        #[cfg(feature = "usda")]
        {
            let usda = UsdaClient::from_config(config);
            if usda.is_some() {
                tracing::info!("USDA nutrition lookup enabled");
            }
            Self { usda }
        }
        #[cfg(not(feature = "usda"))]
        {
            let _ = config;
            Self {}
        }
    }

    pub fn static_only() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NutritionEstimator for NutritionService {
    async fn estimate(&self, dish: &str) -> NutritionFacts {
        #[cfg(feature = "usda")]
        if let Some(usda) = &self.usda {
            match usda.search_food(dish).await {
                Ok(Some(facts)) => return facts,
                Ok(None) => tracing::debug!(dish, "No USDA match, using nutrition table"),
                Err(e) => tracing::warn!(dish, error = %e, "USDA lookup failed, using nutrition table"),
            }
        }
        estimate_nutrition(dish)
    }

    fn uses_api(&self) -> bool {
        #[cfg(feature = "usda")]
        {
            self.usda.is_some()
        }
        #[cfg(not(feature = "usda"))]
        {
            false
        }
    }
}
