use serde_json::Value;
use std::time::Duration;

use crate::error::{Result, VisionError};
use crate::food::analysis::nutrition::{NutritionFacts, NutritionSource};
use crate::food::config::FoodConfig;

#[derive(Debug, Clone)]
pub struct UsdaClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

const ENERGY: &str = "Energy";
const PROTEIN: &str = "Protein";
const CARBS: &str = "Carbohydrate, by difference";
const FAT: &str = "Total lipid (fat)";

impl UsdaClient {
    /// `None` when no API key is configured.
    pub fn from_config(config: &FoodConfig) -> Option<Self> {
        let api_key = config.usda_api_key.clone()?;
        Some(Self::new(api_key, config.usda_base_url.clone()))
    }

    pub fn new(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Looks up macro nutrients (per 100 g) for the closest matching food that
    /// reports kcal energy.
    pub async fn search_food(&self, query: &str) -> Result<Option<NutritionFacts>> {
        let url = format!("{}/foods/search", self.base_url);
        let query = query.replace('_', " ");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", query.as_str()),
                ("dataType", "Survey (FNDDS)"),
                ("pageSize", "10"),
            ])
            .send()
            .await
            .map_err(|e| VisionError::Nutrition(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            return Err(VisionError::Nutrition(format!(
                "API request failed with status: {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| VisionError::Nutrition(format!("Failed to parse response: {}", e)))?;

        let mut candidates: Vec<(f64, &Value)> = data
            .get("foods")
            .and_then(|f| f.as_array())
            .into_iter()
            .flatten()
            .filter_map(|food| {
                let description = food.get("description")?.as_str()?;
                Some((string_similarity(description, &query), food))
            })
            .collect();
        // Stable sort keeps API order among equal scores
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(candidates.into_iter().find_map(|(_, food)| nutrition_from_food(food)))
    }
}

fn nutrition_from_food(food: &Value) -> Option<NutritionFacts> {
    let nutrients = food.get("foodNutrients")?.as_array()?;

    let amount = |name: &str| {
        nutrients.iter().find_map(|nutrient| {
            let nutrient_name = nutrient.get("nutrientName")?.as_str()?;
            if nutrient_name != name {
                return None;
            }
            // Energy is reported in both kJ and kcal
            if name == ENERGY {
                let unit = nutrient.get("unitName").and_then(|u| u.as_str()).unwrap_or("");
                if !unit.eq_ignore_ascii_case("kcal") {
                    return None;
                }
            }
            nutrient.get("value")?.as_f64()
        })
    };

    let calories = amount(ENERGY)?;
    Some(NutritionFacts {
        calories: format!("{:.0}", calories),
        protein: format!("{:.0}g", amount(PROTEIN).unwrap_or(0.0)),
        carbs: format!("{:.0}g", amount(CARBS).unwrap_or(0.0)),
        fat: format!("{:.0}g", amount(FAT).unwrap_or(0.0)),
        source: NutritionSource::Usda,
    })
}

fn string_similarity(s1: &str, s2: &str) -> f64 {
    let s1_lower = s1.to_lowercase();
    let s2_lower = s2.to_lowercase();

    let s1_words: Vec<&str> = s1_lower
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .collect();
    let s2_words: Vec<&str> = s2_lower.split_whitespace().collect();

    let matches = s1_words.iter().filter(|w| s2_words.contains(w)).count();

    matches as f64 / s1_words.len().max(s2_words.len()).max(1) as f64
}
