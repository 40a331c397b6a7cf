use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::config::RecipeSettings;
use crate::error::{Result, VisionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DietaryPreference {
    None,
    Vegetarian,
    Vegan,
    #[serde(rename = "Gluten-Free")]
    GlutenFree,
    Keto,
    #[serde(rename = "Low-Carb")]
    LowCarb,
    #[serde(rename = "Dairy-Free")]
    DairyFree,
    Paleo,
    Halal,
    Kosher,
}

impl DietaryPreference {
    pub const ALL: [DietaryPreference; 10] = [
        DietaryPreference::None,
        DietaryPreference::Vegetarian,
        DietaryPreference::Vegan,
        DietaryPreference::GlutenFree,
        DietaryPreference::Keto,
        DietaryPreference::LowCarb,
        DietaryPreference::DairyFree,
        DietaryPreference::Paleo,
        DietaryPreference::Halal,
        DietaryPreference::Kosher,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DietaryPreference::None => "None",
            DietaryPreference::Vegetarian => "Vegetarian",
            DietaryPreference::Vegan => "Vegan",
            DietaryPreference::GlutenFree => "Gluten-Free",
            DietaryPreference::Keto => "Keto",
            DietaryPreference::LowCarb => "Low-Carb",
            DietaryPreference::DairyFree => "Dairy-Free",
            DietaryPreference::Paleo => "Paleo",
            DietaryPreference::Halal => "Halal",
            DietaryPreference::Kosher => "Kosher",
        }
    }

    pub fn is_restricted(&self) -> bool {
        *self != DietaryPreference::None
    }
}

impl Default for DietaryPreference {
    fn default() -> Self {
        DietaryPreference::None
    }
}

impl fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DietaryPreference {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        if wanted.is_empty() {
            return Ok(DietaryPreference::None);
        }
        DietaryPreference::ALL
            .iter()
            .copied()
            .find(|pref| normalize(pref.label()) == wanted)
            .ok_or_else(|| VisionError::InvalidRequest(format!("Unknown dietary preference: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(VisionError::InvalidRequest(format!("Unknown difficulty: {}", s))),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// User-chosen settings for one recipe generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct RecipeRequest {
    pub dietary_preference: DietaryPreference,
    #[validate(range(min = 1))]
    pub servings: u32,
    pub difficulty: Difficulty,
    pub show_top_k: bool,
}

impl Default for RecipeRequest {
    fn default() -> Self {
        Self {
            dietary_preference: DietaryPreference::None,
            servings: 4,
            difficulty: Difficulty::Medium,
            show_top_k: true,
        }
    }
}

impl RecipeRequest {
    pub fn from_settings(settings: &RecipeSettings) -> Self {
        Self {
            servings: settings.default_servings,
            difficulty: settings.default_difficulty,
            ..Self::default()
        }
    }

    /// Checks the request against the configured servings range and enabled
    /// dietary preferences.
    pub fn check(&self, settings: &RecipeSettings) -> Result<()> {
        self.validate()
            .map_err(|e| VisionError::InvalidRequest(e.to_string()))?;

        if self.servings < settings.min_servings || self.servings > settings.max_servings {
            return Err(VisionError::InvalidRequest(format!(
                "servings must be between {} and {}",
                settings.min_servings, settings.max_servings
            )));
        }
        if !settings.dietary_preferences.contains(&self.dietary_preference) {
            return Err(VisionError::InvalidRequest(format!(
                "Dietary preference {} is not enabled",
                self.dietary_preference
            )));
        }
        Ok(())
    }

    pub fn top_k(&self) -> usize {
        if self.show_top_k {
            5
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dietary_preference_variants() {
        assert_eq!("Gluten-Free".parse::<DietaryPreference>().unwrap(), DietaryPreference::GlutenFree);
        assert_eq!("gluten free".parse::<DietaryPreference>().unwrap(), DietaryPreference::GlutenFree);
        assert_eq!("low_carb".parse::<DietaryPreference>().unwrap(), DietaryPreference::LowCarb);
        assert_eq!("".parse::<DietaryPreference>().unwrap(), DietaryPreference::None);
        assert!("carnivore".parse::<DietaryPreference>().is_err());
    }

    #[test]
    fn test_dietary_preference_serde_uses_labels() {
        let json = serde_json::to_string(&DietaryPreference::DairyFree).unwrap();
        assert_eq!(json, "\"Dairy-Free\"");
        let parsed: DietaryPreference = serde_json::from_str("\"Low-Carb\"").unwrap();
        assert_eq!(parsed, DietaryPreference::LowCarb);
    }

    #[test]
    fn test_difficulty_parsing() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_request_servings_range() {
        let settings = RecipeSettings::default();
        let mut request = RecipeRequest::from_settings(&settings);
        assert!(request.check(&settings).is_ok());

        request.servings = 0;
        assert!(request.check(&settings).is_err());

        request.servings = 13;
        assert!(request.check(&settings).is_err());
    }

    #[test]
    fn test_disabled_preference_rejected() {
        let mut settings = RecipeSettings::default();
        settings.dietary_preferences = vec![DietaryPreference::None, DietaryPreference::Vegan];

        let request = RecipeRequest {
            dietary_preference: DietaryPreference::Kosher,
            ..RecipeRequest::default()
        };
        assert!(request.check(&settings).is_err());
    }

    #[test]
    fn test_top_k_follows_toggle() {
        let mut request = RecipeRequest::default();
        assert_eq!(request.top_k(), 5);
        request.show_top_k = false;
        assert_eq!(request.top_k(), 1);
    }
}
