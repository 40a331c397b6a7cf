use crate::config::Secrets;

pub const USDA_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";

#[derive(Debug, Clone)]
pub struct FoodConfig {
    pub usda_api_key: Option<String>,
    pub usda_base_url: String,
}

impl FoodConfig {
    pub fn from_env() -> Self {
        Self {
            usda_api_key: std::env::var("USDA_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            usda_base_url: std::env::var("USDA_API_URL").unwrap_or_else(|_| USDA_BASE_URL.to_string()),
        }
    }

    pub fn from_secrets(secrets: &Secrets) -> Self {
        Self {
            usda_api_key: secrets.usda_api_key.clone(),
            ..Self::from_env()
        }
    }
}
