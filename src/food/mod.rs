pub mod analysis;
#[cfg(feature = "usda")]
pub mod api;
pub mod config;

pub use analysis::nutrition::{
    estimate_nutrition, NutritionEstimator, NutritionFacts, NutritionService, NutritionSource,
};
pub use config::FoodConfig;
