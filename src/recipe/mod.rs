pub mod export;
pub mod preferences;
pub mod prompt;

pub use export::{export_filename, format_recipe_text};
pub use preferences::{DietaryPreference, Difficulty, RecipeRequest};
pub use prompt::{RecipePrompt, CHEF_SYSTEM_PROMPT};
