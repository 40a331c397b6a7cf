use super::preferences::RecipeRequest;
use crate::config::APP_NAME;
use crate::food::NutritionFacts;

/// Plain-text rendition of a generated recipe, as offered for download.
pub fn format_recipe_text(
    dish: &str,
    caption: &str,
    recipe: &str,
    nutrition: Option<&NutritionFacts>,
    request: &RecipeRequest,
) -> String {
    let mut text = format!("{}\n{}\n\n", dish, "=".repeat(50));
    text.push_str(&format!("Servings: {}\n", request.servings));
    text.push_str(&format!("Difficulty: {}\n", request.difficulty));
    if request.dietary_preference.is_restricted() {
        text.push_str(&format!("Dietary: {}\n", request.dietary_preference));
    }
    text.push_str(&format!("\nImage Description: {}\n\n", caption));

    if let Some(nutrition) = nutrition {
        text.push_str(&format!("NUTRITIONAL INFORMATION ({}):\n", nutrition.basis()));
        text.push_str(&format!("- Calories: {}\n", nutrition.calories));
        text.push_str(&format!("- Protein: {}\n", nutrition.protein));
        text.push_str(&format!("- Carbs: {}\n", nutrition.carbs));
        text.push_str(&format!("- Fat: {}\n\n", nutrition.fat));
    }

    text.push_str(&format!("RECIPE:\n{}\n\n", recipe.trim_end()));
    text.push_str(&format!("---\nGenerated by {}\n", APP_NAME));
    text
}

/// Download name for a dish: `chicken wings` becomes `chicken_wings_recipe.txt`.
pub fn export_filename(dish: &str) -> String {
    let stem: String = dish
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    let stem = if stem.is_empty() { "dish".to_string() } else { stem };
    format!("{}_recipe.txt", stem)
}
