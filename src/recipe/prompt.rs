use super::preferences::RecipeRequest;

pub const CHEF_SYSTEM_PROMPT: &str =
    "You are a professional chef. You write clear, accurate recipes with exact measurements.";

/// Everything the recipe stage needs to write one recipe.
#[derive(Debug, Clone)]
pub struct RecipePrompt {
    pub dish: String,
    pub caption: String,
    pub request: RecipeRequest,
}

impl RecipePrompt {
    pub fn new(dish: impl Into<String>, caption: impl Into<String>, request: RecipeRequest) -> Self {
        Self {
            dish: dish.into(),
            caption: caption.into(),
            request,
        }
    }

    pub fn dietary_clause(&self) -> String {
        let pref = self.request.dietary_preference;
        if pref.is_restricted() {
            format!("The recipe must be {}. ", pref)
        } else {
            String::new()
        }
    }

    pub fn render(&self) -> String {
        format!(
            "You are a professional chef. Create a detailed recipe.\n\n\
             Dish: {}\n\
             Description: {}\n\
             {}Servings: {}\n\
             Difficulty: {}\n\n\
             Provide a complete recipe with:\n\
             1. Ingredients list (with exact measurements)\n\
             2. Step-by-step cooking instructions (numbered steps)\n\
             3. Preparation time and cooking time\n\
             4. Helpful tips and possible variations\n\n\
             Format the recipe in a clear, professional manner.",
            self.dish,
            self.caption,
            self.dietary_clause(),
            self.request.servings,
            self.request.difficulty,
        )
    }

    /// The rendered prompt cut after `max_tokens` whitespace-separated words.
    pub fn render_truncated(&self, max_tokens: usize) -> String {
        truncate_words(&self.render(), max_tokens).to_string()
    }
}

fn truncate_words(text: &str, max_words: usize) -> &str {
    let mut count = 0;
    let mut in_word = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word {
                in_word = false;
                if count == max_words {
                    return &text[..i];
                }
            }
        } else if !in_word {
            in_word = true;
            count += 1;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{DietaryPreference, Difficulty};

    fn prompt(pref: DietaryPreference) -> RecipePrompt {
        RecipePrompt::new(
            "pizza",
            "a pizza with cheese on a plate",
            RecipeRequest {
                dietary_preference: pref,
                servings: 2,
                difficulty: Difficulty::Easy,
                show_top_k: true,
            },
        )
    }

    #[test]
    fn test_prompt_without_dietary_clause() {
        let text = prompt(DietaryPreference::None).render();
        assert!(text.starts_with("You are a professional chef."));
        assert!(text.contains("Dish: pizza\n"));
        assert!(text.contains("Description: a pizza with cheese on a plate\nServings: 2\n"));
        assert!(text.contains("Difficulty: Easy"));
        assert!(!text.contains("The recipe must be"));
    }

    #[test]
    fn test_prompt_with_dietary_clause() {
        let text = prompt(DietaryPreference::GlutenFree).render();
        assert!(text.contains("The recipe must be Gluten-Free. Servings: 2"));
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        let p = prompt(DietaryPreference::None);
        let truncated = p.render_truncated(8);
        assert_eq!(truncated.split_whitespace().count(), 8);
        assert!(p.render().starts_with(&truncated));
        assert_eq!(p.render_truncated(10_000), p.render());
    }

    #[test]
    fn test_truncate_words_edges() {
        assert_eq!(truncate_words("one two three", 2), "one two");
        assert_eq!(truncate_words("  one  ", 1), "  one");
        assert_eq!(truncate_words("", 3), "");
    }
}
