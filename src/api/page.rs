use crate::config::{AppConfig, APP_NAME};

const SCRIPT: &str = r#"
const form = document.getElementById('recipe-form');
const status = document.getElementById('status');
const output = document.getElementById('result');

form.addEventListener('submit', async (event) => {
  event.preventDefault();
  status.textContent = 'Analyzing image...';
  output.innerHTML = '';
  const data = new FormData(form);
  if (!data.has('show_top_k')) data.append('show_top_k', 'false');
  try {
    const response = await fetch('/api/recipes', { method: 'POST', body: data });
    const body = await response.json();
    if (!response.ok) {
      status.textContent = body.status;
      return;
    }
    status.textContent = '';
    render(body);
  } catch (err) {
    status.textContent = 'An error occurred during processing: ' + err;
  }
});

function render(result) {
  const section = (title, text) => {
    const h = document.createElement('h3');
    h.textContent = title;
    output.appendChild(h);
    if (text !== undefined) {
      const p = document.createElement('pre');
      p.textContent = text;
      output.appendChild(p);
    }
  };
  section('Food Detection Results');
  const list = document.createElement('ol');
  for (const p of result.predictions) {
    const li = document.createElement('li');
    li.textContent = p.label + ' (' + (p.confidence * 100).toFixed(1) + '%)';
    list.appendChild(li);
  }
  output.appendChild(list);
  section('Image Description', result.caption +
    '\nImage Size: ' + result.image.width + ' x ' + result.image.height);
  if (result.nutrition) {
    const n = result.nutrition;
    const basis = n.source === 'usda' ? 'per 100 g' : 'per serving';
    section('Nutritional Information (' + basis + ')',
      'Calories: ' + n.calories + '\nProtein: ' + n.protein + '\nCarbs: ' + n.carbs + '\nFat: ' + n.fat);
  }
  section('Recipe: ' + result.dish, result.recipe);
  for (const w of result.warnings) section('Warning', w);
  if (result.export_url) {
    const a = document.createElement('a');
    a.href = result.export_url;
    a.textContent = 'Download Recipe';
    output.appendChild(a);
  }
}
"#;

/// The single landing page: upload form, recipe settings and a short
/// explanation of the pipeline.
pub fn render(config: &AppConfig) -> String {
    let theme = &config.theme;
    let recipe = &config.recipe;
    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{name}</title>
<style>
body {{ background: {bg}; color: {text}; font-family: sans-serif; max-width: 960px; margin: 0 auto; padding: 2rem; }}
h1, h3 {{ color: {primary}; }}
aside, form {{ background: {bg2}; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }}
button {{ background: {primary}; color: {text}; border: 0; padding: 0.6rem 1.2rem; border-radius: 6px; }}
pre {{ white-space: pre-wrap; }}
a {{ color: {secondary}; }}
</style>
</head>
<body>
<h1>{name}</h1>
<p>Upload a food image and get a recipe.</p>
<form id="recipe-form">
<label>Upload Food Image <input type="file" name="image" accept="{accept}" required></label><br>
<label>Dietary Preference <select name="dietary_preference">"#,
        name = APP_NAME,
        bg = theme.background_color,
        bg2 = theme.secondary_background_color,
        text = theme.text_color,
        primary = theme.primary_color,
        secondary = theme.secondary_color,
        accept = accept_list(&config.limits.allowed_formats),
    );

    for pref in &recipe.dietary_preferences {
        html.push_str(&format!(r#"<option value="{0}">{0}</option>"#, pref));
    }
    html.push_str(&format!(
        r#"</select></label><br>
<label>Number of Servings <input type="number" name="servings" min="{min}" max="{max}" value="{default}"></label><br>
<label>Difficulty Level <select name="difficulty">"#,
        min = recipe.min_servings,
        max = recipe.max_servings,
        default = recipe.default_servings,
    ));

    for level in crate::recipe::Difficulty::ALL {
        let selected = if level == recipe.default_difficulty { " selected" } else { "" };
        html.push_str(&format!(r#"<option value="{0}"{1}>{0}</option>"#, level, selected));
    }
    html.push_str("</select></label><br>");

    if config.features.top_k_predictions {
        html.push_str(
            r#"<label><input type="checkbox" name="show_top_k" value="true" checked> Show top 5 predictions</label><br>"#,
        );
    }

    html.push_str(&format!(
        r#"<button type="submit">Generate Recipe</button>
</form>
<aside>
<h3>How it works</h3>
<ol>
<li>Upload a food image</li>
<li>AI analyzes and identifies the dish</li>
<li>Get a detailed recipe with instructions</li>
<li>Download or save your recipe</li>
</ol>
</aside>
<p id="status"></p>
<div id="result"></div>
<script>{script}</script>
</body>
</html>
"#,
        script = SCRIPT,
    ));
    html
}

fn accept_list(formats: &[String]) -> String {
    formats
        .iter()
        .map(|f| format!(".{}", f.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join(",")
}
