use anyhow::Result;
use colored::Colorize;

use crate::config::{cuda_available, AppConfig, ProviderConfig, RecipeBackend, APP_NAME, APP_VERSION};

pub fn handle_command(config: &AppConfig) -> Result<()> {
    println!("{} {}", APP_NAME.bright_cyan().bold(), APP_VERSION);

    println!("\n{}", "⚙️  System".bright_cyan());
    println!("  Device (requested): {}", config.models.device.as_str());
    println!("  Device (resolved):  {}", config.models.device.resolve().as_str().bright_green());
    println!("  CUDA available:     {}", yes_no(cuda_available()));

    println!("\n{}", "🔑 Credentials".bright_cyan());
    println!("  HF_TOKEN:     {}", yes_no(config.secrets.hf_token.is_some()));
    println!("  USDA_API_KEY: {}", yes_no(config.secrets.usda_api_key.is_some()));
    if config.models.recipe_backend != RecipeBackend::HuggingFace {
        let name = config.models.recipe_backend.to_string();
        println!(
            "  {}_API_KEY: {}",
            name.to_uppercase(),
            yes_no(ProviderConfig::api_key(&name).is_some())
        );
    }

    println!("\n{}", "📄 Configuration".bright_cyan());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value {
        "yes".green()
    } else {
        "no".red()
    }
}
