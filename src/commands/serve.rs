use anyhow::Result;
use colored::Colorize;

use crate::api::{self, AppState};
use crate::config::{AppConfig, APP_NAME};
use crate::pipeline::RecipePipeline;

pub async fn handle_command(config: AppConfig) -> Result<()> {
    let pipeline = RecipePipeline::load(&config).await?;

    if !config.server.headless {
        println!(
            "🍳 {} running at {}",
            APP_NAME.bright_cyan(),
            format!("http://localhost:{}", config.server.port).bright_green()
        );
    }

    api::serve(AppState::new(config, pipeline)).await?;
    Ok(())
}
