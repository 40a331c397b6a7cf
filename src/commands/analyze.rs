use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::pipeline::{ProgressReporter, RecipePipeline, RecipeResult, Stage};
use crate::recipe::RecipeRequest;

pub struct AnalyzeOptions {
    pub image: PathBuf,
    pub request: RecipeRequest,
    pub output: Option<PathBuf>,
}

struct BarProgress(ProgressBar);

impl ProgressReporter for BarProgress {
    fn report(&self, stage: Stage) {
        self.0.set_position(stage.percent() as u64);
        self.0.set_message(stage.message());
    }
}

pub async fn handle_command(config: &AppConfig, options: AnalyzeOptions) -> Result<()> {
    let bytes = tokio::fs::read(&options.image)
        .await
        .with_context(|| format!("Failed to read image {}", options.image.display()))?;

    println!("🍳 Analyzing {}", options.image.display().to_string().bright_yellow());

    let pipeline = RecipePipeline::load(config).await?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("=> "),
    );
    let progress = BarProgress(pb);

    let filename = options.image.file_name().and_then(|n| n.to_str());
    let result = pipeline.analyze(&bytes, filename, options.request, &progress).await;
    progress.0.finish_and_clear();
    let result = result?;

    print_result(&result, config.features.top_k_predictions);

    if let Some(output) = options.output {
        write_export(&result, &output).await?;
    }
    Ok(())
}

fn print_result(result: &RecipeResult, show_top_k: bool) {
    println!("\n{}", "🎯 Food Detection Results".bright_cyan().bold());
    if show_top_k && result.request.show_top_k {
        for (idx, p) in result.predictions.iter().enumerate() {
            println!("  {}. {} ({:.1}%)", idx + 1, p.label.bright_yellow(), p.confidence_percent());
        }
    } else if let Some(p) = result.predictions.first() {
        println!("  {} ({:.1}%)", p.label.bright_yellow(), p.confidence_percent());
    }

    println!("\n{}", "📝 Image Description".bright_cyan().bold());
    println!("  {}", result.caption);
    println!("  Image Size: {} x {}", result.image.width, result.image.height);

    if let Some(n) = &result.nutrition {
        println!(
            "\n{}",
            format!("📊 Nutritional Information ({})", n.basis()).bright_cyan().bold()
        );
        println!("  Calories: {}", n.calories.bright_green());
        println!("  Protein:  {}", n.protein.bright_green());
        println!("  Carbs:    {}", n.carbs.bright_green());
        println!("  Fat:      {}", n.fat.bright_green());
        if n.is_approximate() {
            println!("  {}", "Approximate values".dimmed());
        }
    }

    println!("\n{}", format!("👨‍🍳 Recipe: {}", result.dish).bright_cyan().bold());
    println!(
        "  Servings: {} | Difficulty: {} | Dietary: {}",
        result.request.servings, result.request.difficulty, result.request.dietary_preference
    );
    println!("\n{}", result.recipe);

    for warning in &result.warnings {
        println!("{} {}", "⚠️".yellow(), warning.yellow());
    }
}

async fn write_export(result: &RecipeResult, output: &Path) -> Result<()> {
    let path = if output.is_dir() {
        output.join(result.export_filename())
    } else {
        output.to_path_buf()
    };

    tokio::fs::write(&path, result.export_text())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("\n💾 Recipe saved to {}", path.display().to_string().bright_green());
    Ok(())
}
