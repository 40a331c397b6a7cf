use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;
use std::path::PathBuf;

use recipe_vision::commands::{self, AnalyzeOptions};
use recipe_vision::config::AppConfig;
use recipe_vision::logging;
use recipe_vision::recipe::{DietaryPreference, Difficulty, RecipeRequest};

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn a food photo into a recipe", long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long = "server.port", global = true)]
    server_port: Option<u16>,

    #[arg(long = "server.address", global = true)]
    server_address: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web server (default)
    Serve,
    /// Generate a recipe for one image file
    Analyze {
        image: PathBuf,

        #[arg(long, default_value = "None")]
        diet: String,

        #[arg(long)]
        servings: Option<u32>,

        #[arg(long)]
        difficulty: Option<String>,

        /// Show the top 5 predictions instead of only the best one
        #[arg(long)]
        top_k: bool,

        /// Write the plain-text recipe to this file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the resolved configuration and device
    Check,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?
        .with_server_overrides(cli.server_address, cli.server_port)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            logging::init_server_logger();
            commands::handle_serve_command(config).await
        }
        Command::Analyze {
            image,
            diet,
            servings,
            difficulty,
            top_k,
            output,
            verbose,
        } => {
            logging::init_cli_logger(verbose);

            let mut request = RecipeRequest::from_settings(&config.recipe);
            request.dietary_preference = diet.parse::<DietaryPreference>()?;
            if let Some(servings) = servings {
                request.servings = servings;
            }
            if let Some(difficulty) = difficulty {
                request.difficulty = difficulty.parse::<Difficulty>()?;
            }
            request.show_top_k = top_k;

            commands::handle_analyze_command(
                &config,
                AnalyzeOptions {
                    image,
                    request,
                    output,
                },
            )
            .await
        }
        Command::Check => {
            logging::init_cli_logger(false);
            commands::handle_check_command(&config)
        }
    }
}
