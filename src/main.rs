use anyhow::Result;
use clap::Parser;
use scam_predictor::cli::{Cli, Command};
use scam_predictor::commands::{self, classify::Input};
use scam_predictor::config::{AppConfig, LoggingConfig};
use scam_predictor::services::fetcher::FetchOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "scam_predictor={level},tower_http={level}",
            level = logging.level
        ))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.command.apply_overrides(&mut config);

    init_tracing(&config.logging)?;

    match cli.command {
        Command::Serve { .. } => {
            commands::serve::run(config).await?;
        }
        Command::Download {
            target,
            dir,
            skip_existing,
        } => {
            let summary =
                commands::download::run(&config, target, dir, FetchOptions { skip_existing }).await?;
            if !summary.all_succeeded() {
                std::process::exit(1);
            }
        }
        Command::Classify {
            text,
            file,
            cpu,
            json,
            ..
        } => {
            let input = match (text, file) {
                (Some(text), _) => Input::Text(text),
                (None, Some(path)) => Input::File(path),
                (None, None) => Input::Sample,
            };
            let prediction = commands::classify::run(&config.classifier, input, !cpu).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                println!("{}", commands::classify::verdict_line(&prediction));
            }
        }
    }

    Ok(())
}
