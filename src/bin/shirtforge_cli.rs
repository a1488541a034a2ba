//! ShirtForge CLI
//!
//! Usage: shirtforge-cli [-p N] "<idea>"
//! Outputs the JSON run report to stdout.
//! Exit codes: 0 full success, 1 run aborted, 2 when any concept was
//! skipped or failed.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shirtforge_core::{
    BlockTextRenderer, GithubPublisher, OpenAiGenerator, PipelineConfig, PipelineSettings,
    PrintifyMarketplace, ProductPipeline,
};

#[derive(Parser)]
#[command(name = "shirtforge-cli")]
#[command(about = "ShirtForge - generate, render, host, and list t-shirt designs")]
struct Cli {
    /// The idea to generate patterns for
    idea: String,

    /// Number of patterns
    #[arg(short = 'p', long = "patterns", default_value_t = 3)]
    patterns: usize,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shirtforge_core=info,shirtforge_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match PipelineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!(r#"{{"success": false, "error": "{}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };

    let settings = PipelineSettings {
        output_root: config.output_dir.clone(),
        ..PipelineSettings::default()
    };

    let pipeline = ProductPipeline::new(
        Box::new(OpenAiGenerator::new(&config.api_key)),
        Box::new(BlockTextRenderer::new()),
        Box::new(GithubPublisher::new(
            &config.upload_repository,
            &config.upload_credential,
            &config.upload_url_prefix,
        )),
        Box::new(PrintifyMarketplace::new(
            &config.marketplace_api_key,
            &config.marketplace_shop_id,
        )),
        settings,
    );

    match pipeline.run(&cli.idea, cli.patterns) {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
            if report.all_published() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2) // Some concepts did not make it to a listing
            }
        }
        Err(e) => {
            let output = serde_json::json!({
                "success": false,
                "error": e.to_string(),
            });
            println!("{}", serde_json::to_string(&output).unwrap());
            ExitCode::FAILURE
        }
    }
}
