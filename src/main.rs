//! Command-line front end for the translation service.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use babelcache::translate::http::HttpTranslationClient;
use babelcache::translate::local::LocalDetector;
use babelcache::{AppContext, LanguageDetector, Settings, TextTranslator};

#[derive(Parser, Debug)]
#[command(name = "babelcache")]
#[command(about = "Cached language detection and translation")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate TEXT and print the result as JSON
    Translate {
        text: String,

        /// Target language (defaults to the configured default)
        #[arg(long)]
        to: Option<String>,

        /// Source language; detected when omitted
        #[arg(long)]
        from: Option<String>,

        /// Detect the source language locally instead of over HTTP
        #[arg(long)]
        offline_detect: bool,
    },
    /// Print the configured cache, retry and stats limits as JSON
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    babelcache::init_tracing(cli.json_logs);

    let settings = Settings::load().context("loading configuration")?;

    match cli.command {
        Command::Translate {
            text,
            to,
            from,
            offline_detect,
        } => {
            let client = Arc::new(HttpTranslationClient::new(&settings)?);
            let detector: Arc<dyn LanguageDetector> = if offline_detect {
                Arc::new(LocalDetector)
            } else {
                Arc::clone(&client) as Arc<dyn LanguageDetector>
            };
            let translator: Arc<dyn TextTranslator> = client;

            let ctx = AppContext::start(&settings, detector, translator);
            let target = to.unwrap_or_else(|| ctx.service.default_target_language().to_string());
            let outcome = ctx.service.translate(&text, &target, from.as_deref()).await;
            ctx.shutdown().await;

            let result = outcome?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Stats => {
            let report = serde_json::json!({ "configuration": settings.limits() });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
