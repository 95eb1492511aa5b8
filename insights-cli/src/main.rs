//! chatgpt-insights: analyze a ChatGPT data export and write an HTML and PDF report.
//!
//! ```text
//! chatgpt-insights <export.zip> [-r] [--api-key KEY] [-c FILE] [-o DIR] [--json]
//! ```

mod credentials;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use insights_core::{create_model, InsightsConfig};
use insights_engine::{InsightsPipeline, OutputMode, RunOutput};

use credentials::{prompt_for_key, resolve_api_key, KeyStore};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "chatgpt-insights",
    version,
    about = "Analyze ChatGPT conversation exports"
)]
struct Cli {
    /// Path to the ChatGPT export zip file
    filepath: PathBuf,

    /// Force regenerate the stored OpenAI API key
    #[arg(short = 'r', long)]
    regenerate_key: bool,

    /// OpenAI API key (skips the key file)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Config file (TOML); missing file means defaults
    #[arg(short, long, default_value = "chatgpt-insights.toml")]
    config: String,

    /// Directory for the HTML and PDF report (overrides output.directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match InsightsConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), &config.service.log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, config).await {
        eprintln!("Error processing file: {:#}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins when set; otherwise `service.log_level`, which may hold
/// full directives such as `debug,hyper=warn`.
fn log_filter(rust_log: Option<&str>, configured: &str) -> EnvFilter {
    if let Some(filter) = rust_log
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
    {
        return filter;
    }
    EnvFilter::try_new(configured).unwrap_or_else(|e| {
        eprintln!("Invalid service.log_level {:?}: {}, using info", configured, e);
        EnvFilter::new("info")
    })
}

async fn run(cli: Cli, config: InsightsConfig) -> anyhow::Result<()> {
    let store = KeyStore::new(&config.credentials.key_file);
    let explicit = cli.api_key.clone();
    let regenerate = cli.regenerate_key;
    let api_key = tokio::task::spawn_blocking(move || {
        resolve_api_key(explicit, &store, regenerate, prompt_for_key)
    })
    .await
    .context("API key prompt panicked")??;

    let model = create_model(&config.model, api_key).context("creating model client")?;

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde(&config.output.directory).into_owned()));

    let pipeline = InsightsPipeline::new(Arc::from(model), config);
    let output = pipeline
        .run(&cli.filepath, OutputMode::Directory(output_dir))
        .await?;

    print_summary(&output, cli.json)
}

fn print_summary(output: &RunOutput, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&output.report)?);
        return Ok(());
    }

    println!("Hi {}!", output.report.user_name);
    println!(
        "Analyzed {} conversations.",
        output.report.user_analysis.overview.total_chats
    );
    if let Some(written) = &output.written {
        println!("HTML report: {}", written.html_path.display());
        println!("PDF report:  {}", written.pdf_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_filepath_and_flags() {
        let cli = Cli::try_parse_from([
            "chatgpt-insights",
            "export.zip",
            "-r",
            "--output-dir",
            "/tmp/reports",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.filepath, PathBuf::from("export.zip"));
        assert!(cli.regenerate_key);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/reports")));
        assert!(cli.json);
        assert_eq!(cli.config, "chatgpt-insights.toml");
    }

    #[test]
    fn test_rust_log_overrides_configured_level() {
        let filter = log_filter(Some("debug"), "info");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_configured_directives_used_without_rust_log() {
        let filter = log_filter(None, "debug,hyper=warn").to_string();
        assert!(filter.contains("hyper=warn"), "got {filter}");
        assert!(filter.contains("debug"), "got {filter}");

        assert_eq!(log_filter(Some("  "), "warn").to_string(), "warn");
    }

    #[test]
    fn test_invalid_configured_level_falls_back_to_info() {
        assert_eq!(log_filter(None, "hyper=loud").to_string(), "info");
    }

    #[test]
    fn test_filepath_is_required() {
        assert!(Cli::try_parse_from(["chatgpt-insights"]).is_err());
    }
}
