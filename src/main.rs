use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use zeptoplug::plugins::{ModuleDocument, ModuleExport, RemoteLoader};
use zeptoplug::Config;

#[derive(Parser)]
#[command(name = "zeptoplug")]
#[command(about = "Load remotely hosted plugin modules", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the configured remote plugins and list them
    Load {
        /// Config file (defaults to ~/.zeptoplug/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Call load() on every plugin after validation
        #[arg(long)]
        activate: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the exports of a JSON module document
    Inspect {
        /// Path to the module document
        path: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    match cli.command {
        Some(Commands::Version) | None => {
            println!("zeptoplug {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Load {
            config,
            activate,
            json,
        }) => {
            cmd_load(config, activate, json).await?;
        }
        Some(Commands::Inspect { path }) => {
            cmd_inspect(&path)?;
        }
    }

    Ok(())
}

async fn cmd_load(
    config_path: Option<PathBuf>,
    activate: bool,
    as_json: bool,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => {
            let mut config = Config::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => Config::load_or_default().context("Failed to load config")?,
    };

    let loader = RemoteLoader::from_config(&config.loader).context("Failed to build loader")?;
    let report = loader.load_with_report(Some(&config.remote_plugins)).await;

    if activate {
        for plugin in &report.plugins {
            if let Err(e) = plugin.load().await {
                warn!(plugin = %plugin.name(), error = %e, "Plugin failed to load");
            }
        }
    }

    if as_json {
        let plugins: Vec<_> = report
            .plugins
            .iter()
            .map(|p| {
                json!({
                    "name": p.name(),
                    "version": p.version(),
                    "type": p.plugin_type(),
                    "loaded": p.is_loaded(),
                })
            })
            .collect();
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|f| {
                json!({
                    "url": f.descriptor.url,
                    "libraryName": f.descriptor.library_name,
                    "error": f.error.to_string(),
                })
            })
            .collect();
        let output = json!({
            "plugins": plugins,
            "failures": failures,
            "skipped": report.skipped.len(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if report.plugins.is_empty() {
        println!("No plugins loaded.");
    }
    for plugin in &report.plugins {
        println!(
            "{:<24} {:<10} {:<12} {}",
            plugin.name(),
            plugin.version(),
            plugin.plugin_type(),
            if plugin.is_loaded() { "loaded" } else { "idle" }
        );
    }
    if !report.failures.is_empty() {
        println!("{} descriptor(s) failed, see warnings above.", report.failures.len());
    }

    Ok(())
}

fn cmd_inspect(path: &Path) -> anyhow::Result<()> {
    let source =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = ModuleDocument::parse(&source)?;

    if document.exports.is_empty() {
        println!("No exports.");
    }
    for (name, export) in &document.exports {
        match export {
            ModuleExport::Factory { plugins } => {
                let count = match plugins {
                    serde_json::Value::Array(entries) => entries.len(),
                    serde_json::Value::Object(_) => 1,
                    _ => 0,
                };
                println!("{:<24} factory ({} plugin(s))", name, count);
            }
            ModuleExport::Constant { value } => {
                println!("{:<24} value {}", name, value);
            }
        }
    }

    Ok(())
}
