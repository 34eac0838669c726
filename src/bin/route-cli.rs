use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use route_engine::config::{build_tree, load_config, ConfigError};
use route_engine::server::dehydrate;
use route_engine::{MemoryHistory, Router};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Offline tools for route-engine manifests", long_about = None)]
struct Cli {
    /// Engine config file holding the [[routes]] manifest.
    #[arg(short, long, default_value = "route-engine.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an href and print the resulting matches
    Resolve {
        href: String,
        /// Report redirects instead of following them
        #[arg(long)]
        server: bool,
    },
    /// Print routes in match priority order
    Rank,
    /// Validate the config and manifest
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Value, Box<dyn std::error::Error>> {
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) if matches!(cli.command, Commands::Check) => {
            let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(format!("{} problem(s):\n  {}", errors.len(), errors.join("\n  ")).into());
        }
        Err(e) => return Err(e.into()),
    };
    let tree = build_tree(&config.routes)?;

    match cli.command {
        Commands::Check => Ok(json!({ "ok": true, "routes": tree.len() })),
        Commands::Rank => Ok(json!(tree
            .ranked()
            .map(|r| json!({ "rank": r.rank, "id": r.id.as_str(), "full_path": r.full_path }))
            .collect::<Vec<_>>())),
        Commands::Resolve { href, server } => {
            let mut options = config.router.to_options();
            options.is_server = server;
            let router = Router::with_history(tree, options, Arc::new(MemoryHistory::new(&href)));
            let outcome = router.load().await;
            let state = router.state();
            Ok(json!({
                "outcome": outcome.label(),
                "location": state.location.href,
                "status_code": state.status_code,
                "redirect": state.redirect.as_ref().and_then(|r| r.href.clone()),
                "state": dehydrate(&router),
            }))
        }
    }
}
