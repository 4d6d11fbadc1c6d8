use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use lineup_optimizer::config::OptimizerConfig;
use lineup_optimizer::display::{print_failure, print_lineup, write_lineup_to_file};
use lineup_optimizer::lineup::{OptimizationRequest, OptimizationResponse, Optimizer};
use lineup_optimizer::parser::load_pool;
use lineup_optimizer::provider::Slate;
use lineup_optimizer::web;

#[derive(Parser)]
#[command(name = "lineup-optimizer", about = "Salary-capped lineup optimizer")]
struct Cli {
    /// Optimizer configuration (TOML); defaults apply when absent
    #[arg(long, global = true, env = "LINEUP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build one lineup from a CSV pool and a JSON request
    Optimize {
        /// Player pool CSV
        #[arg(long)]
        pool: PathBuf,

        /// Optimization request JSON; defaults to the configured roster and cap
        #[arg(long)]
        request: Option<PathBuf>,

        /// Games in the slate, for auto stacks; inferred from the pool when omitted
        #[arg(long)]
        games: Option<u32>,

        /// Also write the lineup to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Serve the HTTP API
    Web {
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<OptimizerConfig> {
    match path {
        Some(path) => OptimizerConfig::load(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(OptimizerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,lineup_optimizer=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let optimizer = Optimizer::new(config);

    match cli.command {
        Command::Web { port } => {
            let password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set for web mode")?;
            info!(port, "starting web server");
            web::start_server(port, optimizer, password).await?;
        }
        Command::Optimize { pool, request, games, output } => {
            let request: OptimizationRequest = match request {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading request {}", path.display()))?;
                    serde_json::from_str(&raw).with_context(|| format!("parsing request {}", path.display()))?
                }
                None => OptimizationRequest::new("cli"),
            };

            let players = load_pool(&pool).with_context(|| format!("loading pool {}", pool.display()))?;
            let slate = Slate::new(players, games);

            let lineup = match optimizer.optimize(&request, &slate.players, Some(slate.games)) {
                Ok(lineup) => lineup,
                Err(e) => {
                    print_failure(&OptimizationResponse::failure(&e));
                    anyhow::bail!("no lineup produced ({})", e.kind());
                }
            };
            print_lineup(&lineup);

            if let Some(output) = output {
                let filename = output.to_string_lossy();
                write_lineup_to_file(&lineup, &filename).map_err(|e| anyhow::anyhow!("writing {}: {}", filename, e))?;
                println!("\nLineup saved to {}", filename);
            }
        }
    }

    Ok(())
}
