// ABOUTME: Entry point for the hill binary
// ABOUTME: Dispatches serve, daemon, and operator subcommands

use clap::{Parser, Subcommand};
use colored::*;
use hill_cli::ServeConfig;
use std::path::PathBuf;
use std::process;

mod cli;

use cli::daemon::DaemonArgs;
use cli::jobs::JobCommands;

#[derive(Parser)]
#[command(name = "hill")]
#[command(about = "Hill - job queue for robot fleets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control plane HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Directory holding the database and artifacts
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Run the execution daemon on this robot
    Daemon(DaemonArgs),
    #[command(flatten)]
    Jobs(JobCommands),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    hill_cli::init_tracing();

    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let mut config = ServeConfig::from_env()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            hill_cli::run_server(config).await
        }
        Commands::Daemon(args) => cli::daemon::run_daemon(args).await,
        Commands::Jobs(command) => cli::jobs::handle_job_command(command).await,
    }
}
