use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "aula", about = "Video lesson platform: ingestion, transcripts, chat")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the aula server and its processing worker
    Serve(commands::serve::ServeArgs),
    /// Trigger re-processing of a lesson on a running server
    Process(commands::process::ProcessArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Process(args) => commands::process::run(args).await,
    }
}
