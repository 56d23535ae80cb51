use crate::commands::{run_score, run_seed_command, ScoreArgs, SeedArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use learnseed::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "learnseed-seeder",
    about = "Seed the learning activity catalog, score survey exports, or serve the catalog API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed surveys, activity types, and activities into the store
    Seed(SeedArgs),
    /// Score a CSV export of learner responses against a stored survey
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Snapshot store path (defaults to SEED_STORE_PATH)
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    /// Dataset directory used with --seed (defaults to the bundled dataset)
    #[arg(long)]
    pub(crate) dataset: Option<PathBuf>,
    /// Seed the store without resetting it before serving
    #[arg(long)]
    pub(crate) seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed(args) => run_seed_command(args),
        Command::Score(args) => run_score(args),
    }
}
