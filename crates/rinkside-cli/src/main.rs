//! Rinkside CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::ApiClient;

#[derive(Parser)]
#[command(name = "rinkside")]
#[command(about = "Rinkside game pipeline CLI", long_about = None)]
struct Cli {
    /// API server URL
    #[arg(long, env = "RINKSIDE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse tracked games
    Games {
        #[command(subcommand)]
        command: GameCommands,
    },
    /// Inspect or drive the scheduler
    Scheduler {
        #[command(subcommand)]
        command: SchedulerCommands,
    },
    /// Validate a pipeline configuration
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "rinkside.kdl")]
        path: String,
    },
}

#[derive(Subcommand)]
enum GameCommands {
    /// List recent games
    List {
        /// Maximum number of games to show
        #[arg(long, default_value = "10")]
        limit: u32,
        /// Only games involving this team
        #[arg(long)]
        team: Option<String>,
    },
    /// Show one game
    Show {
        /// NHL game ID
        id: i64,
    },
    /// Show the stage plan for a game
    Stages {
        /// NHL game ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum SchedulerCommands {
    /// Show scheduler status
    Status,
    /// Run one tick now
    Tick,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::Games { command } => {
            let client = ApiClient::new(&cli.api_url)?;
            match command {
                GameCommands::List { limit, team } => {
                    commands::games::list(&client, limit, team).await?;
                }
                GameCommands::Show { id } => {
                    commands::games::show(&client, id).await?;
                }
                GameCommands::Stages { id } => {
                    commands::games::stages(&client, id).await?;
                }
            }
        }
        Commands::Scheduler { command } => {
            let client = ApiClient::new(&cli.api_url)?;
            match command {
                SchedulerCommands::Status => commands::scheduler::status(&client).await?,
                SchedulerCommands::Tick => commands::scheduler::tick(&client).await?,
            }
        }
    }

    Ok(())
}
