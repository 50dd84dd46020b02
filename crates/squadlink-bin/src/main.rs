//! Squadlink - local service for the offline message outbox and session safety check-ins.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use squadlink_config_and_utils::{init_logging, Config, Paths};

/// Squadlink command-line interface.
#[derive(Parser)]
#[command(name = "squadlink")]
#[command(about = "Offline message outbox and session safety check-ins")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, store, logs). Defaults to ~/.squadlink
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service in the foreground until Ctrl-C
    Run,
    /// Inspect or manage the offline message queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Inspect session check-ins
    CheckIns {
        #[command(subcommand)]
        command: CheckInCommands,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Show queue counts and stuck messages
    Status,
    /// Drop every queued message
    Clear,
}

#[derive(Subcommand)]
enum CheckInCommands {
    /// List scheduled, active and past check-ins
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let foreground = matches!(cli.command, None | Some(Commands::Run));
    init_logging("squadlink", level, &paths, foreground);

    match cli.command {
        Some(Commands::Run) | None => {
            app::run_service(config, paths).await?;
        }
        Some(Commands::Queue { command }) => match command {
            QueueCommands::Status => app::queue_status(&config, &paths).await?,
            QueueCommands::Clear => app::queue_clear(&config, &paths).await?,
        },
        Some(Commands::CheckIns { command }) => match command {
            CheckInCommands::List => app::list_check_ins(&config, &paths).await?,
        },
    }

    Ok(())
}
