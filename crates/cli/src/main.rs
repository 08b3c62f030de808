mod commands;
mod confirm;
mod context;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::output::CommandStatus;
use commands::Selection;
use console::style;
use context::{GlobalArgs, Hub};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbhub")]
#[command(about = "Manage, probe and migrate many logical databases from one place")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered databases
    List,

    /// Probe connectivity of every database
    Health,

    /// Scan the clients directory
    Scan {
        /// Register usable clients
        #[arg(long)]
        register: bool,
    },

    /// Show resolved configuration of one database
    Info {
        name: String,
    },

    /// Migration management
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },

    /// Generate the client for one or all databases
    Generate {
        name: Option<String>,

        #[arg(long, conflicts_with = "name")]
        all: bool,
    },

    /// Push the schema without creating a migration
    Push {
        name: String,
    },

    /// Open the schema browser
    Studio {
        name: String,
    },

    /// Run seed scripts for one or all databases
    Seed {
        name: Option<String>,

        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Create a new placeholder migration
    Create {
        name: String,
        label: String,
    },

    /// Apply pending migrations
    Run {
        name: Option<String>,

        #[arg(long, conflicts_with = "name")]
        all: bool,

        /// Name of the migration to create while applying
        #[arg(long)]
        label: Option<String>,
    },

    /// Show migration status
    Status {
        name: String,
    },

    /// Drop, recreate and re-migrate a database
    Reset {
        name: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.json);

    match run(cli).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<CommandStatus> {
    let hub = Hub::open(&cli.global)?;

    // `scan` decides for itself whether to register.
    if !matches!(cli.command, Commands::Scan { .. }) {
        hub.register_discovered().await?;
    }

    let result = dispatch(&hub, cli.command).await;
    hub.close().await;
    result
}

async fn dispatch(hub: &Hub, command: Commands) -> anyhow::Result<CommandStatus> {
    match command {
        Commands::List => commands::list::run(hub),
        Commands::Health => commands::health::run(hub).await,
        Commands::Scan { register } => commands::scan::run(hub, register).await,
        Commands::Info { name } => commands::info::run(hub, &name),
        Commands::Migrate { migrate_command } => match migrate_command {
            MigrateCommands::Create { name, label } => {
                commands::migrate::create(hub, &name, &label)
            }
            MigrateCommands::Run { name, all, label } => {
                let selection = Selection::resolve(hub, name, all)?;
                commands::migrate::run(hub, selection, label.as_deref()).await
            }
            MigrateCommands::Status { name } => commands::migrate::status(hub, &name).await,
            MigrateCommands::Reset { name, force } => {
                commands::migrate::reset(hub, &name, force).await
            }
        },
        Commands::Generate { name, all } => {
            let selection = Selection::resolve(hub, name, all)?;
            commands::lifecycle::generate(hub, selection).await
        }
        Commands::Push { name } => commands::lifecycle::push(hub, &name).await,
        Commands::Studio { name } => commands::lifecycle::studio(hub, &name).await,
        Commands::Seed { name, all } => {
            let selection = Selection::resolve(hub, name, all)?;
            commands::lifecycle::seed(hub, selection).await
        }
    }
}

/// Log to stderr so stdout stays machine readable
fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
