//! Noticeboard container entrypoint.
//!
//! # Startup Sequence
//!
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌────────────────────────────┐
//!   │ wait db:5432 │──▶│ wait redis   │──▶│ makemigrations → migrate   │
//!   └──────────────┘   │   :6379      │   └─────────────┬──────────────┘
//!                      └──────────────┘                 ▼
//!   ┌──────────────────────────┐   ┌────────────┐   ┌────────────────┐
//!   │ daphne / runserver :8000 │◀──│ superuser  │◀──│ collectstatic  │
//!   │   (foreground, signals   │   │ if absent  │   │ (+ seed cmds)  │
//!   │    forwarded)            │   └────────────┘   └────────────────┘
//!   └──────────────────────────┘
//! ```
//!
//! The process exit code is the server's exit code, or the exit code of the
//! first step that failed.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use noticeboard_entrypoint::admin::ManagementShellStore;
use noticeboard_entrypoint::config::{resolve_config, ConfigError, EntrypointConfig};
use noticeboard_entrypoint::lifecycle::signals::spawn_signal_listener;
use noticeboard_entrypoint::lifecycle::{Orchestrator, Shutdown, StartupPlan, StdoutProgress};
use noticeboard_entrypoint::observability::init_logging;
use noticeboard_entrypoint::process::SystemRunner;

/// Exit code for unusable configuration.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "entrypoint")]
#[command(about = "Prepare the noticeboard container and start the application server", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long, env = "ENTRYPOINT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Server mode; overrides DJANGO_ENV. Only `production` selects the ASGI server.
    #[arg(long, global = true)]
    mode: Option<String>,

    /// Give up waiting for a dependency after this many seconds.
    #[arg(long, global = true)]
    wait_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full startup sequence (default)
    Run,
    /// Print the resolved startup sequence without running anything
    Plan {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Only wait for the database and cache
    Wait,
}

fn resolve(cli: &Cli) -> Result<EntrypointConfig, ConfigError> {
    resolve_config(
        cli.config.as_deref(),
        |key| std::env::var(key).ok(),
        |config| {
            if let Some(mode) = &cli.mode {
                config.server.mode = Some(mode.clone());
            }
            if let Some(secs) = cli.wait_timeout_secs {
                config.readiness.timeout_secs = Some(secs);
            }
        },
    )
}

async fn run(cli: Cli) -> i32 {
    let config = match resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("entrypoint: invalid configuration: {e}");
            return EXIT_CONFIG;
        }
    };

    init_logging(&config.observability);
    tracing::info!(
        config = ?cli.config,
        database = %config.dependencies.database.address(),
        cache = %config.dependencies.cache.address(),
        mode = ?config.server.mode,
        "Configuration loaded"
    );

    if let Some(Commands::Plan { json }) = &cli.command {
        let plan = StartupPlan::from_config(&config);
        if *json {
            match serde_json::to_string_pretty(&plan) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize plan");
                    return 1;
                }
            }
        } else {
            print!("{}", plan.render());
        }
        return 0;
    }

    let shutdown = Shutdown::new();
    if let Err(e) = spawn_signal_listener(shutdown.clone()) {
        tracing::warn!(error = %e, "Signal handlers unavailable");
    }

    let runner = Arc::new(SystemRunner::new());
    let admin_store = Arc::new(ManagementShellStore::new(
        runner.clone(),
        &config.commands,
        shutdown.token().clone(),
    ));
    let mut orchestrator = Orchestrator::new(
        &config,
        runner,
        admin_store,
        Arc::new(StdoutProgress),
        shutdown,
    );

    let result = match cli.command {
        Some(Commands::Wait) => orchestrator.wait_dependencies().await.map(|()| 0),
        _ => orchestrator.run().await,
    };

    match result {
        Ok(code) => {
            tracing::info!(exit_code = code, "Entrypoint finished");
            code
        }
        Err(e) => {
            tracing::error!(step = %e.step(), error = %e, "Startup failed");
            e.exit_code()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}
