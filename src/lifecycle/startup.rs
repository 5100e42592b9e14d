//! Startup orchestration.
//!
//! # Responsibilities
//! - Wait for the database, then the cache
//! - Run migrations, static collection and seed commands
//! - Ensure the default administrator exists
//! - Launch the application server and return its exit code
//!
//! # Design Decisions
//! - Fail fast: any failing step is fatal and nothing after it runs
//! - Phases run in order, never concurrently
//! - The server starts last (traffic only when ready)
//! - Every step leaves a `StepReport` with its duration and exit code

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::admin::{ensure_admin, AdminAccount, AdminError, AdminOutcome, AdminStore};
use crate::config::EntrypointConfig;
use crate::lifecycle::mode::ServerMode;
use crate::lifecycle::plan::StartupPlan;
use crate::lifecycle::progress::ProgressSink;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::SIGINT;
use crate::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};
use crate::readiness::{wait_for, ReadinessError, WaitPolicy};

/// Lines of stderr kept in failure reports.
const STDERR_TAIL_LINES: usize = 20;

/// Exit code when a program cannot be started (shell convention).
const EXIT_NOT_FOUND: i32 = 127;

/// One phase of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    WaitDatabase,
    WaitCache,
    MakeMigrations,
    Migrate,
    CollectStatic,
    /// Index into the configured seed commands.
    Seed(usize),
    Admin,
    Server,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::WaitDatabase => f.write_str("wait-database"),
            Step::WaitCache => f.write_str("wait-cache"),
            Step::MakeMigrations => f.write_str("makemigrations"),
            Step::Migrate => f.write_str("migrate"),
            Step::CollectStatic => f.write_str("collectstatic"),
            Step::Seed(i) => write!(f, "seed[{i}]"),
            Step::Admin => f.write_str("admin"),
            Step::Server => f.write_str("server"),
        }
    }
}

/// Result of one completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub duration: Duration,
    /// `None` for steps that are not a single command (waits, admin).
    pub exit_code: Option<i32>,
}

/// Why the startup sequence stopped before the server exited on its own.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{step}: {source}")]
    Readiness {
        step: Step,
        #[source]
        source: ReadinessError,
    },

    #[error("{step} failed with exit code {exit_code}")]
    StepFailed {
        step: Step,
        exit_code: i32,
        stderr_tail: String,
    },

    #[error("{step}: {source}")]
    Process {
        step: Step,
        #[source]
        source: ProcessError,
    },

    #[error("{step}: {source}")]
    Admin {
        step: Step,
        #[source]
        source: AdminError,
    },

    #[error("{step} interrupted")]
    Cancelled { step: Step, signal: Option<i32> },
}

impl StartupError {
    /// Exit code for the entrypoint process.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::StepFailed { exit_code, .. } => *exit_code,
            StartupError::Process {
                source: ProcessError::Spawn { .. },
                ..
            } => EXIT_NOT_FOUND,
            StartupError::Admin { source, .. } => source.exit_code(),
            StartupError::Cancelled { signal, .. } => 128 + signal.unwrap_or(SIGINT),
            StartupError::Readiness { .. } | StartupError::Process { .. } => 1,
        }
    }

    pub fn step(&self) -> Step {
        match self {
            StartupError::Readiness { step, .. }
            | StartupError::StepFailed { step, .. }
            | StartupError::Process { step, .. }
            | StartupError::Admin { step, .. }
            | StartupError::Cancelled { step, .. } => *step,
        }
    }
}

/// Drives the startup sequence.
pub struct Orchestrator {
    plan: StartupPlan,
    wait_policy: WaitPolicy,
    admin_account: Option<AdminAccount>,
    runner: Arc<dyn CommandRunner>,
    admin_store: Arc<dyn AdminStore>,
    progress: Arc<dyn ProgressSink>,
    shutdown: Shutdown,
    reports: Vec<StepReport>,
}

impl Orchestrator {
    pub fn new(
        config: &EntrypointConfig,
        runner: Arc<dyn CommandRunner>,
        admin_store: Arc<dyn AdminStore>,
        progress: Arc<dyn ProgressSink>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            plan: StartupPlan::from_config(config),
            wait_policy: WaitPolicy::from_config(&config.readiness),
            admin_account: config
                .admin
                .enabled
                .then(|| AdminAccount::from_config(&config.admin)),
            runner,
            admin_store,
            progress,
            shutdown,
            reports: Vec::new(),
        }
    }

    /// Replace the readiness policy derived from config.
    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    pub fn plan(&self) -> &StartupPlan {
        &self.plan
    }

    /// Steps completed so far, in order.
    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }

    /// Run every phase and return the server's exit code.
    pub async fn run(&mut self) -> Result<i32, StartupError> {
        tracing::info!(mode = %self.plan.mode, "Startup sequence beginning");

        self.wait_dependencies().await?;
        self.prepare().await?;
        self.launch().await
    }

    /// Phases 1-2: block until both dependencies accept connections.
    pub async fn wait_dependencies(&mut self) -> Result<(), StartupError> {
        let dependencies = self.plan.dependencies.clone();
        for (dependency, step) in dependencies.iter().zip([Step::WaitDatabase, Step::WaitCache]) {
            tracing::info!(
                step = %step,
                dependency = %dependency.name,
                address = %dependency.address(),
                "Waiting for dependency"
            );

            let report = wait_for(dependency, &self.wait_policy, self.shutdown.token())
                .await
                .map_err(|source| match source {
                    ReadinessError::Cancelled { .. } => self.cancelled(step),
                    source => StartupError::Readiness { step, source },
                })?;

            self.record(step, report.elapsed, None);
            self.progress.message(&format!("{} started", dependency.name));
        }
        Ok(())
    }

    /// Phases 3-5: migrations, static files, seed commands, administrator.
    pub async fn prepare(&mut self) -> Result<(), StartupError> {
        self.progress.message("Running migrations...");
        let migrations = self.plan.migrations.clone();
        for (spec, step) in migrations.iter().zip([Step::MakeMigrations, Step::Migrate]) {
            self.run_step(step, spec).await?;
        }

        self.progress.message("Collecting static files...");
        let collectstatic = self.plan.collectstatic.clone();
        self.run_step(Step::CollectStatic, &collectstatic).await?;

        let seed = self.plan.seed.clone();
        for (i, spec) in seed.iter().enumerate() {
            self.run_step(Step::Seed(i), spec).await?;
        }

        self.provision_admin().await
    }

    async fn provision_admin(&mut self) -> Result<(), StartupError> {
        let Some(account) = self.admin_account.clone() else {
            tracing::info!("Administrator provisioning disabled");
            return Ok(());
        };

        self.progress.message("Creating superuser if not exists...");
        let started = Instant::now();
        let outcome = ensure_admin(self.admin_store.as_ref(), &account)
            .await
            .map_err(|source| match source {
                AdminError::Process(ProcessError::Cancelled { .. }) => self.cancelled(Step::Admin),
                source => {
                    tracing::error!(step = %Step::Admin, error = %source, "Step failed");
                    StartupError::Admin {
                        step: Step::Admin,
                        source,
                    }
                }
            })?;
        self.record(Step::Admin, started.elapsed(), None);

        self.progress.message(match outcome {
            AdminOutcome::Created => "Superuser created.",
            AdminOutcome::AlreadyExists => "Superuser already exists.",
        });
        Ok(())
    }

    /// Phase 6: run the server in the foreground until it exits.
    pub async fn launch(&mut self) -> Result<i32, StartupError> {
        if self.shutdown.is_triggered() {
            return Err(self.cancelled(Step::Server));
        }

        self.log_summary();
        self.progress.message("Starting Django server...");
        self.progress.message(match self.plan.mode {
            ServerMode::Production => "Starting production server...",
            ServerMode::Development => "Starting development server...",
        });

        let server = self.plan.server.clone();
        tracing::info!(mode = %self.plan.mode, command = %server, "Launching server");

        let started = Instant::now();
        let code = self
            .runner
            .exec(&server, &self.shutdown)
            .await
            .map_err(|source| StartupError::Process {
                step: Step::Server,
                source,
            })?;
        self.record(Step::Server, started.elapsed(), Some(code));
        Ok(code)
    }

    async fn run_step(&mut self, step: Step, spec: &CommandSpec) -> Result<CommandOutput, StartupError> {
        tracing::info!(step = %step, command = %spec, "Running step");

        let output = self
            .runner
            .run(spec, self.shutdown.token())
            .await
            .map_err(|source| match source {
                ProcessError::Cancelled { .. } => self.cancelled(step),
                source => {
                    tracing::error!(step = %step, error = %source, "Step could not run");
                    StartupError::Process { step, source }
                }
            })?;

        self.record(step, output.duration, Some(output.exit_code));

        if !output.success() {
            let stderr_tail = output.stderr_tail(STDERR_TAIL_LINES);
            tracing::error!(
                step = %step,
                exit_code = output.exit_code,
                stderr = %stderr_tail,
                "Step failed"
            );
            return Err(StartupError::StepFailed {
                step,
                exit_code: output.exit_code,
                stderr_tail,
            });
        }

        tracing::debug!(
            step = %step,
            elapsed_ms = output.duration.as_millis() as u64,
            "Step complete"
        );
        Ok(output)
    }

    fn cancelled(&self, step: Step) -> StartupError {
        let signal = self.shutdown.signal();
        tracing::warn!(step = %step, signal = ?signal, "Startup interrupted");
        StartupError::Cancelled { step, signal }
    }

    fn record(&mut self, step: Step, duration: Duration, exit_code: Option<i32>) {
        self.reports.push(StepReport {
            step,
            duration,
            exit_code,
        });
    }

    fn log_summary(&self) {
        let total: Duration = self.reports.iter().map(|r| r.duration).sum();
        for report in &self.reports {
            tracing::debug!(
                step = %report.step,
                elapsed_ms = report.duration.as_millis() as u64,
                exit_code = ?report.exit_code,
                "Step summary"
            );
        }
        tracing::info!(
            steps = self.reports.len(),
            elapsed_ms = total.as_millis() as u64,
            "Startup preparation complete"
        );
    }
}
