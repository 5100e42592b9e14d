//! Resolved startup plan.
//!
//! Turns a validated `EntrypointConfig` into the concrete commands each
//! phase will run. Building a plan has no side effects, so `entrypoint plan`
//! can show exactly what `entrypoint run` would do.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::{CommandsConfig, DependencyConfig, EntrypointConfig, ReadinessConfig, ServerConfig};
use crate::lifecycle::mode::ServerMode;
use crate::process::CommandSpec;

/// Administrator to provision, without the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminPlan {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartupPlan {
    /// Database first, then cache.
    pub dependencies: Vec<DependencyConfig>,
    pub readiness: ReadinessConfig,
    /// `makemigrations`, then `migrate`.
    pub migrations: Vec<CommandSpec>,
    pub collectstatic: CommandSpec,
    pub seed: Vec<CommandSpec>,
    pub admin: Option<AdminPlan>,
    pub mode: ServerMode,
    pub server: CommandSpec,
}

impl StartupPlan {
    pub fn from_config(config: &EntrypointConfig) -> Self {
        let commands = &config.commands;
        let mode = ServerMode::from_value(config.server.mode.as_deref());

        Self {
            dependencies: vec![
                config.dependencies.database.clone(),
                config.dependencies.cache.clone(),
            ],
            readiness: config.readiness.clone(),
            migrations: vec![
                manage_command(commands, &commands.makemigrations),
                manage_command(commands, &commands.migrate),
            ],
            collectstatic: manage_command(commands, &commands.collectstatic),
            seed: commands
                .seed
                .iter()
                .map(|args| manage_command(commands, args))
                .collect(),
            admin: config.admin.enabled.then(|| AdminPlan {
                username: config.admin.username.clone(),
                email: config.admin.email.clone(),
            }),
            mode,
            server: server_command(mode, &config.server, commands),
        }
    }

    /// Human-readable listing of every phase.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut n = 0;
        let mut line = |out: &mut String, text: String| {
            n += 1;
            let _ = writeln!(out, "{n:>2}. {text}");
        };

        let timeout = match self.readiness.timeout_secs {
            Some(secs) => format!("timeout {secs}s"),
            None => "no timeout".to_string(),
        };
        for dep in &self.dependencies {
            line(
                &mut out,
                format!(
                    "wait for {} at {} ({:?} backoff from {}ms, {timeout})",
                    dep.name,
                    dep.address(),
                    self.readiness.backoff,
                    self.readiness.interval_ms
                ),
            );
        }
        for spec in &self.migrations {
            line(&mut out, format!("run `{spec}`"));
        }
        line(&mut out, format!("run `{}`", self.collectstatic));
        for spec in &self.seed {
            line(&mut out, format!("run `{spec}`"));
        }
        match &self.admin {
            Some(admin) => line(
                &mut out,
                format!("ensure superuser '{}' <{}> exists", admin.username, admin.email),
            ),
            None => line(&mut out, "skip superuser provisioning".to_string()),
        }
        line(&mut out, format!("start {} server `{}`", self.mode, self.server));
        out
    }
}

fn working_dir(commands: &CommandsConfig) -> Option<PathBuf> {
    commands.working_dir.as_ref().map(PathBuf::from)
}

/// `python manage.py <args...>`.
pub fn manage_command(commands: &CommandsConfig, args: &[String]) -> CommandSpec {
    CommandSpec::new(&commands.python)
        .arg(&commands.manage_script)
        .args(args.iter().cloned())
        .working_dir(working_dir(commands))
}

/// The server invocation for `mode`.
pub fn server_command(mode: ServerMode, server: &ServerConfig, commands: &CommandsConfig) -> CommandSpec {
    match mode {
        ServerMode::Production => CommandSpec::new(&server.asgi_server)
            .args([
                "-b".to_string(),
                server.bind_host.clone(),
                "-p".to_string(),
                server.port.to_string(),
                server.asgi_application.clone(),
            ])
            .working_dir(working_dir(commands)),
        ServerMode::Development => manage_command(
            commands,
            &[
                server.dev_command.clone(),
                format!("{}:{}", server.bind_host, server.port),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with_mode(mode: Option<&str>) -> StartupPlan {
        let mut config = EntrypointConfig::default();
        config.server.mode = mode.map(String::from);
        StartupPlan::from_config(&config)
    }

    #[test]
    fn test_production_runs_asgi_server() {
        let plan = plan_with_mode(Some("production"));
        assert_eq!(plan.mode, ServerMode::Production);
        assert_eq!(plan.server.program, "daphne");
        assert_eq!(
            plan.server.args,
            vec!["-b", "0.0.0.0", "-p", "8000", "gh_notice_board.asgi:application"]
        );
    }

    #[test]
    fn test_other_modes_run_dev_server() {
        for mode in [None, Some(""), Some("development")] {
            let plan = plan_with_mode(mode);
            assert_eq!(plan.server.program, "python");
            assert_eq!(plan.server.args, vec!["manage.py", "runserver", "0.0.0.0:8000"]);
        }
    }

    #[test]
    fn test_management_commands_in_order() {
        let mut config = EntrypointConfig::default();
        config.commands.seed = vec![vec!["load_news".into()]];
        config.commands.working_dir = Some("/app".into());
        let plan = StartupPlan::from_config(&config);

        let lines: Vec<String> = plan
            .migrations
            .iter()
            .chain(std::iter::once(&plan.collectstatic))
            .chain(plan.seed.iter())
            .map(|c| c.command_line())
            .collect();
        assert_eq!(
            lines,
            vec![
                "python manage.py makemigrations",
                "python manage.py migrate --noinput",
                "python manage.py collectstatic --noinput",
                "python manage.py load_news",
            ]
        );
        assert_eq!(plan.collectstatic.working_dir, Some(PathBuf::from("/app")));
    }

    #[test]
    fn test_render_lists_every_phase_without_password() {
        let rendered = plan_with_mode(None).render();
        assert_eq!(rendered.lines().count(), 7);
        assert!(rendered.contains("wait for PostgreSQL at db:5432"));
        assert!(rendered.contains("start development server `python manage.py runserver 0.0.0.0:8000`"));
        assert!(!rendered.contains("admin123"));
    }

    #[test]
    fn test_json_plan_omits_secrets() {
        let json = serde_json::to_string(&plan_with_mode(Some("production"))).unwrap();
        assert!(json.contains("\"mode\":\"production\""));
        assert!(!json.contains("admin123"));
    }
}
