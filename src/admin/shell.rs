//! `AdminStore` backed by the framework's management shell.
//!
//! Account values travel through environment variables, never through the
//! script text, so nothing needs escaping and nothing secret shows up in the
//! process list.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::admin::store::{AdminAccount, AdminError, AdminStore};
use crate::config::CommandsConfig;
use crate::process::{CommandRunner, CommandSpec};

pub const USERNAME_VAR: &str = "ENTRYPOINT_ADMIN_USERNAME";
pub const EMAIL_VAR: &str = "ENTRYPOINT_ADMIN_EMAIL";
pub const PASSWORD_VAR: &str = "ENTRYPOINT_ADMIN_PASSWORD";

const PRESENT: &str = "present";
const ABSENT: &str = "absent";

const LOOKUP_SCRIPT: &str = "import os\n\
from django.contrib.auth import get_user_model\n\
User = get_user_model()\n\
print('present' if User.objects.filter(username=os.environ['ENTRYPOINT_ADMIN_USERNAME']).exists() else 'absent')\n";

const CREATE_SCRIPT: &str = "import os\n\
from django.contrib.auth import get_user_model\n\
User = get_user_model()\n\
User.objects.create_superuser(os.environ['ENTRYPOINT_ADMIN_USERNAME'], os.environ['ENTRYPOINT_ADMIN_EMAIL'], os.environ['ENTRYPOINT_ADMIN_PASSWORD'])\n";

/// Reaches the application's user table via `manage.py shell -c`.
pub struct ManagementShellStore {
    runner: Arc<dyn CommandRunner>,
    python: String,
    manage_script: String,
    working_dir: Option<PathBuf>,
    cancel: CancellationToken,
}

impl ManagementShellStore {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        commands: &CommandsConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runner,
            python: commands.python.clone(),
            manage_script: commands.manage_script.clone(),
            working_dir: commands.working_dir.as_ref().map(PathBuf::from),
            cancel,
        }
    }

    /// `python manage.py shell -c <script>`.
    pub fn shell_command(&self, script: &str) -> CommandSpec {
        CommandSpec::new(&self.python)
            .args([self.manage_script.as_str(), "shell", "-c", script])
            .working_dir(self.working_dir.clone())
    }

    pub fn lookup_command(&self, username: &str) -> CommandSpec {
        self.shell_command(LOOKUP_SCRIPT).env(USERNAME_VAR, username)
    }

    pub fn create_command(&self, account: &AdminAccount) -> CommandSpec {
        self.shell_command(CREATE_SCRIPT)
            .env(USERNAME_VAR, &account.username)
            .env(EMAIL_VAR, &account.email)
            .env(PASSWORD_VAR, &account.password)
    }
}

#[async_trait]
impl AdminStore for ManagementShellStore {
    async fn user_exists(&self, username: &str) -> Result<bool, AdminError> {
        let output = self
            .runner
            .run(&self.lookup_command(username), &self.cancel)
            .await?;
        if !output.success() {
            return Err(AdminError::CommandFailed {
                operation: "user lookup",
                exit_code: output.exit_code,
                stderr: output.stderr_tail(20),
            });
        }

        // The shell may print banners first; the verdict is the last line.
        match output.stdout.lines().map(str::trim).rfind(|l| !l.is_empty()) {
            Some(PRESENT) => Ok(true),
            Some(ABSENT) => Ok(false),
            _ => Err(AdminError::UnexpectedOutput(output.stdout)),
        }
    }

    async fn create_superuser(&self, account: &AdminAccount) -> Result<(), AdminError> {
        let output = self
            .runner
            .run(&self.create_command(account), &self.cancel)
            .await?;
        if !output.success() {
            return Err(AdminError::CommandFailed {
                operation: "superuser creation",
                exit_code: output.exit_code,
                stderr: output.stderr_tail(20),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::admin::store::{ensure_admin, AdminOutcome};
    use crate::config::AdminConfig;
    use crate::lifecycle::shutdown::Shutdown;
    use crate::process::{CommandOutput, ProcessError};

    /// Replays canned outputs and records what was asked.
    #[derive(Default)]
    struct ScriptedRunner {
        outputs: Mutex<VecDeque<CommandOutput>>,
        seen: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        fn with(outputs: Vec<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                seen: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            spec: &CommandSpec,
            _cancel: &CancellationToken,
        ) -> Result<CommandOutput, ProcessError> {
            self.seen.lock().unwrap().push(spec.clone());
            Ok(self.outputs.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn exec(&self, _spec: &CommandSpec, _shutdown: &Shutdown) -> Result<i32, ProcessError> {
            unreachable!("admin provisioning never launches a server")
        }
    }

    fn stdout(text: &str) -> CommandOutput {
        CommandOutput {
            stdout: text.into(),
            ..Default::default()
        }
    }

    fn store(runner: Arc<ScriptedRunner>) -> ManagementShellStore {
        ManagementShellStore::new(runner, &CommandsConfig::default(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_absent_user_is_created() {
        let runner = ScriptedRunner::with(vec![stdout("absent\n"), stdout("")]);
        let account = AdminAccount::from_config(&AdminConfig::default());

        let outcome = ensure_admin(&store(runner.clone()), &account).await.unwrap();
        assert_eq!(outcome, AdminOutcome::Created);

        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(&seen[1].args[..3], ["manage.py", "shell", "-c"]);
        assert!(seen[1].env.contains(&(PASSWORD_VAR.into(), "admin123".into())));
        assert!(!seen[1].command_line().contains("admin123"));
    }

    #[tokio::test]
    async fn test_present_user_is_left_alone() {
        let runner = ScriptedRunner::with(vec![stdout("42 objects imported.\npresent\n")]);
        let account = AdminAccount::from_config(&AdminConfig::default());

        let outcome = ensure_admin(&store(runner.clone()), &account).await.unwrap();
        assert_eq!(outcome, AdminOutcome::AlreadyExists);
        assert_eq!(runner.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_reports_exit_code() {
        let runner = ScriptedRunner::with(vec![CommandOutput {
            exit_code: 1,
            stderr: "django.db.utils.OperationalError".into(),
            ..Default::default()
        }]);

        let err = store(runner).user_exists("admin").await.unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("OperationalError"));
    }

    #[tokio::test]
    async fn test_garbled_lookup_output() {
        let runner = ScriptedRunner::with(vec![stdout("maybe\n")]);
        let err = store(runner).user_exists("admin").await.unwrap_err();
        assert!(matches!(err, AdminError::UnexpectedOutput(_)));
    }
}
