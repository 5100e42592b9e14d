//! Administrator account provisioning.
//!
//! # Responsibilities
//! - Define the data-layer seam (`AdminStore`)
//! - Implement create-if-absent on top of it (`ensure_admin`)
//!
//! # Design Decisions
//! - Existence is checked by username only
//! - No locking: two concurrent entrypoints may both try to create; the
//!   store's own uniqueness constraint decides
//! - An existing account is never modified (password is not reset)

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AdminConfig;
use crate::process::ProcessError;

/// Credentials of the default administrator.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AdminAccount {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            username: config.username.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
        }
    }
}

impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What `ensure_admin` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Created,
    AlreadyExists,
}

/// Errors raised by an `AdminStore`.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The management command ran but reported failure.
    #[error("{operation} failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        operation: &'static str,
        exit_code: i32,
        stderr: String,
    },

    /// The management command printed something unexpected.
    #[error("unexpected lookup output: {0:?}")]
    UnexpectedOutput(String),

    #[error("user '{0}' already exists")]
    Duplicate(String),
}

impl AdminError {
    /// Exit code to terminate with when provisioning fails.
    pub fn exit_code(&self) -> i32 {
        match self {
            AdminError::CommandFailed { exit_code, .. } => *exit_code,
            _ => 1,
        }
    }
}

/// Data-layer operations needed to provision the administrator.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Whether a user with this username exists.
    async fn user_exists(&self, username: &str) -> Result<bool, AdminError>;

    /// Create a superuser. Fails if the username is taken.
    async fn create_superuser(&self, account: &AdminAccount) -> Result<(), AdminError>;
}

/// Create the administrator unless a user with that username exists.
pub async fn ensure_admin(
    store: &dyn AdminStore,
    account: &AdminAccount,
) -> Result<AdminOutcome, AdminError> {
    if store.user_exists(&account.username).await? {
        tracing::info!(username = %account.username, "Administrator already present");
        return Ok(AdminOutcome::AlreadyExists);
    }

    store.create_superuser(account).await?;
    tracing::info!(
        username = %account.username,
        email = %account.email,
        "Administrator created"
    );
    Ok(AdminOutcome::Created)
}

/// In-process store keyed by username.
#[derive(Debug, Default)]
pub struct MemoryAdminStore {
    users: Mutex<HashMap<String, AdminAccount>>,
}

impl MemoryAdminStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, username: &str) -> Option<AdminAccount> {
        self.users.lock().ok()?.get(username).cloned()
    }
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn user_exists(&self, username: &str) -> Result<bool, AdminError> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.contains_key(username))
    }

    async fn create_superuser(&self, account: &AdminAccount) -> Result<(), AdminError> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        if users.contains_key(&account.username) {
            return Err(AdminError::Duplicate(account.username.clone()));
        }
        users.insert(account.username.clone(), account.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_account() -> AdminAccount {
        AdminAccount::from_config(&AdminConfig::default())
    }

    #[tokio::test]
    async fn test_creates_when_absent() {
        let store = MemoryAdminStore::new();
        let outcome = ensure_admin(&store, &default_account()).await.unwrap();
        assert_eq!(outcome, AdminOutcome::Created);

        let stored = store.get("admin").unwrap();
        assert_eq!(stored.email, "admin@ghnoticeboard.com");
        assert_eq!(stored.password, "admin123");
    }

    #[tokio::test]
    async fn test_twice_leaves_one_admin() {
        let store = MemoryAdminStore::new();
        let account = default_account();

        assert_eq!(ensure_admin(&store, &account).await.unwrap(), AdminOutcome::Created);
        assert_eq!(
            ensure_admin(&store, &account).await.unwrap(),
            AdminOutcome::AlreadyExists
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_account_is_untouched() {
        let store = MemoryAdminStore::new();
        let mut original = default_account();
        original.password = "changed-by-operator".into();
        store.create_superuser(&original).await.unwrap();

        ensure_admin(&store, &default_account()).await.unwrap();
        assert_eq!(store.get("admin").unwrap().password, "changed-by-operator");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", default_account());
        assert!(!rendered.contains("admin123"));
    }
}
