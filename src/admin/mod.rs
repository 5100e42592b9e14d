//! Default administrator provisioning.
//!
//! # Data Flow
//! ```text
//! ensure_admin(store, account)            (store.rs)
//!     → AdminStore::user_exists
//!     → AdminStore::create_superuser      (only when absent)
//!
//! ManagementShellStore                    (shell.rs)
//!     → manage.py shell -c <script>, values via environment
//! MemoryAdminStore                        (store.rs)
//!     → in-process map
//! ```

pub mod shell;
pub mod store;

pub use shell::ManagementShellStore;
pub use store::{ensure_admin, AdminAccount, AdminError, AdminOutcome, AdminStore, MemoryAdminStore};
