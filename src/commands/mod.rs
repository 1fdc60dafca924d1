pub mod actions;
pub mod events;
pub mod roster;
pub mod unavailable;

use std::sync::Arc;

use anyhow::{Context, Result};

use rota::config::Config;
use rota::lifecycle::RosterService;
use rota::storage::repository::create_sqlite_repository;

// Re-export command functions for convenience
pub use actions::{action, issue_token, redeem, ActionArgs};
pub use events::{add_event, bulk_confirm, delete_event, edit_event, wipe_month};
pub use roster::{check_config, generate, show};
pub use unavailable::{unavailable_add, unavailable_list, unavailable_remove, UnavailableArgs};

/// Open the SQLite store named in the configuration
pub fn open_service(config: Arc<Config>) -> Result<RosterService> {
    let path = config.storage.sqlite_path.clone();
    let repo = create_sqlite_repository(&path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    Ok(RosterService::new(config, repo))
}
