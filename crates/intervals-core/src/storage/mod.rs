mod catalog;
mod config;
pub mod database;
mod sessions;

pub use catalog::TrainingCatalog;
pub use config::{Config, DefaultsConfig, PlaybackConfig, PlaybackSettings, SoundFlags};
pub use database::Database;
pub use sessions::{session_updater, MemorySessionStore, SessionFilter, SessionStore, SessionTotals};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/intervals[-dev]/` based on INTERVALS_ENV.
///
/// Set INTERVALS_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("INTERVALS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("intervals-dev")
    } else {
        base_dir.join("intervals")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
