//! Trade intent and executed trade persistence

pub mod store;
pub mod sqlite;
pub mod memory;

pub use store::*;
pub use sqlite::*;
pub use memory::*;

use std::sync::Arc;
use tracing::warn;

use crate::config::Config;

/// Open the SQLite store, falling back to the ephemeral in-memory store when
/// the database cannot be opened. The fallback has identical read/write
/// semantics but loses everything on restart.
pub fn open_store(config: &Config) -> Arc<dyn TradeStore> {
    match SqliteStore::open(&config.database_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "⚠️ Could not open database at {}: {:#}. Using in-memory store (ephemeral)",
                config.database_path, e
            );
            Arc::new(MemoryStore::new())
        }
    }
}
