//! # StudyTrack DB
//! Task store backends: the hosted Supabase (PostgREST) store used in
//! production and a SQLite store with the same tables.

pub mod sqlite;
pub mod supabase;

use studytrack_core::config::{StoreBackend, StoreConfig};
use studytrack_core::error::{Result, StudyTrackError};
use studytrack_core::traits::TaskStore;

/// Create a task store from configuration.
pub fn create_store(config: &StoreConfig) -> Result<Box<dyn TaskStore>> {
    match config.backend {
        StoreBackend::Supabase => {
            let url = config
                .supabase_url
                .as_deref()
                .ok_or_else(|| StudyTrackError::config("store.supabase_url is not set"))?;
            let key = config
                .supabase_service_key
                .as_deref()
                .ok_or_else(|| StudyTrackError::config("store.supabase_service_key is not set"))?;
            Ok(Box::new(supabase::SupabaseStore::new(url, key, config.timeout())?))
        }
        StoreBackend::Sqlite => Ok(Box::new(sqlite::SqliteStore::open(&config.sqlite_path())?)),
    }
}
