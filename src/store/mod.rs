//! Key/value document store and the month-sharded analysis layout on top of it.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

pub mod http;
pub mod json_dir;
pub mod memory;
pub mod postgres;
pub mod shards;

pub use http::HttpStore;
pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use shards::{PublishReport, ShardIndex};

/// Document keys.
pub mod keys {
    pub const RAW_RECORDS: &str = "hr_raw_records";
    pub const ABSENCES: &str = "hr_absences";
    pub const SETTINGS: &str = "hr_settings";
    pub const ANALYSIS_INDEX: &str = "hr_analysis_index";
    /// Unsharded results from older runs. Read-only.
    pub const LEGACY_ANALYSIS: &str = "hr_analysis_results";

    /// Shard key for a `YYYY-MM` month.
    pub fn analysis_shard(month: &str) -> String {
        format!("hr_analysis_{month}")
    }
}

/// External document store: JSON values addressed by string keys.
///
/// Futures are `Send` so callers can fan reads and writes out on the runtime.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when the key has never been written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Create or replace a document.
    fn put(&self, key: &str, document: Value) -> impl Future<Output = Result<()>> + Send;
}

/// Read and deserialize a typed document.
pub async fn get_typed<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: DocumentStore,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize and write a typed document.
pub async fn put_typed<S, T>(store: &S, key: &str, document: &T) -> Result<()>
where
    S: DocumentStore,
    T: Serialize + ?Sized,
{
    store.put(key, serde_json::to_value(document)?).await
}
