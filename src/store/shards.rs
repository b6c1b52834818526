//! Month-partitioned persistence of analysis results.
//!
//! Each month lives in `hr_analysis_<YYYY-MM>`; `hr_analysis_index` lists the
//! months that are safely published. A run writes every shard first and the
//! index last, so a failed shard write leaves the previous index in place.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{DocumentStore, get_typed, keys, put_typed};
use crate::error::{AppError, Result};
use crate::models::{AttendanceAnalysis, AttendanceStatus};

/// The `hr_analysis_index` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardIndex {
    /// Published months, ascending.
    pub months: Vec<String>,
}

/// What a publish wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub entries: usize,
    /// Months written by this run, ascending.
    pub months: Vec<String>,
}

impl PublishReport {
    pub fn summary(&self) -> String {
        format!(
            "Saved {} entries across {} month(s){}",
            self.entries,
            self.months.len(),
            if self.months.is_empty() {
                String::new()
            } else {
                format!(": {}", self.months.join(", "))
            }
        )
    }
}

/// Group analyses by `YYYY-MM`, dropping weekend entries. Input order is kept
/// within each month.
pub fn partition_by_month(analyses: &[AttendanceAnalysis]) -> BTreeMap<String, Vec<AttendanceAnalysis>> {
    let mut shards: BTreeMap<String, Vec<AttendanceAnalysis>> = BTreeMap::new();
    for analysis in analyses.iter().filter(|a| a.status != AttendanceStatus::Weekend) {
        shards.entry(analysis.month()).or_default().push(analysis.clone());
    }
    shards
}

pub async fn read_index<S: DocumentStore>(store: &S) -> Result<Option<ShardIndex>> {
    get_typed(store, keys::ANALYSIS_INDEX).await
}

/// Write one shard per month concurrently, then the index.
///
/// The index becomes the sorted union of the previously published months and
/// this run's months. If any shard write fails the index is not touched and
/// the run is reported as not saved.
pub async fn publish<S>(store: &Arc<S>, analyses: &[AttendanceAnalysis]) -> Result<PublishReport>
where
    S: DocumentStore + 'static,
{
    let shards = partition_by_month(analyses);
    let previous = read_index(store.as_ref()).await?.unwrap_or_default();

    let mut writes = JoinSet::new();
    for (month, entries) in &shards {
        let store = Arc::clone(store);
        let key = keys::analysis_shard(month);
        let document = serde_json::to_value(entries)?;
        writes.spawn(async move { store.put(&key, document).await.map_err(|e| (key, e)) });
    }

    let mut failures = Vec::new();
    while let Some(joined) = writes.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err((key, e))) => {
                warn!("Shard write {key} failed: {e}");
                failures.push(key);
            }
            Err(e) => {
                warn!("Shard write task failed: {e}");
                failures.push(format!("task ({e})"));
            }
        }
    }
    if !failures.is_empty() {
        failures.sort();
        return Err(AppError::store(format!(
            "Analysis not saved, failed shard writes: {}",
            failures.join(", ")
        )));
    }

    let months: BTreeSet<String> = previous
        .months
        .into_iter()
        .chain(shards.keys().cloned())
        .collect();
    let index = ShardIndex {
        months: months.into_iter().collect(),
    };
    put_typed(store.as_ref(), keys::ANALYSIS_INDEX, &index).await?;

    let report = PublishReport {
        entries: shards.values().map(Vec::len).sum(),
        months: shards.into_keys().collect(),
    };
    info!("{}", report.summary());
    Ok(report)
}

/// Every published analysis, in month order. Without an index, the legacy
/// unsharded document is read instead.
pub async fn load_all<S>(store: &Arc<S>) -> Result<Vec<AttendanceAnalysis>>
where
    S: DocumentStore + 'static,
{
    match read_index(store.as_ref()).await? {
        Some(index) => fetch_shards(store, index.months).await,
        None => load_legacy(store.as_ref()).await,
    }
}

/// Analyses of the requested months only. Months missing from the index yield nothing.
pub async fn load_months<S>(store: &Arc<S>, months: &[String]) -> Result<Vec<AttendanceAnalysis>>
where
    S: DocumentStore + 'static,
{
    let wanted: BTreeSet<&String> = months.iter().collect();

    match read_index(store.as_ref()).await? {
        Some(index) => {
            let published = index.months.into_iter().filter(|m| wanted.contains(m)).collect();
            fetch_shards(store, published).await
        }
        None => {
            let legacy = load_legacy(store.as_ref()).await?;
            Ok(legacy.into_iter().filter(|a| wanted.contains(&a.month())).collect())
        }
    }
}

async fn load_legacy<S: DocumentStore>(store: &S) -> Result<Vec<AttendanceAnalysis>> {
    let legacy: Vec<AttendanceAnalysis> = get_typed(store, keys::LEGACY_ANALYSIS).await?.unwrap_or_default();
    debug!("No shard index, read {} legacy entries", legacy.len());
    Ok(legacy
        .into_iter()
        .filter(|a| a.status != AttendanceStatus::Weekend)
        .collect())
}

/// Read shards concurrently and concatenate them in the given month order.
async fn fetch_shards<S>(store: &Arc<S>, months: Vec<String>) -> Result<Vec<AttendanceAnalysis>>
where
    S: DocumentStore + 'static,
{
    let mut reads = JoinSet::new();
    for (position, month) in months.into_iter().enumerate() {
        let store = Arc::clone(store);
        reads.spawn(async move {
            let key = keys::analysis_shard(&month);
            let shard: Option<Vec<AttendanceAnalysis>> = get_typed(store.as_ref(), &key).await?;
            if shard.is_none() {
                warn!("Index lists {month} but shard {key} is missing");
            }
            Ok::<_, AppError>((position, shard.unwrap_or_default()))
        });
    }

    let mut shards = Vec::new();
    while let Some(joined) = reads.join_next().await {
        let read = joined.map_err(|e| AppError::store(format!("Shard read task failed: {e}")))?;
        shards.push(read?);
    }
    shards.sort_by_key(|(position, _)| *position);
    Ok(shards.into_iter().flat_map(|(_, shard)| shard).collect())
}
