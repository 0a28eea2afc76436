//! Storage contract for profiler results
//!
//! A `ResultStorage` persists profiling sessions keyed by id and tracks a
//! per-user unviewed flag:
//! - `save` (re)sets the result to unviewed for its owning user
//! - `load` marks it viewed for its owning user
//! - `list` pages ids by start timestamp, never observing a partial write
//!
//! Backends: `MemoryStorage` (reference, in-process) and `PostgresStorage`.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProfStoreError;
use crate::models::ProfilerResult;

/// Sort order for `list`, applied to the result's start timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    Ascending,
    #[default]
    Descending,
}

/// Persistence of profiler results with per-user viewed-state tracking.
///
/// Implementations must be safe for concurrent callers and keep the
/// compound effects of `save` and `load` atomic: a concurrent `list` never
/// sees a result mid-write, and the viewed-state change lands together
/// with the result read/write it belongs to.
#[async_trait]
pub trait ResultStorage: Send + Sync {
    /// Ids of stored results whose `started_at` falls inside the optional
    /// inclusive `[start, finish]` range, ordered per `order`, at most
    /// `max_results` of them. No side effects.
    ///
    /// Fails with `InvalidArgument` when `max_results` is zero or `start`
    /// is after `finish`.
    async fn list(
        &self,
        max_results: u32,
        start: Option<DateTime<Utc>>,
        finish: Option<DateTime<Utc>>,
        order: ListOrder,
    ) -> Result<Vec<Uuid>, ProfStoreError>;

    /// Insert or overwrite `result` under its id, and atomically (re)set
    /// it to unviewed for `result.user`. Idempotent on id.
    async fn save(&self, result: &ProfilerResult) -> Result<(), ProfStoreError>;

    /// Return the result for `id`, atomically marking it viewed for its
    /// owning user. Fails with `NotFound` when absent.
    async fn load(&self, id: Uuid) -> Result<ProfilerResult, ProfStoreError>;

    /// Force the (user, id) viewed-state to unviewed. The id is not
    /// required to name a stored result.
    async fn set_unviewed(&self, user: &str, id: Uuid) -> Result<(), ProfStoreError>;

    /// Force the (user, id) viewed-state to viewed.
    async fn set_viewed(&self, user: &str, id: Uuid) -> Result<(), ProfStoreError>;

    /// Ids currently unviewed by `user`, in the order they became
    /// unviewed. Empty for unknown users.
    async fn unviewed_ids(&self, user: &str) -> Result<Vec<Uuid>, ProfStoreError>;
}

/// Shared argument validation for `list` implementations.
pub(crate) fn validate_list_args(
    max_results: u32,
    start: Option<DateTime<Utc>>,
    finish: Option<DateTime<Utc>>,
) -> Result<(), ProfStoreError> {
    if max_results == 0 {
        return Err(ProfStoreError::InvalidArgument(
            "max_results must be positive".to_string(),
        ));
    }
    if let (Some(s), Some(f)) = (start, finish) {
        if s > f {
            return Err(ProfStoreError::InvalidArgument(format!(
                "range start {} is after finish {}",
                s, f
            )));
        }
    }
    Ok(())
}
