use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A captured profiling session, keyed by `id` and owned by `user`.
///
/// The `root` timing tree is produced by the collector and stored opaquely;
/// the store orders and filters only on `started_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfilerResult {
    pub id: Uuid,
    pub name: String,
    pub user: String,
    pub machine_name: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub root: serde_json::Value,
}

impl ProfilerResult {
    /// New result with a fresh v4 id, started now.
    pub fn new(name: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            user: user.into(),
            machine_name: String::new(),
            started_at: Utc::now(),
            duration_ms: 0.0,
            root: serde_json::Value::Null,
        }
    }
}
