//! In-memory reference backend
//!
//! Keeps results in a `HashMap` and the per-user unviewed relation as
//! insertion-ordered vectors, all behind one `tokio::sync::RwLock`. The
//! compound effects of `save` and `load` run under a single write guard,
//! and no guard is ever held across an await point.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ProfStoreError;
use crate::models::ProfilerResult;
use crate::storage::{validate_list_args, ListOrder, ResultStorage};

#[derive(Default)]
struct Inner {
    results: HashMap<Uuid, ProfilerResult>,
    /// user -> unviewed ids, oldest first
    unviewed: HashMap<String, Vec<Uuid>>,
}

impl Inner {
    fn mark_unviewed(&mut self, user: &str, id: Uuid) {
        let ids = self.unviewed.entry(user.to_string()).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    fn mark_viewed(&mut self, user: &str, id: Uuid) {
        if let Some(ids) = self.unviewed.get_mut(user) {
            ids.retain(|existing| *existing != id);
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStorage for MemoryStorage {
    async fn list(
        &self,
        max_results: u32,
        start: Option<DateTime<Utc>>,
        finish: Option<DateTime<Utc>>,
        order: ListOrder,
    ) -> Result<Vec<Uuid>, ProfStoreError> {
        validate_list_args(max_results, start, finish)?;

        let inner = self.inner.read().await;

        let mut matched: Vec<(DateTime<Utc>, Uuid)> = inner
            .results
            .values()
            .filter(|r| start.map_or(true, |s| r.started_at >= s))
            .filter(|r| finish.map_or(true, |f| r.started_at <= f))
            .map(|r| (r.started_at, r.id))
            .collect();

        // Tie-break on id so equal timestamps order deterministically
        matched.sort_by_key(|(started_at, id)| (*started_at, *id));
        if order == ListOrder::Descending {
            matched.reverse();
        }

        Ok(matched
            .into_iter()
            .take(max_results as usize)
            .map(|(_, id)| id)
            .collect())
    }

    async fn save(&self, result: &ProfilerResult) -> Result<(), ProfStoreError> {
        let mut inner = self.inner.write().await;
        inner.results.insert(result.id, result.clone());
        inner.mark_unviewed(&result.user, result.id);
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<ProfilerResult, ProfStoreError> {
        let mut inner = self.inner.write().await;
        let result = inner
            .results
            .get(&id)
            .cloned()
            .ok_or(ProfStoreError::NotFound(id))?;
        let user = result.user.clone();
        inner.mark_viewed(&user, id);
        Ok(result)
    }

    async fn set_unviewed(&self, user: &str, id: Uuid) -> Result<(), ProfStoreError> {
        let mut inner = self.inner.write().await;
        inner.mark_unviewed(user, id);
        Ok(())
    }

    async fn set_viewed(&self, user: &str, id: Uuid) -> Result<(), ProfStoreError> {
        let mut inner = self.inner.write().await;
        inner.mark_viewed(user, id);
        Ok(())
    }

    async fn unviewed_ids(&self, user: &str) -> Result<Vec<Uuid>, ProfStoreError> {
        let inner = self.inner.read().await;
        Ok(inner.unviewed.get(user).cloned().unwrap_or_default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_result(name: &str, user: &str, epoch_secs: i64) -> ProfilerResult {
        ProfilerResult {
            id: Uuid::new_v4(),
            name: name.to_string(),
            user: user.to_string(),
            machine_name: "web-01".to_string(),
            started_at: Utc.timestamp_opt(epoch_secs, 0).unwrap(),
            duration_ms: 12.5,
            root: serde_json::json!({ "name": name, "duration_ms": 12.5 }),
        }
    }

    // ========================================================================
    // TEST 1: save then load returns an equal result
    // ========================================================================
    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let store = MemoryStorage::new();
        let result = make_result("GET /orders", "alice", 100);

        store.save(&result).await.unwrap();
        let loaded = store.load(result.id).await.unwrap();

        assert_eq!(loaded, result);
    }

    // ========================================================================
    // TEST 2: load of a missing id fails with NotFound
    // ========================================================================
    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let store = MemoryStorage::new();
        let id = Uuid::new_v4();

        let err = store.load(id).await.unwrap_err();

        match err {
            ProfStoreError::NotFound(missing) => assert_eq!(missing, id),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    // ========================================================================
    // TEST 3: save marks the result unviewed for its owner
    // ========================================================================
    #[tokio::test]
    async fn test_save_marks_unviewed_for_owner() {
        let store = MemoryStorage::new();
        let result = make_result("GET /orders", "alice", 100);

        store.save(&result).await.unwrap();

        assert_eq!(store.unviewed_ids("alice").await.unwrap(), vec![result.id]);
        assert!(store.unviewed_ids("bob").await.unwrap().is_empty());
    }

    // ========================================================================
    // TEST 4: load marks the result viewed for its owner
    // ========================================================================
    #[tokio::test]
    async fn test_load_marks_viewed_for_owner() {
        let store = MemoryStorage::new();
        let result = make_result("GET /orders", "alice", 100);
        store.save(&result).await.unwrap();

        store.load(result.id).await.unwrap();

        assert!(store.unviewed_ids("alice").await.unwrap().is_empty());
    }

    // ========================================================================
    // TEST 5: re-saving a viewed result resets it to unviewed
    // ========================================================================
    #[tokio::test]
    async fn test_resave_resets_viewed_state() {
        let store = MemoryStorage::new();
        let mut result = make_result("GET /orders", "alice", 100);
        store.save(&result).await.unwrap();
        store.load(result.id).await.unwrap();
        assert!(store.unviewed_ids("alice").await.unwrap().is_empty());

        // Overwrite under the same id with new content
        result.duration_ms = 99.0;
        store.save(&result).await.unwrap();

        assert_eq!(store.unviewed_ids("alice").await.unwrap(), vec![result.id]);
        let loaded = store.load(result.id).await.unwrap();
        assert_eq!(loaded.duration_ms, 99.0);
    }

    // ========================================================================
    // TEST 6: set_viewed / set_unviewed toggle the flag explicitly
    // ========================================================================
    #[tokio::test]
    async fn test_set_viewed_and_unviewed_toggle() {
        let store = MemoryStorage::new();
        let result = make_result("GET /orders", "alice", 100);
        store.save(&result).await.unwrap();

        store.set_viewed("alice", result.id).await.unwrap();
        assert!(store.unviewed_ids("alice").await.unwrap().is_empty());

        store.set_unviewed("alice", result.id).await.unwrap();
        assert_eq!(store.unviewed_ids("alice").await.unwrap(), vec![result.id]);
    }

    // ========================================================================
    // TEST 7: set_unviewed accepts ids that were never saved
    // ========================================================================
    #[tokio::test]
    async fn test_set_unviewed_without_result_is_ok() {
        let store = MemoryStorage::new();
        let id = Uuid::new_v4();

        store.set_unviewed("alice", id).await.unwrap();
        assert_eq!(store.unviewed_ids("alice").await.unwrap(), vec![id]);

        store.set_viewed("alice", id).await.unwrap();
        assert!(store.unviewed_ids("alice").await.unwrap().is_empty());
    }

    // ========================================================================
    // TEST 8: list orders by start timestamp and respects max_results
    // ========================================================================
    #[tokio::test]
    async fn test_list_ordering_and_limit() {
        let store = MemoryStorage::new();
        let a = make_result("A", "alice", 100);
        let b = make_result("B", "alice", 200);
        let c = make_result("C", "alice", 300);
        for r in [&a, &b, &c] {
            store.save(r).await.unwrap();
        }

        let desc = store
            .list(10, None, None, ListOrder::Descending)
            .await
            .unwrap();
        assert_eq!(desc, vec![c.id, b.id, a.id]);

        let asc = store
            .list(10, None, None, ListOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(asc, vec![a.id, b.id, c.id]);

        let top_two = store
            .list(2, None, None, ListOrder::Descending)
            .await
            .unwrap();
        assert_eq!(top_two, vec![c.id, b.id]);
    }

    // ========================================================================
    // TEST 9: list range bounds are inclusive on both ends
    // ========================================================================
    #[tokio::test]
    async fn test_list_range_inclusive() {
        let store = MemoryStorage::new();
        let a = make_result("A", "alice", 100);
        let b = make_result("B", "alice", 200);
        let c = make_result("C", "alice", 300);
        for r in [&a, &b, &c] {
            store.save(r).await.unwrap();
        }

        let start = Utc.timestamp_opt(100, 0).unwrap();
        let finish = Utc.timestamp_opt(200, 0).unwrap();
        let ids = store
            .list(10, Some(start), Some(finish), ListOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(ids, vec![a.id, b.id]);

        // Half-open from below
        let ids = store
            .list(10, Some(finish), None, ListOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(ids, vec![b.id, c.id]);
    }

    // ========================================================================
    // TEST 10: zero max_results and inverted ranges are rejected
    // ========================================================================
    #[tokio::test]
    async fn test_list_invalid_arguments() {
        let store = MemoryStorage::new();

        let err = store
            .list(0, None, None, ListOrder::Descending)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfStoreError::InvalidArgument(_)));

        let start = Utc.timestamp_opt(200, 0).unwrap();
        let finish = Utc.timestamp_opt(100, 0).unwrap();
        let err = store
            .list(5, Some(start), Some(finish), ListOrder::Descending)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfStoreError::InvalidArgument(_)));
    }

    // ========================================================================
    // TEST 11: end-to-end scenario — three results, paged list, view one
    // ========================================================================
    #[tokio::test]
    async fn test_scenario_list_and_view_tracking() {
        let store = MemoryStorage::new();
        let a = make_result("A", "alice", 1);
        let b = make_result("B", "alice", 2);
        let c = make_result("C", "alice", 3);
        for r in [&a, &b, &c] {
            store.save(r).await.unwrap();
        }

        let page = store
            .list(2, None, None, ListOrder::Descending)
            .await
            .unwrap();
        assert_eq!(page, vec![c.id, b.id]);

        let unviewed = store.unviewed_ids("alice").await.unwrap();
        assert_eq!(unviewed, vec![a.id, b.id, c.id]);

        store.load(b.id).await.unwrap();
        let unviewed = store.unviewed_ids("alice").await.unwrap();
        assert_eq!(unviewed, vec![a.id, c.id]);
    }

    // ========================================================================
    // TEST 12: unviewed tracking is per user
    // ========================================================================
    #[tokio::test]
    async fn test_unviewed_is_per_user() {
        let store = MemoryStorage::new();
        let alice = make_result("A", "alice", 100);
        let bob = make_result("B", "bob", 200);
        store.save(&alice).await.unwrap();
        store.save(&bob).await.unwrap();

        assert_eq!(store.unviewed_ids("alice").await.unwrap(), vec![alice.id]);
        assert_eq!(store.unviewed_ids("bob").await.unwrap(), vec![bob.id]);

        // Viewing bob's result leaves alice's state alone
        store.load(bob.id).await.unwrap();
        assert_eq!(store.unviewed_ids("alice").await.unwrap(), vec![alice.id]);
        assert!(store.unviewed_ids("bob").await.unwrap().is_empty());
    }

    // ========================================================================
    // TEST 13: concurrent saves and lists stay consistent
    // ========================================================================
    #[tokio::test]
    async fn test_concurrent_saves_and_lists() {
        let store = std::sync::Arc::new(MemoryStorage::new());

        let mut tasks = Vec::new();
        for i in 0..50i64 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let result = make_result(&format!("req-{}", i), "alice", 1_000 + i);
                store.save(&result).await.unwrap();
                // Interleaved reads must always see whole results
                let ids = store
                    .list(100, None, None, ListOrder::Descending)
                    .await
                    .unwrap();
                assert!(!ids.is_empty());
            }));
        }
        futures::future::join_all(tasks)
            .await
            .into_iter()
            .for_each(|r| r.unwrap());

        let ids = store
            .list(100, None, None, ListOrder::Descending)
            .await
            .unwrap();
        assert_eq!(ids.len(), 50);
        assert_eq!(store.unviewed_ids("alice").await.unwrap().len(), 50);
    }
}
