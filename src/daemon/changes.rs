//! In-memory change registry
//!
//! Hands out identifiers for operations accepted by the API so async
//! responses have a resource to point at.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Change {
    pub id: String,
    pub kind: String,
    pub summary: String,
    pub spawn_time: DateTime<Utc>,
}

impl Change {
    /// API path of this change, echoed as `Location`
    pub fn resource(&self) -> String {
        format!("/v1/changes/{}", self.id)
    }
}

/// Changes kept for lookup; older ones are evicted first
pub const MAX_CHANGES: usize = 1024;

#[derive(Debug)]
pub struct ChangeRegistry {
    next_id: AtomicU64,
    capacity: usize,
    changes: RwLock<VecDeque<Change>>,
}

impl Default for ChangeRegistry {
    fn default() -> Self {
        Self::with_capacity(MAX_CHANGES)
    }
}

impl ChangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry retaining at most `capacity` changes (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            capacity: capacity.max(1),
            changes: RwLock::new(VecDeque::new()),
        }
    }

    pub async fn create(&self, kind: &str, summary: &str) -> Change {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let change = Change {
            id: id.to_string(),
            kind: kind.to_string(),
            summary: summary.to_string(),
            spawn_time: Utc::now(),
        };

        let mut changes = self.changes.write().await;
        while changes.len() >= self.capacity {
            changes.pop_front();
        }
        changes.push_back(change.clone());
        change
    }

    pub async fn get(&self, id: &str) -> Option<Change> {
        self.changes
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn list(&self) -> Vec<Change> {
        self.changes.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_sequential_and_retrievable() {
        let registry = ChangeRegistry::new();
        let first = registry.create("restart", "Restart service").await;
        let second = registry.create("stop", "").await;

        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
        assert_eq!(first.resource(), "/v1/changes/1");
        assert_eq!(registry.get("2").await, Some(second));
        assert!(registry.get("3").await.is_none());
        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_oldest_changes_are_evicted() {
        let registry = ChangeRegistry::with_capacity(3);
        for n in 0..5 {
            registry.create("refresh", &format!("refresh {n}")).await;
        }

        let ids: Vec<String> = registry.list().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["3", "4", "5"]);
        assert!(registry.get("1").await.is_none());
        assert_eq!(registry.get("5").await.unwrap().summary, "refresh 4");

        let next = registry.create("refresh", "").await;
        assert_eq!(next.id, "6");
        assert_eq!(registry.list().await.len(), 3);
    }
}
