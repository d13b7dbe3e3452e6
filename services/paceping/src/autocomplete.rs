//! Pace-label autocompletion index.
//!
//! # Purpose
//! Keeps the known pace labels in memory so autocomplete requests never touch
//! the store. The service refreshes the index after every create/remove
//! commit and once at startup.
//!
//! # Concurrency
//! The label list sits behind a `tokio::sync::RwLock`; a refresh swaps the whole
//! list, so concurrent refreshes are last-writer-wins.
use crate::model::MAX_LABEL_CHARS;
use crate::store::{PaceStore, StoreResult};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Most choices the platform accepts in one autocomplete response.
pub const MAX_SUGGESTIONS: usize = 25;

#[derive(Debug, Clone, Default)]
pub struct PaceIndex {
    labels: Arc<RwLock<Vec<String>>>,
}

impl PaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload every label from the store; returns the new label count.
    pub async fn refresh(&self, store: &dyn PaceStore) -> StoreResult<usize> {
        let labels = store.pace_labels().await?;
        let count = labels.len();
        self.replace(labels).await;
        Ok(count)
    }

    pub async fn replace(&self, labels: Vec<String>) {
        metrics::gauge!("paceping_paces_total").set(labels.len() as f64);
        *self.labels.write().await = labels;
    }

    /// Labels containing `partial` (case-insensitive), in index order.
    ///
    /// Labels too long to be a choice name are skipped; they can only come from
    /// rows written before the length cap.
    pub async fn suggest(&self, partial: &str) -> Vec<String> {
        let needle = partial.to_lowercase();
        self.labels
            .read()
            .await
            .iter()
            .filter(|label| label.chars().count() <= MAX_LABEL_CHARS)
            .filter(|label| label.to_lowercase().contains(&needle))
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }

    /// Inspection helper; command handling only needs [`PaceIndex::suggest`].
    pub async fn contains(&self, label: &str) -> bool {
        self.labels.read().await.iter().any(|known| known == label)
    }

    pub async fn label_count(&self) -> usize {
        self.labels.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaceLabel;
    use crate::store::memory::InMemoryStore;

    #[tokio::test]
    async fn suggest_matches_substrings_case_insensitively() {
        let index = PaceIndex::new();
        index
            .replace(vec![
                "Any_pct".to_string(),
                "golden_berry".to_string(),
                "PACE_any".to_string(),
            ])
            .await;
        assert_eq!(index.suggest("ANY").await, vec!["Any_pct", "PACE_any"]);
        assert_eq!(index.suggest("berry").await, vec!["golden_berry"]);
        assert!(index.suggest("zzz").await.is_empty());
    }

    #[tokio::test]
    async fn empty_partial_returns_everything_in_order() {
        let index = PaceIndex::new();
        index
            .replace(vec!["b".to_string(), "a".to_string()])
            .await;
        assert_eq!(index.suggest("").await, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn overlong_stored_labels_are_not_suggested() {
        let index = PaceIndex::new();
        index
            .replace(vec!["x".repeat(MAX_LABEL_CHARS + 50), "x_ok".to_string()])
            .await;
        assert_eq!(index.suggest("").await, vec!["x_ok"]);
    }

    #[tokio::test]
    async fn suggestions_are_capped() {
        let index = PaceIndex::new();
        index
            .replace((0..40).map(|idx| format!("pace_{idx:02}")).collect())
            .await;
        assert_eq!(index.suggest("pace").await.len(), MAX_SUGGESTIONS);
    }

    #[tokio::test]
    async fn refresh_replaces_labels_from_store() {
        let store = InMemoryStore::new();
        let index = PaceIndex::new();
        index.replace(vec!["stale".to_string()]).await;

        store
            .create_pace(&PaceLabel::parse("fresh").expect("label"))
            .await
            .expect("create");
        assert_eq!(index.refresh(&store).await.expect("refresh"), 1);
        assert!(index.contains("fresh").await);
        assert!(!index.contains("stale").await);

        store
            .delete_pace(&PaceLabel::parse("fresh").expect("label"))
            .await
            .expect("delete");
        index.refresh(&store).await.expect("refresh");
        assert_eq!(index.label_count().await, 0);
    }
}
