//! In-memory implementation of the pace store.
//!
//! # Purpose
//! Implements [`PaceStore`] with plain collections behind a single
//! `tokio::sync::RwLock`. It exists for:
//! - local development without a database
//! - unit and HTTP tests
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - All tables live under one lock, so a subscription row and the pace's
//!   follower count always change together.
use super::{PaceStore, StoreError, StoreResult};
use crate::model::{ActionLogEntry, Pace, PaceLabel};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryTables {
    next_pace_id: i64,
    /// Paces keyed by label so listings come out ordered.
    paces: BTreeMap<String, Pace>,
    /// `(pace_id, subscriber_id)` pairs.
    subscriptions: BTreeSet<(i64, String)>,
    /// Subscriber ids per pace in subscription order.
    subscription_order: BTreeMap<i64, Vec<String>>,
    log: Vec<ActionLogEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<MemoryTables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaceStore for InMemoryStore {
    async fn list_paces(&self) -> StoreResult<Vec<Pace>> {
        Ok(self.tables.read().await.paces.values().cloned().collect())
    }

    async fn pace_exists(&self, label: &PaceLabel) -> StoreResult<bool> {
        Ok(self.tables.read().await.paces.contains_key(label.as_str()))
    }

    async fn create_pace(&self, label: &PaceLabel) -> StoreResult<Pace> {
        let mut tables = self.tables.write().await;
        if tables.paces.contains_key(label.as_str()) {
            return Err(StoreError::Conflict("pace exists".into()));
        }
        tables.next_pace_id += 1;
        let pace = Pace {
            pace_id: tables.next_pace_id,
            label: label.as_str().to_string(),
            follower_count: 0,
        };
        tables.paces.insert(pace.label.clone(), pace.clone());
        Ok(pace)
    }

    async fn delete_pace(&self, label: &PaceLabel) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let pace = tables
            .paces
            .remove(label.as_str())
            .ok_or_else(|| StoreError::NotFound("pace".into()))?;
        let removed = tables
            .subscription_order
            .remove(&pace.pace_id)
            .unwrap_or_default();
        for subscriber_id in &removed {
            tables
                .subscriptions
                .remove(&(pace.pace_id, subscriber_id.clone()));
        }
        Ok(removed.len() as u64)
    }

    async fn subscribe(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let pace_id = tables
            .paces
            .get(label.as_str())
            .map(|pace| pace.pace_id)
            .ok_or_else(|| StoreError::NotFound("pace".into()))?;
        if !tables
            .subscriptions
            .insert((pace_id, subscriber_id.to_string()))
        {
            return Err(StoreError::Conflict("subscription exists".into()));
        }
        tables
            .subscription_order
            .entry(pace_id)
            .or_default()
            .push(subscriber_id.to_string());
        if let Some(pace) = tables.paces.get_mut(label.as_str()) {
            pace.follower_count += 1;
        }
        Ok(())
    }

    async fn unsubscribe(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let pace_id = tables
            .paces
            .get(label.as_str())
            .map(|pace| pace.pace_id)
            .ok_or_else(|| StoreError::NotFound("pace".into()))?;
        if !tables
            .subscriptions
            .remove(&(pace_id, subscriber_id.to_string()))
        {
            return Err(StoreError::NotFound("subscription".into()));
        }
        if let Some(order) = tables.subscription_order.get_mut(&pace_id) {
            order.retain(|id| id != subscriber_id);
        }
        if let Some(pace) = tables.paces.get_mut(label.as_str()) {
            pace.follower_count -= 1;
        }
        Ok(())
    }

    async fn is_subscribed(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.paces.get(label.as_str()).is_some_and(|pace| {
            tables
                .subscriptions
                .contains(&(pace.pace_id, subscriber_id.to_string()))
        }))
    }

    async fn list_subscribed(&self, subscriber_id: &str) -> StoreResult<Vec<Pace>> {
        let tables = self.tables.read().await;
        Ok(tables
            .paces
            .values()
            .filter(|pace| {
                tables
                    .subscriptions
                    .contains(&(pace.pace_id, subscriber_id.to_string()))
            })
            .cloned()
            .collect())
    }

    async fn subscribers(&self, label: &PaceLabel) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .paces
            .get(label.as_str())
            .and_then(|pace| tables.subscription_order.get(&pace.pace_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn pace_labels(&self) -> StoreResult<Vec<String>> {
        Ok(self.tables.read().await.paces.keys().cloned().collect())
    }

    async fn append_log(&self, entry: ActionLogEntry) -> StoreResult<()> {
        self.tables.write().await.log.push(entry);
        Ok(())
    }

    async fn recent_log(&self, limit: usize) -> StoreResult<Vec<ActionLogEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.log.iter().rev().take(limit).cloned().collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
