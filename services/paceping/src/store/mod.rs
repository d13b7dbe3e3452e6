//! Storage abstraction for paces, subscriptions, and the action log.
//!
//! # Purpose
//! Defines the [`PaceStore`] trait shared by the in-memory and Postgres
//! backends, plus the error type both return.
//!
//! # Key invariants
//! - Labels reaching the store are already validated ([`PaceLabel`]).
//! - `subscribe`/`unsubscribe` change the membership row and the pace's
//!   `follower_count` together, or not at all.
//! - `delete_pace` removes the pace and every subscription to it.
use crate::model::{ActionLogEntry, Pace, PaceLabel};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PaceStore: Send + Sync {
    /// All paces ordered by label.
    async fn list_paces(&self) -> StoreResult<Vec<Pace>>;
    async fn pace_exists(&self, label: &PaceLabel) -> StoreResult<bool>;
    /// Fails with [`StoreError::Conflict`] when the label is taken.
    async fn create_pace(&self, label: &PaceLabel) -> StoreResult<Pace>;
    /// Deletes the pace and its subscriptions; returns how many subscriptions went with it.
    async fn delete_pace(&self, label: &PaceLabel) -> StoreResult<u64>;

    /// Fails with `NotFound` for an unknown pace and `Conflict` for an existing pair.
    async fn subscribe(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<()>;
    /// Fails with `NotFound` for an unknown pace or a missing pair.
    async fn unsubscribe(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<()>;
    /// Inspection query; the commands rely on `subscribe`/`unsubscribe` outcomes instead.
    async fn is_subscribed(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<bool>;
    /// Paces the subscriber follows, ordered by label.
    async fn list_subscribed(&self, subscriber_id: &str) -> StoreResult<Vec<Pace>>;
    /// Subscriber ids of a pace in subscription order.
    async fn subscribers(&self, label: &PaceLabel) -> StoreResult<Vec<String>>;
    /// Distinct labels ordered by label, used to seed autocompletion.
    async fn pace_labels(&self) -> StoreResult<Vec<String>>;

    async fn append_log(&self, entry: ActionLogEntry) -> StoreResult<()>;
    /// Most recent log entries, newest first. Inspection query for audits.
    async fn recent_log(&self, limit: usize) -> StoreResult<Vec<ActionLogEntry>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
