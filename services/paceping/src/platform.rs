//! Chat platform seam.
//!
//! # Purpose
//! The service talks to the chat platform only through [`ChatPlatform`]:
//! posting announcements to a channel and resolving role ids into names.
//! [`crate::discord::client::DiscordClient`] is the production implementation;
//! tests substitute recording fakes.
use async_trait::async_trait;
use thiserror::Error;

/// A message to post on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    /// User ids that may be notified by mentions in `content`. Any other
    /// mention is rendered without notifying.
    pub mention_users: Vec<String>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mention_users: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform credentials missing: {0}")]
    MissingCredentials(&'static str),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("platform returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn post_message(
        &self,
        channel_id: &str,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError>;

    /// Names of the given roles within a guild. Unknown ids are skipped.
    async fn role_names(
        &self,
        guild_id: &str,
        role_ids: &[String],
    ) -> Result<Vec<String>, PlatformError>;
}
