//! Discord REST client with a cached guild-role lookup.
//!
//! # Purpose
//! Posts channel messages, resolves role ids to role names, and bulk-registers
//! the slash commands. This is the production [`ChatPlatform`].
//!
//! # Key invariants
//! - Every request carries the `Bot` authorization header; without a token the
//!   client refuses to send anything.
//! - Posted messages only notify the users listed in
//!   [`OutgoingMessage::mention_users`]; role and everyone mentions never fire.
//! - Guild role maps are cached per guild for the configured TTL.
//!
//! # Concurrency model
//! The role cache lives in a `DashMap` shared by clones of the client.
use crate::discord::commands::CommandDefinition;
use crate::platform::{ChatPlatform, OutgoingMessage, PlatformError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Largest explicit user list accepted in `allowed_mentions`.
pub const MAX_ALLOWED_MENTION_USERS: usize = 100;

#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
    role_cache: Arc<DashMap<String, CachedRoles>>,
    role_ttl: Duration,
}

#[derive(Debug, Clone)]
struct CachedRoles {
    names: HashMap<String, String>,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct GuildRole {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    allowed_mentions: MessageMentions,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct MessageMentions {
    parse: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    users: Vec<String>,
}

impl MessageMentions {
    fn for_users(users: Vec<String>) -> Self {
        // Above the explicit-list limit, fall back to letting every user
        // mention in the content notify.
        if users.len() > MAX_ALLOWED_MENTION_USERS {
            Self {
                parse: vec!["users"],
                users: Vec::new(),
            }
        } else {
            Self {
                parse: Vec::new(),
                users,
            }
        }
    }
}

impl DiscordClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>, role_ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.trim().is_empty()),
            role_cache: Arc::new(DashMap::new()),
            role_ttl,
        }
    }

    fn authorization(&self) -> Result<String, PlatformError> {
        self.token
            .as_ref()
            .map(|token| format!("Bot {token}"))
            .ok_or(PlatformError::MissingCredentials("DISCORD_TOKEN"))
    }

    /// Replace the application's command set; guild-scoped when `guild_id` is set.
    ///
    /// Returns the number of commands the platform acknowledged.
    pub async fn register_commands(
        &self,
        application_id: &str,
        guild_id: Option<&str>,
        commands: &[CommandDefinition],
    ) -> Result<usize, PlatformError> {
        let url = match guild_id {
            Some(guild_id) => format!(
                "{}/applications/{application_id}/guilds/{guild_id}/commands",
                self.api_base
            ),
            None => format!("{}/applications/{application_id}/commands", self.api_base),
        };
        let response = self
            .client
            .put(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .json(commands)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let registered: Vec<serde_json::Value> = response.json().await?;
        Ok(registered.len())
    }

    async fn guild_roles(&self, guild_id: &str) -> Result<HashMap<String, String>, PlatformError> {
        if let Some(entry) = self.role_cache.get(guild_id)
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.names.clone());
        }
        let response = self
            .client
            .get(format!("{}/guilds/{guild_id}/roles", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .send()
            .await?;
        let roles: Vec<GuildRole> = ensure_success(response).await?.json().await?;
        let names: HashMap<String, String> =
            roles.into_iter().map(|role| (role.id, role.name)).collect();
        self.role_cache.insert(
            guild_id.to_string(),
            CachedRoles {
                names: names.clone(),
                expires_at: Instant::now() + self.role_ttl,
            },
        );
        Ok(names)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn post_message(
        &self,
        channel_id: &str,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError> {
        let payload = CreateMessage {
            content: &message.content,
            allowed_mentions: MessageMentions::for_users(message.mention_users),
        };
        let response = self
            .client
            .post(format!("{}/channels/{channel_id}/messages", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .json(&payload)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn role_names(
        &self,
        guild_id: &str,
        role_ids: &[String],
    ) -> Result<Vec<String>, PlatformError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let names = self.guild_roles(guild_id).await?;
        Ok(role_ids
            .iter()
            .filter_map(|id| names.get(id).cloned())
            .collect())
    }
}
