//! Pace operations behind the slash commands.
//!
//! # Purpose
//! [`PaceService`] implements the seven commands against a [`PaceStore`] and a
//! [`ChatPlatform`], producing the private reply shown to the caller.
//!
//! # Key invariants
//! - Gated operations check the [`AccessGuard`] before anything else; a denied
//!   caller causes no store access at all.
//! - Labels are validated before any store access.
//! - Expected outcomes (not found, already subscribed, ...) are replies, not
//!   errors; [`ServiceError`] is reserved for store and platform failures.
//! - The autocompletion index is refreshed only after a create or remove has
//!   committed.
//! - Gated operations append one action-log entry once the guard passed,
//!   whatever the outcome.
use crate::auth::access::AccessGuard;
use crate::autocomplete::PaceIndex;
use crate::model::{ActionLogEntry, Caller, Pace, PaceLabel};
use crate::platform::{ChatPlatform, OutgoingMessage, PlatformError};
use crate::store::{PaceStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Message length limit of the chat platform, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const DEFAULT_PING_MESSAGE: &str = "Live pace !";

const INVALID_LABEL_REPLY: &str = "Your pace name does not meet the requirements. Only numbers, lowercases, uppercases and underscores(_) are authorized.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Denied,
    InvalidLabel,
    Missing,
    Conflict,
    Empty,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::Denied => "denied",
            Outcome::InvalidLabel => "invalid_label",
            Outcome::Missing => "missing",
            Outcome::Conflict => "conflict",
            Outcome::Empty => "empty",
        }
    }
}

/// Private reply to the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub outcome: Outcome,
    pub content: String,
}

impl Reply {
    fn new(outcome: Outcome, content: impl Into<String>) -> Self {
        Self {
            outcome,
            content: content.into(),
        }
    }

    fn done(content: impl Into<String>) -> Self {
        Self::new(Outcome::Done, content)
    }

    fn invalid_label() -> Self {
        Self::new(Outcome::InvalidLabel, INVALID_LABEL_REPLY)
    }
}

pub struct PaceService {
    store: Arc<dyn PaceStore>,
    platform: Arc<dyn ChatPlatform>,
    guard: AccessGuard,
    index: PaceIndex,
    ping_channel_id: String,
}

impl PaceService {
    pub fn new(
        store: Arc<dyn PaceStore>,
        platform: Arc<dyn ChatPlatform>,
        guard: AccessGuard,
        ping_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            platform,
            guard,
            index: PaceIndex::new(),
            ping_channel_id: ping_channel_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn PaceStore> {
        &self.store
    }

    pub fn index(&self) -> &PaceIndex {
        &self.index
    }

    /// Reload the autocompletion index from the store.
    pub async fn refresh_index(&self) -> ServiceResult<usize> {
        Ok(self.index.refresh(self.store.as_ref()).await?)
    }

    pub async fn suggest(&self, partial: &str) -> Vec<String> {
        self.index.suggest(partial).await
    }

    pub async fn create_pace(&self, caller: &Caller, raw_label: &str) -> ServiceResult<Reply> {
        if !self.guard.allows(&caller.roles) {
            return Ok(Reply::new(
                Outcome::Denied,
                format!("{} is not permitted to add paces", caller.user_name),
            ));
        }
        let reply = self.create_checked(caller, raw_label).await;
        self.record(caller, "pace_add", raw_label).await;
        reply
    }

    async fn create_checked(&self, caller: &Caller, raw_label: &str) -> ServiceResult<Reply> {
        let Ok(label) = PaceLabel::parse(raw_label) else {
            return Ok(Reply::invalid_label());
        };
        let already_exists = || {
            Reply::new(
                Outcome::Conflict,
                format!("The pace {label} already exists !"),
            )
        };
        if self.store.pace_exists(&label).await? {
            return Ok(already_exists());
        }
        match self.store.create_pace(&label).await {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => return Ok(already_exists()),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(user_id = %caller.user_id, pace = %label, "pace created");
        self.announce(format!(
            "{} just created the pace **{label}**. Everybody can now subscribe to it :)",
            caller.display_name
        ))
        .await;
        self.refresh_after_commit().await;
        Ok(Reply::done(format!(
            "The pace **{label}** has been created. Everybody can now subscribe to it."
        )))
    }

    pub async fn list_paces(&self) -> ServiceResult<Reply> {
        let paces = self.store.list_paces().await?;
        if paces.is_empty() {
            return Ok(Reply::new(
                Outcome::Empty,
                "There is no active pace. Please create it first with the command \"/pace_add [pace_label]\"",
            ));
        }
        Ok(Reply::done(render_paces(
            "List of paces you can subscribe to :",
            &paces,
        )))
    }

    pub async fn subscribe(&self, caller: &Caller, raw_label: &str) -> ServiceResult<Reply> {
        let Ok(label) = PaceLabel::parse(raw_label) else {
            return Ok(Reply::invalid_label());
        };
        let missing = || {
            Reply::new(
                Outcome::Missing,
                format!(
                    "The pace **{label}** doesn't exist. Please create it first with the command **/pace_add [pace_name]**"
                ),
            )
        };
        if !self.store.pace_exists(&label).await? {
            return Ok(missing());
        }
        match self.store.subscribe(&label, &caller.user_id).await {
            Ok(()) => Ok(Reply::done(format!(
                "You have been successfully subscribed to the pace **{label}**"
            ))),
            Err(StoreError::Conflict(_)) => Ok(Reply::new(
                Outcome::Conflict,
                format!("You are already subscribed to **{label}** !"),
            )),
            // Removed between the existence check and the insert.
            Err(StoreError::NotFound(_)) => Ok(missing()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_mine(&self, caller: &Caller) -> ServiceResult<Reply> {
        let paces = self.store.list_subscribed(&caller.user_id).await?;
        if paces.is_empty() {
            return Ok(Reply::new(
                Outcome::Empty,
                "You are not subscribed to any pace.",
            ));
        }
        Ok(Reply::done(render_paces(
            "List of paces you are subscribed to :",
            &paces,
        )))
    }

    pub async fn unsubscribe(&self, caller: &Caller, raw_label: &str) -> ServiceResult<Reply> {
        let Ok(label) = PaceLabel::parse(raw_label) else {
            return Ok(Reply::invalid_label());
        };
        if !self.store.pace_exists(&label).await? {
            return Ok(Reply::new(
                Outcome::Missing,
                format!(
                    "The pace **{label}** doesn't exist. You can check your subscriptions with the command **/pace_my**"
                ),
            ));
        }
        match self.store.unsubscribe(&label, &caller.user_id).await {
            Ok(()) => Ok(Reply::done(format!(
                "You have been successfully unsubscribed from the pace **{label}**"
            ))),
            Err(StoreError::NotFound(_)) => Ok(Reply::new(
                Outcome::Conflict,
                format!("You are not subscribed to **{label}**"),
            )),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn remove_pace(&self, caller: &Caller, raw_label: &str) -> ServiceResult<Reply> {
        if !self.guard.allows(&caller.roles) {
            return Ok(Reply::new(
                Outcome::Denied,
                "You are not permitted to remove paces",
            ));
        }
        let reply = self.remove_checked(caller, raw_label).await;
        self.record(caller, "pace_remove", raw_label).await;
        reply
    }

    async fn remove_checked(&self, caller: &Caller, raw_label: &str) -> ServiceResult<Reply> {
        let Ok(label) = PaceLabel::parse(raw_label) else {
            return Ok(Reply::invalid_label());
        };
        let missing = || {
            Reply::new(
                Outcome::Missing,
                format!(
                    "The pace **{label}** doesn't exist. You can check the paces with the command **/pace_list**"
                ),
            )
        };
        let dropped = match self.store.delete_pace(&label).await {
            Ok(dropped) => dropped,
            Err(StoreError::NotFound(_)) => return Ok(missing()),
            Err(err) => return Err(err.into()),
        };
        tracing::info!(
            user_id = %caller.user_id,
            pace = %label,
            subscriptions = dropped,
            "pace removed"
        );
        self.refresh_after_commit().await;
        self.announce(format!(
            "{} just removed the pace **{label}** as well as all its subscriptions.",
            caller.display_name
        ))
        .await;
        Ok(Reply::done(format!(
            "The pace **{label}** has been removed as well as all its subscriptions."
        )))
    }

    pub async fn broadcast_ping(
        &self,
        caller: &Caller,
        raw_label: &str,
        message: &str,
        link: &str,
    ) -> ServiceResult<Reply> {
        if !self.guard.allows(&caller.roles) {
            return Ok(Reply::new(
                Outcome::Denied,
                "You are not permitted to ping paces",
            ));
        }
        let reply = self.ping_checked(raw_label, message, link).await;
        self.record(caller, "pace_ping", raw_label).await;
        reply
    }

    async fn ping_checked(&self, raw_label: &str, message: &str, link: &str) -> ServiceResult<Reply> {
        let Ok(label) = PaceLabel::parse(raw_label) else {
            return Ok(Reply::invalid_label());
        };
        if !self.store.pace_exists(&label).await? {
            return Ok(Reply::new(
                Outcome::Missing,
                format!(
                    "The pace **{label}** doesn't exist. Check the names first with the command **/pace_my**."
                ),
            ));
        }
        let subscribers = self.store.subscribers(&label).await?;
        let message = if message.trim().is_empty() {
            DEFAULT_PING_MESSAGE
        } else {
            message
        };
        let header =
            format!("Pinging all the users subscribed to the pace **{label}** : {message} => {link}\n");
        for chunk in ping_messages(&header, &subscribers) {
            self.platform
                .post_message(&self.ping_channel_id, chunk)
                .await?;
        }
        metrics::counter!("paceping_pings_total").increment(1);
        tracing::info!(pace = %label, subscribers = subscribers.len(), "subscribers pinged");
        Ok(Reply::done(format!(
            "Subscribers to the pace **{label}** have been pinged !"
        )))
    }

    async fn announce(&self, content: String) {
        if let Err(err) = self
            .platform
            .post_message(&self.ping_channel_id, OutgoingMessage::text(content))
            .await
        {
            metrics::counter!("paceping_announcements_failed_total").increment(1);
            tracing::warn!(error = %err, channel_id = %self.ping_channel_id, "announcement failed");
        }
    }

    async fn refresh_after_commit(&self) {
        if let Err(err) = self.index.refresh(self.store.as_ref()).await {
            tracing::warn!(error = %err, "autocompletion refresh failed");
        }
    }

    async fn record(&self, caller: &Caller, command: &str, raw_label: &str) {
        let entry = ActionLogEntry::now(caller.user_id.clone(), format!("{command} {raw_label}"));
        tracing::info!(
            user_id = %entry.subscriber_id,
            time = %entry.logged_at,
            action = %entry.action,
            "action logged"
        );
        if let Err(err) = self.store.append_log(entry).await {
            tracing::error!(error = %err, user_id = %caller.user_id, "action log write failed");
        }
    }
}

fn render_paces(header: &str, paces: &[Pace]) -> String {
    let mut out = header.to_string();
    let mut used = out.chars().count();
    for (idx, pace) in paces.iter().enumerate() {
        let line = format!("\n\t=> {}\t subscribers : {}", pace.label, pace.follower_count);
        let line_chars = line.chars().count();
        let left_after = paces.len() - idx - 1;
        let reserve = if left_after > 0 {
            more_line(left_after).chars().count()
        } else {
            0
        };
        if used + line_chars + reserve > MAX_MESSAGE_CHARS {
            out.push_str(&more_line(paces.len() - idx));
            return out;
        }
        out.push_str(&line);
        used += line_chars;
    }
    out
}

fn more_line(hidden: usize) -> String {
    format!("\n\t...and {hidden} more")
}

/// Longest prefix of `text` holding at most `max` characters.
fn clip_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Split a ping into messages that fit the platform limit.
///
/// The first message starts with `header`, clipped to the limit; every message
/// only lets the users it mentions be notified.
pub fn ping_messages(header: &str, subscribers: &[String]) -> Vec<OutgoingMessage> {
    let header = clip_chars(header, MAX_MESSAGE_CHARS);
    let mut messages = Vec::new();
    let mut current = OutgoingMessage::text(header);
    let mut current_chars = header.chars().count();
    for id in subscribers {
        let mention = format!("<@{id}> ");
        let mention_chars = mention.chars().count();
        if current_chars + mention_chars > MAX_MESSAGE_CHARS && current_chars > 0 {
            messages.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.content.push_str(&mention);
        current.mention_users.push(id.clone());
        current_chars += mention_chars;
    }
    messages.push(current);
    messages
}
