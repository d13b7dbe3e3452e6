#![allow(dead_code)]

use async_trait::async_trait;
use paceping::auth::access::AccessGuard;
use paceping::model::Caller;
use paceping::platform::{ChatPlatform, OutgoingMessage, PlatformError};
use paceping::service::PaceService;
use paceping::store::memory::InMemoryStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PING_CHANNEL: &str = "ping-channel";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Chat platform fake recording every posted message.
#[derive(Default)]
pub struct RecordingPlatform {
    posts: Mutex<Vec<(String, OutgoingMessage)>>,
    roles: HashMap<String, String>,
    failing: AtomicBool,
    role_delay: Mutex<Option<Duration>>,
}

impl RecordingPlatform {
    pub fn with_roles(roles: &[(&str, &str)]) -> Self {
        Self {
            roles: roles
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<(String, OutgoingMessage)> {
        self.posts.lock().expect("lock").clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make role lookups hang for `delay` before answering.
    pub fn set_role_delay(&self, delay: Duration) {
        *self.role_delay.lock().expect("lock") = Some(delay);
    }

    fn check(&self) -> Result<(), PlatformError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlatformError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn post_message(
        &self,
        channel_id: &str,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError> {
        self.check()?;
        self.posts
            .lock()
            .expect("lock")
            .push((channel_id.to_string(), message));
        Ok(())
    }

    async fn role_names(
        &self,
        _guild_id: &str,
        role_ids: &[String],
    ) -> Result<Vec<String>, PlatformError> {
        let delay = *self.role_delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(role_ids
            .iter()
            .filter_map(|id| self.roles.get(id).cloned())
            .collect())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub platform: Arc<RecordingPlatform>,
    pub service: Arc<PaceService>,
}

pub fn harness_with(platform: RecordingPlatform) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let platform = Arc::new(platform);
    let service = Arc::new(PaceService::new(
        store.clone(),
        platform.clone(),
        AccessGuard::new("PacePingBoss"),
        PING_CHANNEL,
    ));
    Harness {
        store,
        platform,
        service,
    }
}

pub fn harness() -> Harness {
    harness_with(RecordingPlatform::default())
}

pub fn moderator() -> Caller {
    Caller::new("1000", "modder")
        .with_display_name("The Modder")
        .with_roles(["Modo"])
}

pub fn member(id: &str) -> Caller {
    Caller::new(id, format!("user{id}")).with_roles(["Runner"])
}
