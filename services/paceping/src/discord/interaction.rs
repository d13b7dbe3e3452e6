//! Interaction webhook payloads.
//!
//! # Purpose
//! Deserializable subset of Discord's interaction object and the response
//! shapes PacePing sends back. Only the fields the bot reads are modeled;
//! unknown fields are ignored.
use crate::model::Caller;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response flag making a message visible only to the invoking user.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
}

impl TryFrom<u8> for InteractionKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ping),
            2 => Ok(Self::ApplicationCommand),
            3 => Ok(Self::MessageComponent),
            4 => Ok(Self::Autocomplete),
            5 => Ok(Self::ModalSubmit),
            other => Err(format!("unknown interaction type {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Present for interactions inside a guild.
    #[serde(default)]
    pub member: Option<GuildMember>,
    /// Present for interactions in direct messages.
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOptionValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOptionValue {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    /// Set on the option the user is typing in during autocomplete.
    #[serde(default)]
    pub focused: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
    /// Role ids.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

impl InteractionData {
    /// String value of the named option, if present.
    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .and_then(|option| option.value.as_ref())
            .and_then(Value::as_str)
    }

    /// The option being typed in during autocomplete.
    pub fn focused_option(&self) -> Option<&CommandOptionValue> {
        self.options.iter().find(|option| option.focused)
    }
}

impl Interaction {
    /// The invoking user, from the guild member or the DM user.
    pub fn invoking_user(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
    }

    /// Caller identity without role names; roles are resolved separately.
    pub fn caller(&self) -> Option<Caller> {
        let user = self.invoking_user()?;
        let display_name = self
            .member
            .as_ref()
            .and_then(|member| member.nick.clone())
            .or_else(|| user.global_name.clone())
            .unwrap_or_else(|| user.username.clone());
        Some(Caller::new(user.id.clone(), user.username.clone()).with_display_name(display_name))
    }

    pub fn role_ids(&self) -> &[String] {
        self.member
            .as_ref()
            .map(|member| member.roles.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: 1,
            data: None,
        }
    }

    /// Reply visible only to the caller, with mentions disabled.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: 4,
            data: Some(ResponseData {
                content: Some(content.into()),
                flags: Some(EPHEMERAL_FLAG),
                allowed_mentions: Some(AllowedMentions::default()),
                choices: None,
            }),
        }
    }

    pub fn autocomplete<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let choices = labels
            .into_iter()
            .map(|label| Choice {
                name: label.clone(),
                value: label,
            })
            .collect();
        Self {
            kind: 8,
            data: Some(ResponseData {
                choices: Some(choices),
                ..ResponseData::default()
            }),
        }
    }
}
