//! Decoding of slash-command invocations into service calls.
use crate::discord::commands::{LIVE_LINK_OPTION, PACE_LABEL_OPTION, PING_MESSAGE_OPTION};
use crate::discord::interaction::InteractionData;
use crate::model::Caller;
use crate::service::{PaceService, Reply, ServiceResult};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing option: {0}")]
    MissingOption(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaceCommand {
    Add {
        label: String,
    },
    List,
    Sub {
        label: String,
    },
    My,
    Unsub {
        label: String,
    },
    Ping {
        label: String,
        message: String,
        link: String,
    },
    Remove {
        label: String,
    },
}

impl PaceCommand {
    pub fn from_data(data: &InteractionData) -> Result<Self, CommandError> {
        let required = |name: &'static str| {
            data.string_option(name)
                .map(str::to_string)
                .ok_or(CommandError::MissingOption(name))
        };
        let command = match data.name.as_str() {
            "pace_add" => Self::Add {
                label: required(PACE_LABEL_OPTION)?,
            },
            "pace_list" => Self::List,
            "pace_sub" => Self::Sub {
                label: required(PACE_LABEL_OPTION)?,
            },
            "pace_my" => Self::My,
            "pace_unsub" => Self::Unsub {
                label: required(PACE_LABEL_OPTION)?,
            },
            "pace_ping" => Self::Ping {
                label: required(PACE_LABEL_OPTION)?,
                // Blank messages fall back to the default downstream.
                message: data
                    .string_option(PING_MESSAGE_OPTION)
                    .unwrap_or_default()
                    .to_string(),
                link: required(LIVE_LINK_OPTION)?,
            },
            "pace_remove" => Self::Remove {
                label: required(PACE_LABEL_OPTION)?,
            },
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "pace_add",
            Self::List => "pace_list",
            Self::Sub { .. } => "pace_sub",
            Self::My => "pace_my",
            Self::Unsub { .. } => "pace_unsub",
            Self::Ping { .. } => "pace_ping",
            Self::Remove { .. } => "pace_remove",
        }
    }

    /// Whether the caller's role names are needed to run the command.
    pub fn requires_roles(&self) -> bool {
        matches!(
            self,
            Self::Add { .. } | Self::Ping { .. } | Self::Remove { .. }
        )
    }

    pub async fn execute(&self, service: &PaceService, caller: &Caller) -> ServiceResult<Reply> {
        match self {
            Self::Add { label } => service.create_pace(caller, label).await,
            Self::List => service.list_paces().await,
            Self::Sub { label } => service.subscribe(caller, label).await,
            Self::My => service.list_mine(caller).await,
            Self::Unsub { label } => service.unsubscribe(caller, label).await,
            Self::Ping {
                label,
                message,
                link,
            } => service.broadcast_ping(caller, label, message, link).await,
            Self::Remove { label } => service.remove_pace(caller, label).await,
        }
    }
}
