//! Slash-command definitions registered with the platform.
use crate::model::MAX_LABEL_CHARS;
use serde::Serialize;

/// Application command type for chat-input (slash) commands.
const CHAT_INPUT: u8 = 1;
/// Option type for string arguments.
const STRING_OPTION: u8 = 3;

pub const PACE_LABEL_OPTION: &str = "pace_label";
pub const PING_MESSAGE_OPTION: &str = "ping_message";
pub const LIVE_LINK_OPTION: &str = "live_link";

/// Caps on the free-text ping options, so a ping header always fits one message.
pub const MAX_PING_MESSAGE_CHARS: u16 = 1000;
pub const MAX_LIVE_LINK_CHARS: u16 = 500;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDefinition>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OptionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: u8,
    pub required: bool,
    pub autocomplete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
}

fn command(
    name: &'static str,
    description: &'static str,
    options: Vec<OptionDefinition>,
) -> CommandDefinition {
    CommandDefinition {
        name,
        description,
        kind: CHAT_INPUT,
        options,
    }
}

fn string_option(
    name: &'static str,
    description: &'static str,
    autocomplete: bool,
) -> OptionDefinition {
    OptionDefinition {
        name,
        description,
        kind: STRING_OPTION,
        required: true,
        autocomplete,
        max_length: None,
    }
}

fn label_option(description: &'static str, autocomplete: bool) -> OptionDefinition {
    string_option(PACE_LABEL_OPTION, description, autocomplete).max_length(MAX_LABEL_CHARS as u16)
}

impl OptionDefinition {
    fn max_length(mut self, chars: u16) -> Self {
        self.max_length = Some(chars);
        self
    }
}

/// The seven PacePing commands.
pub fn command_definitions() -> Vec<CommandDefinition> {
    vec![
        command(
            "pace_add",
            "Allows an authorized user to create a new pace to subscribe to.",
            vec![label_option(
                "The name of the pace you want to add",
                false,
            )],
        ),
        command(
            "pace_list",
            "Displays all the paces available to subscription.",
            Vec::new(),
        ),
        command(
            "pace_sub",
            "Allows you to subscribe to a pace",
            vec![label_option(
                "The name of the pace you want to subscribe to",
                true,
            )],
        ),
        command(
            "pace_my",
            "Allows you to display the paces you're subscribed to",
            Vec::new(),
        ),
        command(
            "pace_unsub",
            "Allows you to unsubscribe from a pace you're no longer interested in",
            vec![label_option(
                "The name of the pace you want to unsubscribe from",
                true,
            )],
        ),
        command(
            "pace_ping",
            "Allows an authorized user to ping everyone subscribed to a given pace",
            vec![
                label_option(
                    "The name of the pace whose subscribers you want to ping",
                    true,
                ),
                string_option(
                    PING_MESSAGE_OPTION,
                    "The kind of pace (time at chapter exit, checkpoint of the golden, etc...)",
                    false,
                )
                .max_length(MAX_PING_MESSAGE_CHARS),
                string_option(
                    LIVE_LINK_OPTION,
                    "The url to the live where the current pace can be watched",
                    false,
                )
                .max_length(MAX_LIVE_LINK_CHARS),
            ],
        ),
        command(
            "pace_remove",
            "Allows an authorized user to remove a pace and all its subscriptions",
            vec![label_option(
                "The name of the pace you want to remove",
                true,
            )],
        ),
    ]
}
