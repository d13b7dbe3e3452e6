//! Identity of the user invoking a command.
use serde::{Deserialize, Serialize};

/// Calling user as resolved from an interaction.
///
/// `roles` holds role *names* (not ids); the access guard compares names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub user_name: String,
    pub display_name: String,
    pub roles: Vec<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        let user_name = user_name.into();
        Self {
            user_id: user_id.into(),
            display_name: user_name.clone(),
            user_name,
            roles: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}
