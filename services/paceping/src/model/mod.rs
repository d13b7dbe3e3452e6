//! PacePing data model module.
//!
//! # Purpose
//! Re-exports the pace, caller, and action-log types shared by the store,
//! service, and HTTP layers.
mod action_log;
mod caller;
mod pace;

pub use action_log::ActionLogEntry;
pub use caller::Caller;
pub use pace::{InvalidLabel, MAX_LABEL_CHARS, Pace, PaceLabel, is_valid_label};
