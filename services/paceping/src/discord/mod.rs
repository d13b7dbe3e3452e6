//! Discord integration.
//!
//! # Purpose
//! Wire types for the interactions webhook, request signature verification,
//! slash-command definitions, and the REST client used to post messages,
//! resolve roles, and register commands.
pub mod client;
pub mod commands;
pub mod interaction;
pub mod verify;
