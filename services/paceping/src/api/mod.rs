//! PacePing HTTP API module.
//!
//! # Purpose
//! Route handlers for the interaction webhook and the read-only operational
//! endpoints, plus the shared error and payload types.
pub mod error;
pub mod interactions;
pub mod openapi;
pub mod paces;
pub mod system;
pub mod types;
