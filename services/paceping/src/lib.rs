//! PacePing service library crate.
//!
//! # Purpose
//! Exposes the pace service, the Discord interaction surface, configuration,
//! and storage implementations for use by the binary and tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod autocomplete;
pub mod commands;
pub mod config;
pub mod discord;
pub mod model;
pub mod observability;
pub mod platform;
pub mod service;
pub mod store;
