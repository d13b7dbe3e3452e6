//! HTTP API response types.
//!
//! # Purpose
//! Payload shapes of the operational endpoints and their OpenAPI schemas.
use crate::model::Pace;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    /// Storage backend in use (`memory` or `postgres`).
    pub storage: String,
    pub durable: bool,
    /// Labels currently offered by autocompletion.
    pub paces: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PaceListResponse {
    pub items: Vec<Pace>,
}
