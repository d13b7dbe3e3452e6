//! PacePing HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
use crate::api;
use crate::discord::verify::InteractionVerifier;
use crate::platform::ChatPlatform;
use crate::service::PaceService;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PaceService>,
    /// Used to resolve caller role names before gated commands.
    pub platform: Arc<dyn ChatPlatform>,
    pub verifier: Arc<InteractionVerifier>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route(
            "/interactions",
            axum::routing::post(api::interactions::handle_interaction),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route("/v1/paces", axum::routing::get(api::paces::list_paces))
        .route(
            "/v1/openapi.json",
            axum::routing::get(api::openapi::openapi_json),
        )
        .layer(trace_layer)
        .with_state(state)
}
