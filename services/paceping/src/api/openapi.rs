//! OpenAPI document of the operational JSON endpoints.
use crate::api::types::{ErrorResponse, HealthStatus, PaceListResponse};
use crate::api::{paces, system};
use crate::model::Pace;
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "paceping",
        version = "v1",
        description = "PacePing operational HTTP API"
    ),
    paths(system::system_health, paces::list_paces),
    components(schemas(HealthStatus, ErrorResponse, PaceListResponse, Pace)),
    tags(
        (name = "system", description = "Service health"),
        (name = "paces", description = "Pace inspection")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
