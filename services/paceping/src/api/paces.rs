//! Read-only pace listing for operators.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::PaceListResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/v1/paces",
    tag = "paces",
    responses(
        (status = 200, description = "All paces with their follower counts", body = PaceListResponse),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_paces(
    State(state): State<AppState>,
) -> Result<Json<PaceListResponse>, ApiError> {
    let items = state
        .service
        .store()
        .list_paces()
        .await
        .map_err(|err| api_internal("failed to list paces", &err))?;
    Ok(Json(PaceListResponse { items }))
}
