use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{BatchMatchRequest, BatchMatchResponse, MatchRequest, MatchResponse};
use crate::models::wine::Wine;

/// POST /api/v1/match — Match one wine list line.
pub async fn match_line(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, StatusCode> {
    request.validate().map_err(|_| StatusCode::BAD_REQUEST)?;

    let result = state.resolver.match_wine(&request.text).await;
    Ok(Json(MatchResponse {
        text: request.text,
        result,
    }))
}

/// POST /api/v1/match/batch — Match every line scraped from a wine list page.
pub async fn match_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchMatchRequest>,
) -> Result<Json<BatchMatchResponse>, StatusCode> {
    request.validate().map_err(|_| StatusCode::BAD_REQUEST)?;

    let results = state.resolver.batch_match(&request.texts).await;
    Ok(Json(BatchMatchResponse { results }))
}

/// GET /api/v1/wines/{id} — Look up a wine in the local candidate cache.
pub async fn get_cached_wine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Wine>, StatusCode> {
    state
        .resolver
        .store()
        .get(id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// DELETE /api/v1/cache — Reset the local candidate cache.
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.resolver.store().clear().await;
    StatusCode::NO_CONTENT
}
