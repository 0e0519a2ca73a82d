use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::CatalogWriteResponse;
use crate::models::wine::Wine;

/// POST /api/v1/catalog — Forward catalog wines to the search index.
pub async fn index_wines(
    State(state): State<AppState>,
    Json(wines): Json<Vec<Wine>>,
) -> Result<Json<CatalogWriteResponse>, StatusCode> {
    for wine in &wines {
        wine.validate().map_err(|_| StatusCode::BAD_REQUEST)?;
    }

    state
        .resolver
        .remote()
        .index_entries(&wines)
        .await
        .map_err(|e| {
            tracing::error!(count = wines.len(), error = %e, "Failed to index catalog wines");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(CatalogWriteResponse {
        accepted: wines.len(),
    }))
}

/// DELETE /api/v1/catalog/{id} — Remove a wine from the search index.
pub async fn delete_wine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    match state.resolver.remote().delete_entry(id).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::error!(wine_id = %id, error = %e, "Failed to delete wine from search index");
            StatusCode::BAD_GATEWAY
        }
    }
}
