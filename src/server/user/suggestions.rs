use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::require_tenant_admin;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::suggest;

pub async fn list_suggestions(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_tenant_admin(&auth.user)?;

    let suggestions = state
        .store
        .list_open_suggestions(&auth.user.tenant_id)
        .api_err("Failed to list suggestions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(suggestions)))
}

pub async fn generate(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    require_tenant_admin(&auth.user)?;

    let created = suggest::generate_suggestions(state.store.as_ref(), &auth.user.tenant_id)
        .api_err("Failed to generate suggestions")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

fn require_tenant_suggestion(
    store: &dyn crate::store::Store,
    tenant_id: &str,
    id: &str,
) -> Result<(), ApiError> {
    let suggestion = store
        .get_suggestion(id)
        .api_err("Failed to load suggestion")?
        .or_not_found("Suggestion not found")?;

    if suggestion.tenant_id != tenant_id {
        return Err(ApiError::not_found("Suggestion not found"));
    }
    Ok(())
}

pub async fn apply(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_tenant_admin(&auth.user)?;

    let store = state.store.as_ref();
    require_tenant_suggestion(store, &auth.user.tenant_id, &id)?;

    let applied = store
        .apply_suggestion(&id, Utc::now())
        .api_err("Failed to apply suggestion")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(applied)))
}

pub async fn dismiss(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_tenant_admin(&auth.user)?;

    let store = state.store.as_ref();
    require_tenant_suggestion(store, &auth.user.tenant_id, &id)?;

    let dismissed = store
        .dismiss_suggestion(&id, Utc::now())
        .api_err("Failed to dismiss suggestion")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(dismissed)))
}
