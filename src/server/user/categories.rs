use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::CreateCategoryRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_category_name;
use crate::types::Category;

pub async fn list_categories(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let categories = state
        .store
        .list_tenant_categories(&auth.user.tenant_id)
        .api_err("Failed to list categories")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(categories)))
}

pub async fn create_category(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> impl IntoResponse {
    validate_category_name(&req.name)?;

    let category = Category {
        id: Uuid::new_v4().to_string(),
        tenant_id: auth.user.tenant_id.clone(),
        name: req.name.trim().to_string(),
        created_at: Utc::now(),
    };

    state
        .store
        .create_category(&category)
        .api_err("Failed to create category")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(category))))
}
