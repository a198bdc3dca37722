use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::CreateUserRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_user_name;
use crate::types::{Role, User};

pub async fn create_user(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_user_name(&req.name)?;

    store
        .get_tenant(&req.tenant_id)
        .api_err("Failed to load tenant")?
        .or_not_found("Tenant not found")?;

    let role = match req.role.as_deref() {
        Some("admin") => Role::Admin,
        Some("member") | None => Role::Member,
        Some(raw) => {
            return Err(ApiError::bad_request(format!("Unknown role '{raw}'")));
        }
    };

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        tenant_id: req.tenant_id,
        name: req.name.trim().to_string(),
        role,
        created_at: now,
        updated_at: now,
    };

    store.create_user(&user).api_err("Failed to create user")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn get_user(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn list_tenant_users(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_tenant(&tenant_id)
        .api_err("Failed to load tenant")?
        .or_not_found("Tenant not found")?;

    let users = store
        .list_tenant_users(&tenant_id)
        .api_err("Failed to list users")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(users)))
}

pub async fn delete_user(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_user(&id)
        .api_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
