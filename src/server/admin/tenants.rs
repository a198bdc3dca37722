use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{CreateTenantRequest, ListParams, UpdateTenantRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_tenant_name;
use crate::types::Tenant;

pub async fn create_tenant(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTenantRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_tenant_name(&req.name)?;

    if store
        .get_tenant_by_name(req.name.trim())
        .api_err("Failed to check tenant")?
        .is_some()
    {
        return Err(ApiError::conflict("Tenant already exists"));
    }

    let tenant = Tenant {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        tier: req.tier.unwrap_or_default(),
        created_at: Utc::now(),
    };

    store
        .create_tenant(&tenant)
        .api_err("Failed to create tenant")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tenant))))
}

pub async fn list_tenants(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let tenants = state
        .store
        .list_tenants(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list tenants")?;

    let (tenants, next_cursor, has_more) =
        paginate(tenants, DEFAULT_PAGE_SIZE as usize, |t| t.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(tenants, next_cursor, has_more)))
}

pub async fn get_tenant(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = state
        .store
        .get_tenant(&id)
        .api_err("Failed to load tenant")?
        .or_not_found("Tenant not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tenant)))
}

pub async fn update_tenant(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTenantRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .update_tenant_tier(&id, req.tier)
        .api_err("Failed to update tenant")?;

    let tenant = store
        .get_tenant(&id)
        .api_err("Failed to load tenant")?
        .or_not_found("Tenant not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tenant)))
}

pub async fn delete_tenant(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_tenant(&id)
        .api_err("Failed to delete tenant")?;

    if !deleted {
        return Err(ApiError::not_found("Tenant not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
