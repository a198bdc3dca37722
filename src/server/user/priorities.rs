use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::{effective_limits, require_tenant_admin};
use crate::server::dto::{LimitsResponse, PriorityResponse, SetPriorityRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_priority;
use crate::types::User;

fn require_tenant_category(
    store: &dyn crate::store::Store,
    user: &User,
    category_id: &str,
) -> Result<(), ApiError> {
    let category = store
        .get_category(category_id)
        .api_err("Failed to load category")?
        .or_not_found("Category not found")?;

    if category.tenant_id != user.tenant_id {
        return Err(ApiError::not_found("Category not found"));
    }
    Ok(())
}

/// Every tenant category with the caller's effective priority: their
/// own override, then the tenant default, then 5.
pub async fn list_priorities(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let priorities = state
        .store
        .list_category_priorities(&auth.user.tenant_id, &auth.user.id)
        .api_err("Failed to list priorities")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(priorities)))
}

pub async fn set_user_priority(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetPriorityRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    validate_priority(req.priority)?;
    require_tenant_category(store, user, &req.category_id)?;

    store
        .set_user_category_priority(&user.tenant_id, &user.id, &req.category_id, req.priority)
        .api_err("Failed to set priority")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PriorityResponse {
        category_id: req.category_id,
        priority: req.priority,
    })))
}

/// Tenant-wide default priority. Tenant admins only.
pub async fn set_tenant_priority(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetPriorityRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    require_tenant_admin(user)?;
    validate_priority(req.priority)?;
    require_tenant_category(store, user, &req.category_id)?;

    store
        .set_category_priority(&user.tenant_id, &req.category_id, req.priority)
        .api_err("Failed to set priority")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PriorityResponse {
        category_id: req.category_id,
        priority: req.priority,
    })))
}

pub async fn get_limits(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let (tier, limits) = effective_limits(state.store.as_ref(), &auth.user)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(LimitsResponse {
        tier,
        max_decks: limits.max_decks.sentinel(),
        max_cards_per_deck: limits.max_cards_per_deck.sentinel(),
    })))
}
