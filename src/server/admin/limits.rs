use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{LimitsResponse, SetTierLimitsRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::{Tier, TierLimitRow};

fn parse_tier(raw: &str) -> Result<Tier, ApiError> {
    match raw {
        "free" => Ok(Tier::Free),
        "starter" => Ok(Tier::Starter),
        "pro" => Ok(Tier::Pro),
        "enterprise" => Ok(Tier::Enterprise),
        _ => Err(ApiError::bad_request(format!("Unknown tier '{raw}'"))),
    }
}

pub async fn get_limits(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
) -> impl IntoResponse {
    let tier = parse_tier(&tier)?;

    let row = state
        .store
        .ensure_tier_limits(tier)
        .api_err("Failed to resolve tier limits")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(LimitsResponse {
        tier,
        max_decks: row.max_decks,
        max_cards_per_deck: row.max_cards_per_deck,
    })))
}

pub async fn set_limits(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
    Json(req): Json<SetTierLimitsRequest>,
) -> impl IntoResponse {
    let tier = parse_tier(&tier)?;

    if req.max_decks < -1 || req.max_cards_per_deck < -1 {
        return Err(ApiError::bad_request("Limits must be -1 or non-negative"));
    }

    let row = TierLimitRow {
        tier,
        max_decks: req.max_decks,
        max_cards_per_deck: req.max_cards_per_deck,
        updated_at: Utc::now(),
    };

    state
        .store
        .set_tier_limits(&row)
        .api_err("Failed to set tier limits")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(LimitsResponse {
        tier,
        max_decks: row.max_decks,
        max_cards_per_deck: row.max_cards_per_deck,
    })))
}
