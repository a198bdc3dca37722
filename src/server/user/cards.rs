use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::fingerprint::fingerprint;
use crate::review::can_read_card;
use crate::server::AppState;
use crate::server::access::{effective_limits, require_readable_card};
use crate::server::dto::{
    BatchCreateResponse, CreateCardRequest, CreateCardsBatchRequest, UpdateCardRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_card_text, validate_difficulty};
use crate::types::{Card, Category, User};

fn require_tenant_category(
    store: &dyn crate::store::Store,
    user: &User,
    category_id: &str,
) -> Result<Category, ApiError> {
    let category = store
        .get_category(category_id)
        .api_err("Failed to load category")?
        .or_not_found("Category not found")?;

    if category.tenant_id != user.tenant_id {
        return Err(ApiError::not_found("Category not found"));
    }
    Ok(category)
}

pub async fn list_category_cards(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    require_tenant_category(store, user, &category_id)?;

    let cards = store
        .list_category_cards(&category_id)
        .api_err("Failed to list cards")?;

    let mut visible = Vec::new();
    for card in cards {
        if can_read_card(store, user, &card).api_err("Failed to check card access")? {
            visible.push(card);
        }
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(visible)))
}

pub async fn create_card(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCardRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    validate_card_text(&req.question, &req.answer)?;
    validate_difficulty(req.difficulty)?;
    require_tenant_category(store, user, &req.category_id)?;

    let now = Utc::now();
    let fp = fingerprint(&req.question, &req.answer);
    let card = Card {
        id: Uuid::new_v4().to_string(),
        tenant_id: user.tenant_id.clone(),
        category_id: req.category_id,
        creator_id: user.id.clone(),
        created_by_role: user.role,
        question: req.question,
        answer: req.answer,
        tags: req.tags,
        difficulty: req.difficulty,
        is_public: req.is_public,
        fingerprint: fp,
        created_at: now,
        updated_at: now,
    };

    if !store.create_card(&card).api_err("Failed to create card")? {
        return Err(ApiError::conflict(
            "A card with identical content already exists",
        ));
    }

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(card))))
}

pub async fn create_cards_batch(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
    Json(req): Json<CreateCardsBatchRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    require_tenant_category(store, user, &category_id)?;

    if req.cards.is_empty() {
        return Err(ApiError::bad_request("Batch cannot be empty"));
    }

    let (_, limits) = effective_limits(store, user)?;
    let cap = limits.batch_cap();
    let truncated = req.cards.len().saturating_sub(cap);

    let now = Utc::now();
    let mut seen = std::collections::HashSet::new();
    let mut in_batch_duplicates = 0;
    let mut cards = Vec::new();

    for item in req.cards.into_iter().take(cap) {
        validate_card_text(&item.question, &item.answer)?;
        validate_difficulty(item.difficulty)?;

        let fp = fingerprint(&item.question, &item.answer);
        if !seen.insert(fp.clone()) {
            in_batch_duplicates += 1;
            continue;
        }

        cards.push(Card {
            id: Uuid::new_v4().to_string(),
            tenant_id: user.tenant_id.clone(),
            category_id: category_id.clone(),
            creator_id: user.id.clone(),
            created_by_role: user.role,
            question: item.question,
            answer: item.answer,
            tags: item.tags,
            difficulty: item.difficulty,
            is_public: item.is_public,
            fingerprint: fp,
            created_at: now,
            updated_at: now,
        });
    }

    let (created, skipped_existing) = store
        .create_cards(&cards)
        .api_err("Failed to create cards")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(BatchCreateResponse {
            created,
            skipped_duplicates: in_batch_duplicates + skipped_existing,
            truncated,
        })),
    ))
}

pub async fn get_card(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<String>,
) -> impl IntoResponse {
    let card = require_readable_card(state.store.as_ref(), &auth.user, &card_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(card)))
}

pub async fn update_card(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<String>,
    Json(req): Json<UpdateCardRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    let mut card = require_readable_card(store, user, &card_id)?;

    // Only the creator may change card metadata.
    if card.creator_id != user.id {
        return Err(ApiError::forbidden("Only the card creator can update it"));
    }

    validate_difficulty(req.difficulty)?;

    if let Some(tags) = req.tags {
        card.tags = tags;
    }
    if let Some(difficulty) = req.difficulty {
        card.difficulty = Some(difficulty);
    }
    if let Some(is_public) = req.is_public {
        card.is_public = is_public;
    }

    store
        .update_card_meta(&card)
        .api_err("Failed to update card")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(card)))
}
