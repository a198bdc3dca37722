use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::{
    effective_limits, require_acceptable_deck, require_owned_deck, require_readable_card,
};
use crate::server::dto::{
    AcceptDeckResponse, CreateDeckRequest, ShareDecksRequest, ShareDecksResponse,
    UpdateDeckRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{validate_deck_name, validate_description, validate_hidden_subset};
use crate::store::Store;
use crate::types::{Deck, Limit, ShareRecipients, User};

#[derive(Debug, Serialize)]
pub struct DeckListResponse {
    pub owned: Vec<Deck>,
    pub shared_with_me: Vec<Deck>,
}

fn check_deck_quota(store: &dyn Store, user: &User, max_decks: Limit) -> Result<(), ApiError> {
    let current = store
        .count_user_decks(&user.id)
        .api_err("Failed to count decks")?;
    if !max_decks.allows(current) {
        return Err(ApiError::quota_exceeded(format!(
            "Deck limit reached ({} decks)",
            max_decks.sentinel()
        )));
    }
    Ok(())
}

fn check_card_count(card_ids: &[String], max_cards: Limit) -> Result<(), ApiError> {
    if let Limit::Bounded(max) = max_cards {
        if card_ids.len() as i64 > max {
            return Err(ApiError::quota_exceeded(format!(
                "Deck cannot hold more than {max} cards"
            )));
        }
    }
    Ok(())
}

fn check_cards_readable(
    store: &dyn Store,
    user: &User,
    card_ids: &[String],
) -> Result<(), ApiError> {
    for card_id in card_ids {
        require_readable_card(store, user, card_id)
            .map_err(|_| ApiError::bad_request(format!("Card {card_id} is not accessible")))?;
    }
    Ok(())
}

pub async fn list_decks(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let owned = store
        .list_user_decks(&auth.user.id)
        .api_err("Failed to list decks")?;
    let shared_with_me = store
        .list_decks_shared_with(&auth.user.id)
        .api_err("Failed to list shared decks")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(DeckListResponse {
        owned,
        shared_with_me,
    })))
}

pub async fn create_deck(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeckRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    validate_deck_name(&req.name)?;
    validate_description(req.description.as_deref())?;
    validate_hidden_subset(&req.card_ids, &req.hidden_card_ids)?;

    let (_, limits) = effective_limits(store, user)?;
    check_deck_quota(store, user, limits.max_decks)?;
    check_card_count(&req.card_ids, limits.max_cards_per_deck)?;
    check_cards_readable(store, user, &req.card_ids)?;

    let now = Utc::now();
    let deck = Deck {
        id: Uuid::new_v4().to_string(),
        tenant_id: user.tenant_id.clone(),
        owner_id: user.id.clone(),
        name: req.name.trim().to_string(),
        description: req.description,
        card_ids: req.card_ids,
        hidden_card_ids: req.hidden_card_ids,
        category_ids: req.category_ids,
        is_public: req.is_public,
        created_at: now,
        updated_at: now,
    };

    store.create_deck(&deck).api_err("Failed to create deck")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(deck))))
}

pub async fn get_deck(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<String>,
) -> impl IntoResponse {
    let deck = require_acceptable_deck(state.store.as_ref(), &auth.user, &deck_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(deck)))
}

pub async fn update_deck(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<String>,
    Json(req): Json<UpdateDeckRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    let mut deck = require_owned_deck(store, user, &deck_id)?;

    if let Some(name) = req.name {
        validate_deck_name(&name)?;
        deck.name = name.trim().to_string();
    }
    if let Some(description) = req.description {
        validate_description(Some(&description))?;
        deck.description = Some(description);
    }
    if let Some(card_ids) = req.card_ids {
        let (_, limits) = effective_limits(store, user)?;
        check_card_count(&card_ids, limits.max_cards_per_deck)?;
        check_cards_readable(store, user, &card_ids)?;
        deck.card_ids = card_ids;
    }
    if let Some(hidden) = req.hidden_card_ids {
        deck.hidden_card_ids = hidden;
    }
    if let Some(category_ids) = req.category_ids {
        deck.category_ids = category_ids;
    }
    if let Some(is_public) = req.is_public {
        deck.is_public = is_public;
    }

    validate_hidden_subset(&deck.card_ids, &deck.hidden_card_ids)?;

    store.update_deck(&deck).api_err("Failed to update deck")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(deck)))
}

pub async fn delete_deck(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    require_owned_deck(store, &auth.user, &deck_id)?;
    store.delete_deck(&deck_id).api_err("Failed to delete deck")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn accept_deck(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    let source = require_acceptable_deck(store, user, &deck_id)?;
    if source.owner_id == user.id {
        return Err(ApiError::bad_request("Cannot accept a deck you own"));
    }

    let (_, limits) = effective_limits(store, user)?;
    check_deck_quota(store, user, limits.max_decks)?;

    let (deck, accepted_card_count) = store
        .accept_deck(&source, user, limits.max_cards_per_deck)
        .api_err("Failed to accept deck")?;

    tracing::info!(
        deck_id = %source.id,
        copy_id = %deck.id,
        user_id = %user.id,
        cards = accepted_card_count,
        "Accepted deck copy"
    );

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(AcceptDeckResponse {
            deck,
            accepted_card_count,
        })),
    ))
}

pub async fn share_decks(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ShareDecksRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = &auth.user;

    if req.deck_ids.is_empty() {
        return Err(ApiError::bad_request("No decks to share"));
    }

    let recipients = req.recipients.resolve().map_err(ApiError::bad_request)?;

    if let ShareRecipients::Users(ref user_ids) = recipients {
        if user_ids.is_empty() {
            return Err(ApiError::bad_request("No recipients given"));
        }
        for user_id in user_ids {
            let recipient = store
                .get_user(user_id)
                .api_err("Failed to load recipient")?;
            match recipient {
                Some(r) if r.tenant_id == user.tenant_id => {}
                _ => {
                    return Err(ApiError::bad_request(format!(
                        "Unknown recipient {user_id}"
                    )));
                }
            }
        }
    }

    let mut decks = Vec::new();
    for deck_id in &req.deck_ids {
        decks.push(require_owned_deck(store, user, deck_id)?);
    }

    let (shared_decks, recipient_count) = store
        .share_decks(user, &decks, &recipients)
        .api_err("Failed to share decks")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ShareDecksResponse {
        shared_decks,
        recipients: recipient_count,
    })))
}
