use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateTokenRequest, CreateTokenResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::Token;

const MAX_LOOKUP_RETRIES: usize = 3;

/// Mints a token. With a `user_id` the token acts as that user;
/// without one it is a global admin token.
pub async fn create_token(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTokenRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    if let Some(ref user_id) = req.user_id {
        store
            .get_user(user_id)
            .api_err("Failed to load user")?
            .or_not_found("User not found")?;
    }

    let expires_at = match req.expires_in_seconds {
        Some(seconds) if seconds <= 0 => {
            return Err(ApiError::bad_request("Expiry must be positive"));
        }
        Some(seconds) => Some(Utc::now() + Duration::seconds(seconds)),
        None => None,
    };

    let generator = TokenGenerator::new();

    // Lookup prefixes can collide; retry with a fresh one.
    for _ in 0..MAX_LOOKUP_RETRIES {
        let (raw_token, lookup, hash) = generator
            .generate()
            .map_err(|_| ApiError::internal("Failed to generate token"))?;

        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            is_admin: req.user_id.is_none(),
            user_id: req.user_id.clone(),
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };

        match store.create_token(&token) {
            Ok(()) => {
                return Ok::<_, ApiError>((
                    StatusCode::CREATED,
                    Json(ApiResponse::success(CreateTokenResponse {
                        id: token.id,
                        token: raw_token,
                        is_admin: token.is_admin,
                        user_id: token.user_id,
                        expires_at: token.expires_at,
                    })),
                ));
            }
            Err(Error::TokenLookupCollision) => continue,
            Err(_) => return Err(ApiError::internal("Failed to create token")),
        }
    }

    Err(ApiError::internal("Failed to create token"))
}

pub async fn delete_token(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_token(&id)
        .api_err("Failed to delete token")?;

    if !deleted {
        return Err(ApiError::not_found("Token not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
