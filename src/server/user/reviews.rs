use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireUser;
use crate::review;
use crate::server::AppState;
use crate::server::dto::SubmitReviewRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn submit_review(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitReviewRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let outcome = review::submit_review(store, &auth.user, &req.card_id, req.feedback)
        .api_err("Failed to record review")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(outcome)))
}
