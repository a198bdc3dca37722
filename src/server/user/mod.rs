mod cards;
mod categories;
mod decks;
mod priorities;
mod reviews;
mod suggestions;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Reviews
        .route("/reviews", post(reviews::submit_review))
        // Categories
        .route("/categories", get(categories::list_categories))
        .route("/categories", post(categories::create_category))
        .route("/categories/{id}/cards", get(cards::list_category_cards))
        .route("/categories/{id}/cards", post(cards::create_cards_batch))
        // Cards
        .route("/cards", post(cards::create_card))
        .route("/cards/{id}", get(cards::get_card))
        .route("/cards/{id}", patch(cards::update_card))
        // Decks
        .route("/decks", get(decks::list_decks))
        .route("/decks", post(decks::create_deck))
        .route("/decks/share", post(decks::share_decks))
        .route("/decks/{id}", get(decks::get_deck))
        .route("/decks/{id}", patch(decks::update_deck))
        .route("/decks/{id}", delete(decks::delete_deck))
        .route("/decks/{id}/accept", post(decks::accept_deck))
        // Priorities
        .route("/priorities", get(priorities::list_priorities))
        .route("/priorities", put(priorities::set_user_priority))
        .route("/priorities/default", put(priorities::set_tenant_priority))
        // Suggestions (tenant admin)
        .route("/suggestions", get(suggestions::list_suggestions))
        .route("/suggestions/generate", post(suggestions::generate))
        .route("/suggestions/{id}/apply", post(suggestions::apply))
        .route("/suggestions/{id}/dismiss", post(suggestions::dismiss))
        // Plan limits
        .route("/limits", get(priorities::get_limits))
}
