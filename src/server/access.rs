//! Access helpers shared by the user-facing handlers.

use crate::review::can_read_card;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Card, Deck, Role, Tier, TierLimits, User};

/// Loads a card the user may study. Unreadable and missing cards are
/// indistinguishable to the caller.
pub fn require_readable_card(
    store: &dyn Store,
    user: &User,
    card_id: &str,
) -> Result<Card, ApiError> {
    let card = store
        .get_card(card_id)
        .api_err("Failed to load card")?
        .or_not_found("Card not found")?;

    if !can_read_card(store, user, &card).api_err("Failed to check card access")? {
        return Err(ApiError::not_found("Card not found"));
    }

    Ok(card)
}

/// Loads a deck the user owns. Decks of other users are reported as
/// missing.
pub fn require_owned_deck(
    store: &dyn Store,
    user: &User,
    deck_id: &str,
) -> Result<Deck, ApiError> {
    let deck = store
        .get_deck(deck_id)
        .api_err("Failed to load deck")?
        .or_not_found("Deck not found")?;

    if deck.owner_id != user.id {
        return Err(ApiError::not_found("Deck not found"));
    }

    Ok(deck)
}

/// Loads a deck the user may accept a copy of: their own, one shared
/// with them, or a public deck in their tenant.
pub fn require_acceptable_deck(
    store: &dyn Store,
    user: &User,
    deck_id: &str,
) -> Result<Deck, ApiError> {
    let deck = store
        .get_deck(deck_id)
        .api_err("Failed to load deck")?
        .or_not_found("Deck not found")?;

    if deck.tenant_id != user.tenant_id {
        return Err(ApiError::not_found("Deck not found"));
    }
    if deck.owner_id == user.id || deck.is_public {
        return Ok(deck);
    }

    let share = store
        .get_deck_share(deck_id, &user.id)
        .api_err("Failed to check deck share")?;
    if share.is_none() {
        return Err(ApiError::not_found("Deck not found"));
    }

    Ok(deck)
}

pub fn require_tenant_admin(user: &User) -> Result<(), ApiError> {
    if user.role != Role::Admin {
        return Err(ApiError::forbidden("Tenant admin access required"));
    }
    Ok(())
}

/// Effective limits for the user's tenant: the stored row when
/// present, tier defaults otherwise.
pub fn effective_limits(store: &dyn Store, user: &User) -> Result<(Tier, TierLimits), ApiError> {
    let tenant = store
        .get_tenant(&user.tenant_id)
        .api_err("Failed to load tenant")?
        .or_not_found("Tenant not found")?;

    let row = store
        .ensure_tier_limits(tenant.tier)
        .api_err("Failed to resolve tier limits")?;
    Ok((tenant.tier, row.limits()))
}
