mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every method that protects a uniqueness or quota invariant runs as
/// one SQL statement or one explicit transaction; callers never
/// compose read-then-write sequences across the store boundary for
/// those invariants.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Tenant operations
    fn create_tenant(&self, tenant: &Tenant) -> Result<()>;
    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>>;
    fn get_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>>;
    fn list_tenants(&self, cursor: &str, limit: i32) -> Result<Vec<Tenant>>;
    fn update_tenant_tier(&self, id: &str, tier: Tier) -> Result<()>;
    fn delete_tenant(&self, id: &str) -> Result<bool>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn list_tenant_users(&self, tenant_id: &str) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Category operations
    fn create_category(&self, category: &Category) -> Result<()>;
    fn get_category(&self, id: &str) -> Result<Option<Category>>;
    fn list_tenant_categories(&self, tenant_id: &str) -> Result<Vec<Category>>;

    // Card operations
    /// Returns false when the tenant already holds a card with the
    /// same fingerprint (duplicate content is not an error).
    fn create_card(&self, card: &Card) -> Result<bool>;
    /// Inserts a batch in one transaction, skipping fingerprint
    /// duplicates. Returns (created, skipped).
    fn create_cards(&self, cards: &[Card]) -> Result<(usize, usize)>;
    fn get_card(&self, id: &str) -> Result<Option<Card>>;
    fn list_category_cards(&self, category_id: &str) -> Result<Vec<Card>>;
    /// Persists the mutable fields only: tags, difficulty, visibility.
    fn update_card_meta(&self, card: &Card) -> Result<()>;

    // Card access grants
    fn grant_card_access(&self, access: &CardAccess) -> Result<()>;
    fn has_card_access(&self, card_id: &str, user_id: &str) -> Result<bool>;

    // Progress operations
    fn get_progress(
        &self,
        tenant_id: &str,
        user_id: &str,
        card_id: &str,
    ) -> Result<Option<Progress>>;
    fn upsert_progress(&self, write: &ProgressWrite) -> Result<()>;
    /// Point-in-time snapshot of all progress rows in a tenant joined
    /// to their card's category.
    fn list_progress_samples(&self, tenant_id: &str) -> Result<Vec<ProgressSample>>;

    // Deck operations
    fn create_deck(&self, deck: &Deck) -> Result<()>;
    fn get_deck(&self, id: &str) -> Result<Option<Deck>>;
    fn list_user_decks(&self, owner_id: &str) -> Result<Vec<Deck>>;
    fn list_decks_shared_with(&self, user_id: &str) -> Result<Vec<Deck>>;
    fn count_user_decks(&self, owner_id: &str) -> Result<i64>;
    fn update_deck(&self, deck: &Deck) -> Result<()>;
    fn delete_deck(&self, id: &str) -> Result<bool>;
    fn get_deck_share(&self, deck_id: &str, user_id: &str) -> Result<Option<DeckShare>>;

    /// Copies a deck for `acceptor` inside one transaction: walks the
    /// source card list, grants access to public cards the acceptor
    /// cannot yet read, silently drops inaccessible ones, truncates to
    /// `max_cards`, and creates a fresh private deck with its own
    /// list. Returns the new deck and the accepted card count.
    fn accept_deck(&self, source: &Deck, acceptor: &User, max_cards: Limit)
    -> Result<(Deck, usize)>;

    /// Shares decks inside one transaction. `All` flips each deck
    /// public; an explicit list upserts one share per (deck,
    /// recipient), skipping self-shares. Returns (deck count,
    /// recipient count). Never touches deck content.
    fn share_decks(
        &self,
        sharer: &User,
        decks: &[Deck],
        recipients: &ShareRecipients,
    ) -> Result<(usize, usize)>;

    // Category priority operations
    fn get_category_priority(&self, tenant_id: &str, category_id: &str) -> Result<Option<i64>>;
    fn set_category_priority(
        &self,
        tenant_id: &str,
        category_id: &str,
        priority: i64,
    ) -> Result<()>;
    fn set_user_category_priority(
        &self,
        tenant_id: &str,
        user_id: &str,
        category_id: &str,
        priority: i64,
    ) -> Result<()>;
    fn get_user_category_priority(
        &self,
        tenant_id: &str,
        user_id: &str,
        category_id: &str,
    ) -> Result<Option<i64>>;
    /// Effective priorities for one user: their override, else the
    /// tenant default, else 5; with per-category card counts.
    fn list_category_priorities(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<CategoryPriorityView>>;

    // Suggestion operations
    /// Returns false when an open suggestion already exists for the
    /// (tenant, category).
    fn create_suggestion(&self, suggestion: &PrioritySuggestion) -> Result<bool>;
    fn get_suggestion(&self, id: &str) -> Result<Option<PrioritySuggestion>>;
    fn list_open_suggestions(&self, tenant_id: &str) -> Result<Vec<PrioritySuggestion>>;
    /// Sets the tenant category priority and stamps applied_at in one
    /// transaction. Conflict if the suggestion is already closed.
    fn apply_suggestion(&self, id: &str, now: DateTime<Utc>) -> Result<PrioritySuggestion>;
    fn dismiss_suggestion(&self, id: &str, now: DateTime<Utc>) -> Result<PrioritySuggestion>;

    // Tier limit operations
    fn get_tier_limit_row(&self, tier: Tier) -> Result<Option<TierLimitRow>>;
    /// Resolves the persisted limits for a tier, materializing the
    /// built-in defaults on first use.
    fn ensure_tier_limits(&self, tier: Tier) -> Result<TierLimitRow>;
    fn set_tier_limits(&self, row: &TierLimitRow) -> Result<()>;

    fn close(&self) -> Result<()>;
}

impl TierLimitRow {
    /// Decodes the wire sentinels into tagged limits.
    #[must_use]
    pub fn limits(&self) -> TierLimits {
        TierLimits {
            max_decks: Limit::from_sentinel(self.max_decks),
            max_cards_per_deck: Limit::from_sentinel(self.max_cards_per_deck),
        }
    }

    #[must_use]
    pub fn from_limits(tier: Tier, limits: TierLimits, updated_at: DateTime<Utc>) -> TierLimitRow {
        TierLimitRow {
            tier,
            max_decks: limits.max_decks.sentinel(),
            max_cards_per_deck: limits.max_cards_per_deck.sentinel(),
            updated_at,
        }
    }
}
