use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tier;

/// Role a user holds within their tenant. Card rows remember the role
/// of their creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Role {
        if s == "admin" { Role::Admin } else { Role::Member }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A flashcard. Question and answer are immutable after creation;
/// tags, difficulty, and visibility may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub tenant_id: String,
    pub category_id: String,
    pub creator_id: String,
    pub created_by_role: Role,
    pub question: String,
    pub answer: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<i64>,
    pub is_public: bool,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user per-card exposure counters and scheduling state. One row
/// per (tenant, user, card); counters only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub tenant_id: String,
    pub user_id: String,
    pub card_id: String,
    pub exposure_count: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub mastery_score: f64,
    pub repetitions: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// An owned, ordered list of card references. Copies made on accept
/// own their lists outright; edits never propagate between decks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub tenant_id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub card_ids: Vec<String>,
    pub hidden_card_ids: Vec<String>,
    pub category_ids: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckShare {
    pub deck_id: String,
    pub shared_by: String,
    pub shared_with: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read access to one card for a non-owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardAccess {
    pub tenant_id: String,
    pub card_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritySuggestion {
    pub id: String,
    pub tenant_id: String,
    pub category_id: String,
    pub current_priority: i64,
    pub suggested_priority: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl PrioritySuggestion {
    /// Neither applied nor dismissed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.applied_at.is_none() && self.dismissed_at.is_none()
    }
}

/// Persisted per-tier limits; -1 means unlimited on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierLimitRow {
    pub tier: Tier,
    pub max_decks: i64,
    pub max_cards_per_deck: i64,
    pub updated_at: DateTime<Utc>,
}

/// One category's priority as seen by a specific user: their override
/// if set, else the tenant default, else 5.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPriorityView {
    pub category_id: String,
    pub name: String,
    pub priority: i64,
    pub card_count: i64,
}

/// Snapshot row fed to the suggestion engine: the category of the
/// reviewed card plus that row's exposure and mastery.
#[derive(Debug, Clone)]
pub struct ProgressSample {
    pub category_id: String,
    pub exposure_count: i64,
    pub mastery_score: f64,
}

/// Who a deck share targets: every tenant member (flips the deck
/// public) or an explicit recipient list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareRecipients {
    All,
    Users(Vec<String>),
}

/// One review event's atomic progress write. The insert arm of the
/// upsert seeds baseline scheduler state for a first sighting; the
/// conflict arm applies the recurrence output and bumps the counters.
#[derive(Debug, Clone)]
pub struct ProgressWrite {
    pub tenant_id: String,
    pub user_id: String,
    pub card_id: String,
    pub correct: bool,
    pub repetitions: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}
