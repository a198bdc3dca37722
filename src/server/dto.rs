use serde::{Deserialize, Serialize};

use crate::srs::Feedback;
use crate::types::{Deck, ShareRecipients, Tier};

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub card_id: String,
    pub feedback: Feedback,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub category_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<i64>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchCardItem {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<i64>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCardsBatchRequest {
    pub cards: Vec<BatchCardItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub created: usize,
    pub skipped_duplicates: usize,
    /// Items dropped because the request exceeded the batch cap.
    pub truncated: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCardRequest {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty: Option<i64>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDeckRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub card_ids: Vec<String>,
    #[serde(default)]
    pub hidden_card_ids: Vec<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDeckRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub card_ids: Option<Vec<String>>,
    #[serde(default)]
    pub hidden_card_ids: Option<Vec<String>>,
    #[serde(default)]
    pub category_ids: Option<Vec<String>>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AcceptDeckResponse {
    pub deck: Deck,
    pub accepted_card_count: usize,
}

/// Recipients on the wire: the string "all" or a list of user ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RecipientsField {
    Keyword(String),
    Users(Vec<String>),
}

impl RecipientsField {
    pub fn resolve(self) -> Result<ShareRecipients, String> {
        match self {
            RecipientsField::Keyword(word) if word == "all" => Ok(ShareRecipients::All),
            RecipientsField::Keyword(word) => Err(format!("unknown recipients keyword '{word}'")),
            RecipientsField::Users(ids) => Ok(ShareRecipients::Users(ids)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ShareDecksRequest {
    pub deck_ids: Vec<String>,
    pub recipients: RecipientsField,
}

#[derive(Debug, Serialize)]
pub struct ShareDecksResponse {
    pub shared_decks: usize,
    pub recipients: usize,
}

#[derive(Debug, Deserialize)]
pub struct SetPriorityRequest {
    pub category_id: String,
    pub priority: i64,
}

#[derive(Debug, Serialize)]
pub struct PriorityResponse {
    pub category_id: String,
    pub priority: i64,
}

#[derive(Debug, Serialize)]
pub struct LimitsResponse {
    pub tier: Tier,
    /// -1 means unlimited.
    pub max_decks: i64,
    pub max_cards_per_deck: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub tier: Option<Tier>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub tier: Tier,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTokenRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub id: String,
    pub token: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SetTierLimitsRequest {
    /// -1 means unlimited.
    pub max_decks: i64,
    pub max_cards_per_deck: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub cursor: Option<String>,
}
