use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 100;
const MAX_CARD_TEXT_LEN: usize = 2000;
const MAX_DESCRIPTION_LEN: usize = 500;

pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 10;

fn validate_name(name: &str, entity: &str) -> Result<(), ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!(
            "{entity} name cannot be empty"
        )));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "{entity} name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_category_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Category")
}

pub fn validate_deck_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Deck")
}

pub fn validate_tenant_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Tenant")
}

pub fn validate_user_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "User")
}

pub fn validate_card_text(question: &str, answer: &str) -> Result<(), ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::bad_request("Card question cannot be empty"));
    }
    if answer.trim().is_empty() {
        return Err(ApiError::bad_request("Card answer cannot be empty"));
    }
    if question.len() > MAX_CARD_TEXT_LEN || answer.len() > MAX_CARD_TEXT_LEN {
        return Err(ApiError::bad_request(format!(
            "Card text cannot exceed {MAX_CARD_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), ApiError> {
    if let Some(d) = description {
        if d.len() > MAX_DESCRIPTION_LEN {
            return Err(ApiError::bad_request(format!(
                "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
            )));
        }
    }
    Ok(())
}

pub fn validate_priority(priority: i64) -> Result<(), ApiError> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(ApiError::bad_request(format!(
            "Priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}"
        )));
    }
    Ok(())
}

pub fn validate_difficulty(difficulty: Option<i64>) -> Result<(), ApiError> {
    if let Some(d) = difficulty {
        if !(1..=5).contains(&d) {
            return Err(ApiError::bad_request("Difficulty must be between 1 and 5"));
        }
    }
    Ok(())
}

/// Hidden cards must be a subset of the deck's card list.
pub fn validate_hidden_subset(card_ids: &[String], hidden: &[String]) -> Result<(), ApiError> {
    for id in hidden {
        if !card_ids.contains(id) {
            return Err(ApiError::bad_request(format!(
                "Hidden card {id} is not in the deck"
            )));
        }
    }
    Ok(())
}
