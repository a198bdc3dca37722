//! Review submission: access check, scheduling, and progress upkeep.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::srs::{Feedback, SrsState, schedule_next};
use crate::store::Store;
use crate::types::{Card, ProgressWrite, User};

/// What a reviewer gets back after grading a card.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub card_id: String,
    pub mastery_score: f64,
    pub repetitions: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
}

/// Whether `user` may study `card`. Creators always can; otherwise an
/// explicit grant or public visibility is required.
pub fn can_read_card(store: &dyn Store, user: &User, card: &Card) -> Result<bool> {
    if card.tenant_id != user.tenant_id {
        return Ok(false);
    }
    if card.creator_id == user.id || card.is_public {
        return Ok(true);
    }
    store.has_card_access(&card.id, &user.id)
}

/// Records one review of a card and returns the updated schedule.
///
/// Unreadable cards are reported as missing so existence is not
/// leaked across access boundaries.
pub fn submit_review(
    store: &dyn Store,
    user: &User,
    card_id: &str,
    feedback: Feedback,
) -> Result<ReviewOutcome> {
    let card = store.get_card(card_id)?.ok_or(Error::NotFound)?;
    if !can_read_card(store, user, &card)? {
        return Err(Error::NotFound);
    }

    let now = Utc::now();
    let prior = store.get_progress(&user.tenant_id, &user.id, card_id)?;
    let prior_state = prior.as_ref().map(|p| SrsState {
        repetitions: p.repetitions,
        interval_days: p.interval_days,
        ease_factor: p.ease_factor,
    });

    let sched = schedule_next(prior_state.as_ref(), feedback.quality(), now);
    let correct = feedback.is_pass();

    let mastery_score = match &prior {
        Some(p) => {
            (p.correct_count + i64::from(correct)) as f64 / (p.exposure_count + 1) as f64
        }
        None => f64::from(u8::from(correct)),
    };

    store.upsert_progress(&ProgressWrite {
        tenant_id: user.tenant_id.clone(),
        user_id: user.id.clone(),
        card_id: card_id.to_string(),
        correct,
        repetitions: sched.repetitions,
        interval_days: sched.interval_days,
        ease_factor: sched.ease_factor,
        next_review_at: sched.next_review_at,
        last_seen_at: now,
    })?;

    Ok(ReviewOutcome {
        card_id: card_id.to_string(),
        mastery_score,
        repetitions: sched.repetitions,
        interval_days: sched.interval_days,
        ease_factor: sched.ease_factor,
        next_review_at: sched.next_review_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteStore, User, Card) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let now = Utc::now();
        let tenant = Tenant {
            id: "t-1".to_string(),
            name: "acme".to_string(),
            tier: Tier::Free,
            created_at: now,
        };
        store.create_tenant(&tenant).unwrap();

        let user = User {
            id: "u-1".to_string(),
            tenant_id: tenant.id.clone(),
            name: "alice".to_string(),
            role: Role::Member,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap();

        let category = Category {
            id: "c-1".to_string(),
            tenant_id: tenant.id.clone(),
            name: "geography".to_string(),
            created_at: now,
        };
        store.create_category(&category).unwrap();

        let card = Card {
            id: "card-1".to_string(),
            tenant_id: tenant.id.clone(),
            category_id: category.id.clone(),
            creator_id: user.id.clone(),
            created_by_role: Role::Member,
            question: "Capital of France?".to_string(),
            answer: "Paris".to_string(),
            tags: vec![],
            difficulty: None,
            is_public: false,
            fingerprint: "fp-1".to_string(),
            created_at: now,
            updated_at: now,
        };
        store.create_card(&card).unwrap();

        (temp, store, user, card)
    }

    #[test]
    fn test_three_goods_schedule_one_one_six() {
        let (_temp, store, user, card) = setup();

        let r1 = submit_review(&store, &user, &card.id, Feedback::Good).unwrap();
        assert_eq!(r1.interval_days, 1);
        assert_eq!(r1.repetitions, 1);

        let r2 = submit_review(&store, &user, &card.id, Feedback::Good).unwrap();
        assert_eq!(r2.interval_days, 1);
        assert_eq!(r2.repetitions, 1);

        let r3 = submit_review(&store, &user, &card.id, Feedback::Good).unwrap();
        assert_eq!(r3.interval_days, 6);
        assert_eq!(r3.repetitions, 2);
    }

    #[test]
    fn test_hard_counts_as_lapse() {
        let (_temp, store, user, card) = setup();

        submit_review(&store, &user, &card.id, Feedback::Good).unwrap();
        submit_review(&store, &user, &card.id, Feedback::Good).unwrap();

        let lapse = submit_review(&store, &user, &card.id, Feedback::Hard).unwrap();
        assert_eq!(lapse.repetitions, 0);
        assert_eq!(lapse.interval_days, 1);
        // Failed reviews still drag the ease factor down.
        assert!(lapse.ease_factor < 2.5);
    }

    #[test]
    fn test_mastery_tracks_pass_ratio() {
        let (_temp, store, user, card) = setup();

        let r1 = submit_review(&store, &user, &card.id, Feedback::Good).unwrap();
        assert!((r1.mastery_score - 1.0).abs() < 1e-9);

        let r2 = submit_review(&store, &user, &card.id, Feedback::Hard).unwrap();
        assert!((r2.mastery_score - 0.5).abs() < 1e-9);

        let progress = store
            .get_progress(&user.tenant_id, &user.id, &card.id)
            .unwrap()
            .unwrap();
        assert_eq!(progress.exposure_count, 2);
        assert_eq!(
            progress.correct_count + progress.incorrect_count,
            progress.exposure_count
        );
        assert!((progress.mastery_score - r2.mastery_score).abs() < 1e-9);
    }

    #[test]
    fn test_unreadable_card_reports_not_found() {
        let (_temp, store, user, card) = setup();

        let now = Utc::now();
        let stranger = User {
            id: "u-2".to_string(),
            tenant_id: user.tenant_id.clone(),
            name: "bob".to_string(),
            role: Role::Member,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&stranger).unwrap();

        let result = submit_review(&store, &stranger, &card.id, Feedback::Good);
        assert!(matches!(result, Err(Error::NotFound)));

        // A grant makes the same card reviewable.
        store
            .grant_card_access(&CardAccess {
                tenant_id: stranger.tenant_id.clone(),
                card_id: card.id.clone(),
                user_id: stranger.id.clone(),
                created_at: now,
            })
            .unwrap();
        assert!(submit_review(&store, &stranger, &card.id, Feedback::Good).is_ok());
    }

    #[test]
    fn test_missing_card_reports_not_found() {
        let (_temp, store, user, _card) = setup();
        let result = submit_review(&store, &user, "no-such-card", Feedback::Good);
        assert!(matches!(result, Err(Error::NotFound)));
    }
}
