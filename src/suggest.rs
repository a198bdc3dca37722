//! Priority suggestion heuristics over aggregate study progress.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::{PrioritySuggestion, ProgressSample};

/// Fewer tracked cards than this and a category's averages are noise.
pub const MIN_CARDS_FOR_SUGGESTION: usize = 3;

pub const DEFAULT_PRIORITY: i64 = 5;

const STRUGGLING_MIN_EXPOSURE: f64 = 5.0;
const STRUGGLING_MAX_MASTERY: f64 = 0.4;
const MASTERED_MIN_MASTERY: f64 = 0.85;

/// A recommended priority for one category, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub category_id: String,
    pub suggested_priority: i64,
    pub reason: String,
}

#[derive(Default)]
struct CategoryStats {
    cards: usize,
    exposure_sum: f64,
    mastery_sum: f64,
}

/// Folds per-card progress into per-category recommendations.
///
/// Struggling categories (well exercised, low mastery) move up by two;
/// mastered ones move down by two. Everything in between is left alone.
pub fn recommend(
    samples: &[ProgressSample],
    current_priority: impl Fn(&str) -> i64,
) -> Vec<Recommendation> {
    let mut stats: BTreeMap<&str, CategoryStats> = BTreeMap::new();
    for sample in samples {
        let entry = stats.entry(sample.category_id.as_str()).or_default();
        entry.cards += 1;
        entry.exposure_sum += sample.exposure_count as f64;
        entry.mastery_sum += sample.mastery_score;
    }

    let mut recommendations = Vec::new();
    for (category_id, s) in stats {
        if s.cards < MIN_CARDS_FOR_SUGGESTION {
            continue;
        }
        let avg_exposure = s.exposure_sum / s.cards as f64;
        let avg_mastery = s.mastery_sum / s.cards as f64;
        let priority = current_priority(category_id);

        if avg_exposure >= STRUGGLING_MIN_EXPOSURE && avg_mastery < STRUGGLING_MAX_MASTERY {
            recommendations.push(Recommendation {
                category_id: category_id.to_string(),
                suggested_priority: (priority + 2).min(10),
                reason: format!(
                    "low mastery ({:.0}%) despite {:.1} average exposures",
                    avg_mastery * 100.0,
                    avg_exposure
                ),
            });
        } else if avg_exposure >= STRUGGLING_MIN_EXPOSURE && avg_mastery >= MASTERED_MIN_MASTERY {
            recommendations.push(Recommendation {
                category_id: category_id.to_string(),
                suggested_priority: (priority - 2).max(1),
                reason: format!("high mastery ({:.0}%)", avg_mastery * 100.0),
            });
        }
    }

    recommendations
}

/// Scans a tenant's progress and records new open suggestions.
///
/// Returns the suggestions created this run. Recommendations matching
/// the current priority, or for categories that already carry an open
/// suggestion, are skipped.
pub fn generate_suggestions(store: &dyn Store, tenant_id: &str) -> Result<Vec<PrioritySuggestion>> {
    let samples = store.list_progress_samples(tenant_id)?;

    let mut priorities: BTreeMap<String, i64> = BTreeMap::new();
    for sample in &samples {
        if !priorities.contains_key(&sample.category_id) {
            let priority = store
                .get_category_priority(tenant_id, &sample.category_id)?
                .unwrap_or(DEFAULT_PRIORITY);
            priorities.insert(sample.category_id.clone(), priority);
        }
    }

    let recommendations = recommend(&samples, |category_id| {
        priorities.get(category_id).copied().unwrap_or(DEFAULT_PRIORITY)
    });

    let now = Utc::now();
    let mut created = Vec::new();
    for rec in recommendations {
        let current = priorities
            .get(&rec.category_id)
            .copied()
            .unwrap_or(DEFAULT_PRIORITY);
        if rec.suggested_priority == current {
            continue;
        }

        let suggestion = PrioritySuggestion {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            category_id: rec.category_id,
            current_priority: current,
            suggested_priority: rec.suggested_priority,
            reason: rec.reason,
            created_at: now,
            applied_at: None,
            dismissed_at: None,
        };
        if store.create_suggestion(&suggestion)? {
            created.push(suggestion);
        }
    }

    tracing::info!(
        tenant_id = %tenant_id,
        created = created.len(),
        "Generated priority suggestions"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(category_id: &str, exposure_count: i64, mastery_score: f64) -> ProgressSample {
        ProgressSample {
            category_id: category_id.to_string(),
            exposure_count,
            mastery_score,
        }
    }

    #[test]
    fn test_struggling_category_moves_up() {
        let samples = vec![
            sample("cat-1", 6, 0.2),
            sample("cat-1", 8, 0.3),
            sample("cat-1", 5, 0.35),
        ];
        let recs = recommend(&samples, |_| 5);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].suggested_priority, 7);
        assert!(recs[0].reason.contains("low mastery"));
    }

    #[test]
    fn test_mastered_category_moves_down() {
        let samples = vec![
            sample("cat-1", 10, 0.9),
            sample("cat-1", 12, 0.88),
            sample("cat-1", 9, 0.95),
        ];
        let recs = recommend(&samples, |_| 5);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].suggested_priority, 3);
    }

    #[test]
    fn test_priority_clamps_at_bounds() {
        let struggling = vec![
            sample("cat-1", 6, 0.1),
            sample("cat-1", 6, 0.1),
            sample("cat-1", 6, 0.1),
        ];
        let recs = recommend(&struggling, |_| 9);
        assert_eq!(recs[0].suggested_priority, 10);

        let mastered = vec![
            sample("cat-2", 6, 0.9),
            sample("cat-2", 6, 0.9),
            sample("cat-2", 6, 0.9),
        ];
        let recs = recommend(&mastered, |_| 2);
        assert_eq!(recs[0].suggested_priority, 1);
    }

    #[test]
    fn test_barely_seen_mastery_is_not_demoted() {
        let samples = vec![
            sample("cat-1", 2, 0.9),
            sample("cat-1", 2, 0.9),
            sample("cat-1", 2, 0.9),
        ];
        assert!(recommend(&samples, |_| 5).is_empty());
    }

    #[test]
    fn test_too_few_cards_is_ignored() {
        let samples = vec![sample("cat-1", 10, 0.1), sample("cat-1", 10, 0.1)];
        assert!(recommend(&samples, |_| 5).is_empty());
    }

    #[test]
    fn test_low_mastery_without_exposure_is_ignored() {
        // Barely-seen cards are not evidence of struggle.
        let samples = vec![
            sample("cat-1", 1, 0.0),
            sample("cat-1", 2, 0.1),
            sample("cat-1", 1, 0.2),
        ];
        assert!(recommend(&samples, |_| 5).is_empty());
    }

    #[test]
    fn test_middling_mastery_is_ignored() {
        let samples = vec![
            sample("cat-1", 8, 0.6),
            sample("cat-1", 8, 0.6),
            sample("cat-1", 8, 0.6),
        ];
        assert!(recommend(&samples, |_| 5).is_empty());
    }
}
