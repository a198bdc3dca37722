mod models;
mod tier;

pub use models::*;
pub use tier::{Limit, MAX_BATCH_CARDS, Tier, TierLimits};
