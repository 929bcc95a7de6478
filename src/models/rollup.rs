use crate::models::entity::TrackedEntity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRollup {
    pub entity: TrackedEntity,
    pub year_month: String, // "YYYY-MM"
    pub total_views: u64,
    /// Sum of daily unique counts. Overcounts visitors active on several days.
    pub summed_daily_uniques: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestCounts {
    pub entity: TrackedEntity,
    pub date: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
}
