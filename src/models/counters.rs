use serde::{Deserialize, Serialize};

/// Popularity counters captured on `date` (UTC day of capture).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub date: String,
    pub stars: u64,
    pub forks: u64,
    /// Subscriber count, not stargazers.
    pub watchers: u64,
}
