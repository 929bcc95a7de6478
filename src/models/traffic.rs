use serde::{Deserialize, Serialize};

/// Views and unique visitors for one calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTrafficRecord {
    pub date: String,
    pub views: u64,
    pub uniques: u64,
}
