//! GitHub REST reads for traffic views and repository counters.
//!
//! Upstream payloads are normalized here (timestamp to calendar day, missing
//! numbers to zero) so the store only ever sees [`DailyTrafficRecord`] and
//! [`CounterSnapshot`].

use crate::error::{LedgerError, Result};
use crate::models::counters::CounterSnapshot;
use crate::models::entity::TrackedEntity;
use crate::models::traffic::DailyTrafficRecord;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_API_ROOT: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// Where traffic and counter readings come from.
pub trait MetricsSource {
    fn fetch_traffic(&self, entity: &TrackedEntity) -> Result<Vec<DailyTrafficRecord>>;

    fn fetch_counters(&self, entity: &TrackedEntity) -> Result<CounterSnapshot>;
}

#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    pub api_root: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct GithubClient {
    config: GithubClientConfig,
    client: reqwest::blocking::Client,
}

impl GithubClient {
    pub fn new(config: GithubClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("traffic-ledger/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| LedgerError::Transport {
                path: config.api_root.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { config, client })
    }

    fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.config.api_root.trim_end_matches('/'), path);
        log::debug!("GET {url}");

        let mut request = self.client.get(&url);
        let token = self.config.token.as_deref().map(str::trim);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let transport = |e: reqwest::Error| LedgerError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        };

        let response = request.send().map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().map_err(transport)?;

        if !status.is_success() {
            return Err(LedgerError::Upstream {
                status: status.as_u16(),
                path: path.to_string(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| LedgerError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

impl MetricsSource for GithubClient {
    fn fetch_traffic(&self, entity: &TrackedEntity) -> Result<Vec<DailyTrafficRecord>> {
        let path = format!("/repos/{}/{}/traffic/views", entity.owner, entity.repo);
        let payload = self.get_json(&path)?;
        parse_traffic_payload(&payload).map_err(|message| LedgerError::Decode { path, message })
    }

    fn fetch_counters(&self, entity: &TrackedEntity) -> Result<CounterSnapshot> {
        let path = format!("/repos/{}/{}", entity.owner, entity.repo);
        let payload = self.get_json(&path)?;
        parse_counters_payload(&payload, &today_utc())
            .map_err(|message| LedgerError::Decode { path, message })
    }
}

/// `{"views": [{"timestamp", "count", "uniques"}, ...]}` to one record per day.
pub fn parse_traffic_payload(
    payload: &Value,
) -> std::result::Result<Vec<DailyTrafficRecord>, String> {
    let obj = payload
        .as_object()
        .ok_or_else(|| "traffic payload is not a JSON object".to_string())?;

    let views = match obj.get("views") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err("`views` is not an array".to_string()),
    };

    let records = views
        .iter()
        .filter_map(|item| {
            let Some(date) = item
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(calendar_day)
            else {
                log::debug!("skipping traffic entry without a usable timestamp: {item}");
                return None;
            };

            Some(DailyTrafficRecord {
                date,
                views: count_field(item, "count"),
                uniques: count_field(item, "uniques"),
            })
        })
        .collect();

    Ok(records)
}

/// Repository object to a snapshot stamped with `date`. Absent counters are zero.
pub fn parse_counters_payload(
    payload: &Value,
    date: &str,
) -> std::result::Result<CounterSnapshot, String> {
    if !payload.is_object() {
        return Err("repository payload is not a JSON object".to_string());
    }

    Ok(CounterSnapshot {
        date: date.to_string(),
        stars: count_field(payload, "stargazers_count"),
        forks: count_field(payload, "forks_count"),
        watchers: count_field(payload, "subscribers_count"),
    })
}

pub fn today_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn calendar_day(timestamp: &str) -> Option<String> {
    let day = timestamp.get(..10)?;
    chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    Some(day.to_string())
}

fn count_field(value: &Value, key: &str) -> u64 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncates_timestamps_to_calendar_days() {
        let payload = json!({
            "count": 22,
            "uniques": 7,
            "views": [
                {"timestamp": "2024-03-05T00:00:00Z", "count": 10, "uniques": 4},
                {"timestamp": "2024-03-06T00:00:00Z", "count": 12, "uniques": 3}
            ]
        });

        let records = parse_traffic_payload(&payload).unwrap();
        assert_eq!(
            records,
            vec![
                DailyTrafficRecord {
                    date: "2024-03-05".into(),
                    views: 10,
                    uniques: 4,
                },
                DailyTrafficRecord {
                    date: "2024-03-06".into(),
                    views: 12,
                    uniques: 3,
                },
            ]
        );
    }

    #[test]
    fn missing_views_array_yields_no_records() {
        assert!(parse_traffic_payload(&json!({"count": 0})).unwrap().is_empty());
        assert!(parse_traffic_payload(&json!({"views": []})).unwrap().is_empty());
    }

    #[test]
    fn malformed_views_shape_is_an_error() {
        assert!(parse_traffic_payload(&json!({"views": "nope"})).is_err());
        assert!(parse_traffic_payload(&json!([1, 2])).is_err());
    }

    #[test]
    fn traffic_entries_default_missing_counts_and_skip_bad_timestamps() {
        let payload = json!({
            "views": [
                {"timestamp": "2024-03-05T00:00:00Z"},
                {"timestamp": "garbage", "count": 3},
                {"count": 1}
            ]
        });

        let records = parse_traffic_payload(&payload).unwrap();
        assert_eq!(
            records,
            vec![DailyTrafficRecord {
                date: "2024-03-05".into(),
                views: 0,
                uniques: 0,
            }]
        );
    }

    #[test]
    fn counters_without_forks_default_to_zero() {
        let payload = json!({"stargazers_count": 42, "subscribers_count": 5});
        let snapshot = parse_counters_payload(&payload, "2024-03-05").unwrap();

        assert_eq!(snapshot.date, "2024-03-05");
        assert_eq!(snapshot.stars, 42);
        assert_eq!(snapshot.forks, 0);
        assert_eq!(snapshot.watchers, 5);
    }

    #[test]
    fn watchers_come_from_subscribers_not_stars() {
        let payload = json!({
            "stargazers_count": 100,
            "watchers_count": 100,
            "subscribers_count": 3,
            "forks_count": 8
        });
        let snapshot = parse_counters_payload(&payload, "2024-03-05").unwrap();
        assert_eq!(snapshot.watchers, 3);
        assert_eq!(snapshot.forks, 8);
    }

    #[test]
    fn today_is_a_calendar_day() {
        let today = today_utc();
        assert_eq!(today.len(), 10);
        assert!(calendar_day(&today).is_some());
    }
}
