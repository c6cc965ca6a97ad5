//! Training history records
//!
//! Request paths and record types of the service's history API. Fetching is
//! up to the host.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HISTORY_PATH: &str = "/api/training-history";

/// Listing order by session timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filter for the session list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub sort: SortOrder,
    /// Inclusive lower bound, `YYYY-MM-DD`
    pub date_from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    pub date_to: Option<String>,
}

impl HistoryQuery {
    /// List request path with the query string
    pub fn path(&self) -> String {
        let mut params = vec![format!("sort={}", self.sort.as_str())];
        if let Some(from) = &self.date_from {
            params.push(format!("dateFrom={}", urlencoding::encode(from)));
        }
        if let Some(to) = &self.date_to {
            params.push(format!("dateTo={}", urlencoding::encode(to)));
        }
        format!("{}?{}", HISTORY_PATH, params.join("&"))
    }
}

/// Path of a single session, used for both detail and delete requests
pub fn session_path(id: i64) -> String {
    format!("{}/{}", HISTORY_PATH, id)
}

/// Per-exercise result within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseResult {
    pub exercise_type: String,
    pub exercise_name: String,
    pub reps: u32,
    pub errors: u32,
    #[serde(default)]
    pub error_details: BTreeMap<String, u32>,
    /// Percent change against the historical average
    pub reps_improvement: Option<f64>,
    pub errors_improvement: Option<f64>,
}

/// A stored training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Option<i64>,
    pub timestamp: NaiveDateTime,
    pub duration_seconds: u64,
    pub total_reps: u32,
    pub total_errors: u32,
    pub rounds: u32,
    #[serde(default)]
    pub exercises_config: String,
    pub overall_reps_improvement: Option<f64>,
    pub overall_errors_improvement: Option<f64>,
    #[serde(default)]
    pub exercise_results: Vec<ExerciseResult>,
}

impl SessionSummary {
    /// Whether the session beat the average rep count
    pub fn improved_reps(&self) -> Option<bool> {
        self.overall_reps_improvement.map(|pct| pct > 0.0)
    }

    /// Errors are better when lower, the service already flips the sign
    pub fn improved_errors(&self) -> Option<bool> {
        self.overall_errors_improvement.map(|pct| pct > 0.0)
    }

    /// Duration as `mm:ss`
    pub fn duration_display(&self) -> String {
        crate::session::format_elapsed(self.duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_default_query_path() {
        assert_eq!(HistoryQuery::default().path(), "/api/training-history?sort=desc");
    }

    #[test]
    fn test_query_path_encodes_dates() {
        let query = HistoryQuery {
            sort: SortOrder::Asc,
            date_from: Some("2024-05-01".to_string()),
            date_to: Some("2024 05 31".to_string()),
        };
        assert_eq!(
            query.path(),
            "/api/training-history?sort=asc&dateFrom=2024-05-01&dateTo=2024%2005%2031"
        );
    }

    #[test]
    fn test_session_path() {
        assert_eq!(session_path(42), "/api/training-history/42");
    }

    #[test]
    fn test_parse_summary() {
        let json = r#"{
            "id": 7,
            "timestamp": "2024-05-03T18:22:05.123456",
            "duration_seconds": 754,
            "total_reps": 60,
            "total_errors": 4,
            "rounds": 3,
            "exercises_config": "[\"bicep_curl\"]",
            "overall_reps_improvement": 12.5,
            "overall_errors_improvement": null,
            "exercise_results": [{
                "exercise_type": "bicep_curl",
                "exercise_name": "Bicep curl",
                "reps": 60,
                "errors": 4,
                "error_details": { "trunk_tilted": 3, "elbows_too_wide": 1 },
                "reps_improvement": 12.5,
                "errors_improvement": null
            }]
        }"#;

        let summary: SessionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.timestamp.day(), 3);
        assert_eq!(summary.timestamp.hour(), 18);
        assert_eq!(summary.duration_display(), "12:34");
        assert_eq!(summary.improved_reps(), Some(true));
        assert_eq!(summary.improved_errors(), None);
        assert_eq!(summary.exercise_results[0].error_details["trunk_tilted"], 3);
    }
}
