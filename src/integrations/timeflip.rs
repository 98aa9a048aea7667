use crate::models::{DailyReport, TaskDuration};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

#[derive(Debug)]
pub enum SyncError {
    Config(String),
    Auth(String),
    Request(String),
    Malformed(String),
    Io(String),
}

impl SyncError {
    pub fn message(&self) -> String {
        match self {
            SyncError::Config(msg)
            | SyncError::Auth(msg)
            | SyncError::Request(msg)
            | SyncError::Malformed(msg)
            | SyncError::Io(msg) => msg.clone(),
        }
    }
}

impl From<io::Error> for SyncError {
    fn from(err: io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ReportRequest<'a> {
    #[serde(rename = "beginDateStr", skip_serializing_if = "Option::is_none")]
    begin_date_str: Option<&'a str>,
    #[serde(rename = "endDateStr", skip_serializing_if = "Option::is_none")]
    end_date_str: Option<&'a str>,
}

#[derive(Deserialize)]
struct ReportResponse {
    weeks: Vec<ReportWeek>,
}

#[derive(Deserialize)]
struct ReportWeek {
    days: Vec<ReportDay>,
}

#[derive(Deserialize)]
struct ReportDay {
    #[serde(rename = "dateStr")]
    date_str: String,
    #[serde(rename = "tasksInfo")]
    tasks_info: Vec<ReportTaskInfo>,
}

#[derive(Deserialize)]
struct ReportTaskInfo {
    task: ReportTask,
    #[serde(rename = "totalTime")]
    total_time: u64,
}

#[derive(Deserialize)]
struct ReportTask {
    name: String,
}

#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

pub fn build_client(timeout_seconds: u64) -> Result<Client, SyncError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.max(5)))
        .build()
        .map_err(|e| SyncError::Request(format!("Failed to create HTTP client: {e}")))
}

/// Exchanges account credentials for a bearer token. The token arrives in
/// the response `token` header, not the body.
pub fn sign_in(
    client: &Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> Result<String, SyncError> {
    let resp = client
        .post(format!("{base_url}/api/auth/email/sign-in"))
        .json(&SignInRequest { email, password })
        .send()
        .map_err(|e| SyncError::Request(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(SyncError::Auth(format!(
            "Sign-in failed: HTTP {}",
            resp.status()
        )));
    }

    token_from_headers(resp.headers())
        .ok_or_else(|| SyncError::Auth("Sign-in response carried no token header.".to_string()))
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("token")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Fetches the daily report for an inclusive date range, keyed by date.
/// Omitting both bounds requests the full available history.
pub fn fetch_daily_reports(
    client: &Client,
    base_url: &str,
    token: &str,
    begin_date_str: Option<&str>,
    end_date_str: Option<&str>,
) -> Result<HashMap<String, DailyReport>, SyncError> {
    let resp = client
        .post(format!("{base_url}/report/daily"))
        .bearer_auth(token)
        .json(&ReportRequest {
            begin_date_str,
            end_date_str,
        })
        .send()
        .map_err(|e| SyncError::Request(e.to_string()))?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SyncError::Auth(format!(
            "Report request rejected (HTTP {status}). The token may have expired; run sign-in again."
        )));
    }
    if !status.is_success() {
        return Err(SyncError::Request(format!(
            "Report request failed: HTTP {status}"
        )));
    }

    let body = resp.text().map_err(|e| SyncError::Request(e.to_string()))?;
    parse_report_body(&body)
}

/// Collapses the raw weekly report payload into one entry per date.
/// A body that does not match the weeks/days/tasksInfo shape is a malformed
/// response, not an empty result.
pub fn parse_report_body(body: &str) -> Result<HashMap<String, DailyReport>, SyncError> {
    let response: ReportResponse = serde_json::from_str(body)
        .map_err(|e| SyncError::Malformed(format!("Unexpected report payload: {e}")))?;
    Ok(flatten_report(response))
}

fn flatten_report(response: ReportResponse) -> HashMap<String, DailyReport> {
    let mut reports = HashMap::new();
    for week in response.weeks {
        for day in week.days {
            let tasks = day
                .tasks_info
                .into_iter()
                .map(|info| TaskDuration::from_seconds(info.task.name, info.total_time))
                .collect();
            // The source payload should not repeat a date; last one wins if
            // it does.
            reports.insert(
                day.date_str.clone(),
                DailyReport {
                    date_str: day.date_str,
                    tasks,
                },
            );
        }
    }
    reports
}

/// Reads the token stored by the last successful sign-in.
pub fn load_token(path: &Path) -> Result<String, SyncError> {
    if !path.exists() {
        return Err(SyncError::Auth(
            "Not signed in. Run `flipsync sign-in` first.".to_string(),
        ));
    }
    let content = fs::read_to_string(path)?;
    let stored: StoredToken = serde_json::from_str(&content)
        .map_err(|e| SyncError::Io(format!("Failed to read token file: {e}")))?;
    Ok(stored.token)
}

pub fn save_token(path: &Path, token: &str) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&StoredToken {
        token: token.to_string(),
    })
    .map_err(|e| SyncError::Io(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use std::path::PathBuf;

    fn temp_state_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        dir.push(format!("flipsync-test-{}-{}", std::process::id(), stamp));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn parse_flattens_weeks_into_dates() {
        let body = r#"{"weeks":[
            {"days":[
                {"dateStr":"2024-04-29","tasksInfo":[{"task":{"name":"Writing"},"totalTime":600}]},
                {"dateStr":"2024-04-30","tasksInfo":[]}
            ]},
            {"days":[
                {"dateStr":"2024-05-01","tasksInfo":[
                    {"task":{"name":"Writing"},"totalTime":1850},
                    {"task":{"name":"Email"},"totalTime":29}
                ]}
            ]}
        ]}"#;

        let reports = parse_report_body(body).expect("parse");
        let mut dates: Vec<&str> = reports.keys().map(String::as_str).collect();
        dates.sort();
        assert_eq!(dates, ["2024-04-29", "2024-04-30", "2024-05-01"]);

        let day = &reports["2024-05-01"];
        assert_eq!(day.date_str, "2024-05-01");
        assert_eq!(
            day.tasks,
            vec![
                TaskDuration::from_seconds("Writing".to_string(), 1850),
                TaskDuration::from_seconds("Email".to_string(), 29),
            ]
        );
        assert_eq!(day.tasks[0].total_time_min, 31);
        assert_eq!(day.tasks[1].total_time_min, 0);
    }

    #[test]
    fn parse_keeps_last_entry_for_duplicate_date() {
        let body = r#"{"weeks":[
            {"days":[{"dateStr":"2024-05-01","tasksInfo":[{"task":{"name":"Old"},"totalTime":60}]}]},
            {"days":[{"dateStr":"2024-05-01","tasksInfo":[{"task":{"name":"New"},"totalTime":120}]}]}
        ]}"#;

        let reports = parse_report_body(body).expect("parse");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports["2024-05-01"].tasks[0].name, "New");
    }

    #[test]
    fn parse_rejects_unexpected_shape() {
        let err = parse_report_body(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, SyncError::Malformed(_)));

        let err = parse_report_body("not json at all").unwrap_err();
        assert!(matches!(err, SyncError::Malformed(_)));
    }

    #[test]
    fn parse_accepts_empty_report() {
        let reports = parse_report_body(r#"{"weeks":[]}"#).expect("parse");
        assert!(reports.is_empty());
    }

    #[test]
    fn report_request_omits_absent_bounds() {
        let unscoped = serde_json::to_value(ReportRequest {
            begin_date_str: None,
            end_date_str: None,
        })
        .expect("serialize");
        assert_eq!(unscoped, json!({}));

        let scoped = serde_json::to_value(ReportRequest {
            begin_date_str: Some("2024-05-01"),
            end_date_str: Some("2024-05-01"),
        })
        .expect("serialize");
        assert_eq!(
            scoped,
            json!({"beginDateStr": "2024-05-01", "endDateStr": "2024-05-01"})
        );
    }

    #[test]
    fn token_header_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert("token", HeaderValue::from_static("  "));
        assert_eq!(token_from_headers(&headers), None);

        headers.insert("token", HeaderValue::from_static("abc123"));
        assert_eq!(token_from_headers(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn token_roundtrip() {
        let path = temp_state_dir().join("state").join("token.json");
        save_token(&path, "abc123").expect("save");
        assert_eq!(load_token(&path).expect("load"), "abc123");
    }

    #[test]
    fn missing_token_file_is_an_auth_error() {
        let path = temp_state_dir().join("token.json");
        let err = load_token(&path).unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }
}
