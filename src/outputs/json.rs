//! JSON report files.
//!
//! Reports are grouped by local date, one file per run, named after the
//! command that produced them and the local time it finished.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the report written at `now` for `kind`.
pub fn report_path(json_output_dir: &str, kind: &str, now: DateTime<Local>) -> String {
    format!(
        "{}/{}/{}-{}.json",
        json_output_dir.trim_end_matches('/'),
        now.format("%Y-%m-%d"),
        kind,
        now.format("%H%M%S")
    )
}

/// Serialize `report` under `{json_output_dir}/{date}/{kind}-{time}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, kind = %kind))]
pub async fn write_report<T: Serialize>(
    report: &T,
    json_output_dir: &str,
    kind: &str,
) -> Result<String, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(json_output_dir, kind, Local::now());

    if let Some((dir, _)) = path.rsplit_once('/') {
        info!(%dir, "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(%dir, error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(%path, "Wrote JSON report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_path_layout() {
        let now = Local.with_ymd_and_hms(2026, 2, 16, 8, 15, 0).unwrap();
        assert_eq!(
            report_path("/tmp/out/", "collection", now),
            "/tmp/out/2026-02-16/collection-081500.json"
        );
    }

    #[tokio::test]
    async fn test_write_report_creates_dated_file() {
        let dir = std::env::temp_dir().join(format!("court_news_watch_{}", std::process::id()));
        let dir = dir.to_str().unwrap().to_string();
        let report = serde_json::json!({"results": [], "warnings": ["x"]});

        let path = write_report(&report, &dir, "collection").await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, report);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
