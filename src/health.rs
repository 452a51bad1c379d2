use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const HEARTBEAT_FILE: &str = "last_run.txt";
pub const STATUS_FILE: &str = "bot_status.json";

/// Persisted snapshot of the most recent run outcome, read by humans and by
/// the external watchdog.
#[derive(Serialize)]
struct StatusRecord<'a> {
    updated_at: String,
    last_run_ts: f64,
    state: &'a str,
    detail: &'a str,
    pid: u32,
    cwd: String,
}

/// Writes the heartbeat and status record to every candidate directory so
/// an external watchdog can find them regardless of where the scheduler
/// launched us from. Individual target failures are logged, never fatal.
pub struct HealthReporter {
    targets: Vec<PathBuf>,
}

impl HealthReporter {
    /// Resolve candidate directories: the data dir, its parent, the current
    /// working directory, plus the `CAFEWATCH_HEALTH_DIR` env override and
    /// the configured extra dir. Only existing directories are kept; the
    /// data dir is the fallback when nothing else resolves.
    pub fn new(data_dir: &Path, extra_dir: Option<&Path>) -> Self {
        let mut candidates: Vec<PathBuf> = vec![data_dir.to_path_buf()];
        if let Some(parent) = data_dir.parent() {
            if !parent.as_os_str().is_empty() {
                candidates.push(parent.to_path_buf());
            }
        }
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd);
        }
        if let Ok(env_dir) = std::env::var("CAFEWATCH_HEALTH_DIR") {
            if !env_dir.trim().is_empty() {
                candidates.push(PathBuf::from(env_dir.trim()));
            }
        }
        if let Some(extra) = extra_dir {
            candidates.push(extra.to_path_buf());
        }

        let mut targets = Vec::new();
        let mut seen = Vec::new();
        for candidate in candidates {
            let key = candidate
                .canonicalize()
                .unwrap_or_else(|_| candidate.clone());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            if candidate.is_dir() {
                targets.push(candidate);
            }
        }
        if targets.is_empty() {
            targets.push(data_dir.to_path_buf());
        }

        Self { targets }
    }

    /// Fixed target list, used by tests.
    pub fn with_targets(targets: Vec<PathBuf>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    /// Record the run state to heartbeat + status in every target.
    pub fn report(&self, state: &str, detail: &str) {
        let now_ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let record = StatusRecord {
            updated_at: Utc::now().to_rfc3339(),
            last_run_ts: now_ts,
            state,
            detail,
            pid: std::process::id(),
            cwd: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };
        let status_json = match serde_json::to_string_pretty(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize status record");
                return;
            }
        };

        let mut wrote = 0usize;
        for target in &self.targets {
            if let Err(e) = std::fs::write(target.join(HEARTBEAT_FILE), format!("{}\n", now_ts)) {
                tracing::warn!(target = %target.display(), error = %e, "heartbeat write failed");
            } else {
                wrote += 1;
            }
            if let Err(e) = std::fs::write(target.join(STATUS_FILE), &status_json) {
                tracing::warn!(target = %target.display(), error = %e, "status write failed");
            }
        }

        if wrote == 0 {
            tracing::warn!(state, "no health target accepted the heartbeat");
        } else {
            tracing::debug!(state, detail, targets = wrote, "health files updated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_writes_heartbeat_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = HealthReporter::with_targets(vec![dir.path().to_path_buf()]);
        reporter.report("ok", "3 new posts delivered");

        let heartbeat = std::fs::read_to_string(dir.path().join(HEARTBEAT_FILE)).unwrap();
        let ts: f64 = heartbeat.trim().parse().unwrap();
        assert!(ts > 0.0);

        let status = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&status).unwrap();
        assert_eq!(parsed["state"], "ok");
        assert_eq!(parsed["detail"], "3 new posts delivered");
        assert!(parsed["pid"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_report_survives_bad_targets() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = HealthReporter::with_targets(vec![
            PathBuf::from("/nonexistent-dir"),
            dir.path().to_path_buf(),
        ]);
        reporter.report("error", "feed fetch failed");
        assert!(dir.path().join(HEARTBEAT_FILE).exists());
    }

    #[test]
    fn test_candidate_resolution_dedups_and_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = HealthReporter::new(dir.path(), Some(dir.path()));
        let matching = reporter
            .targets()
            .iter()
            .filter(|t| t.as_path() == dir.path())
            .count();
        assert_eq!(matching, 1);
    }
}
