use crate::health::HEARTBEAT_FILE;
use crate::notify::NotificationSink;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_STALL_THRESHOLD: Duration = Duration::from_secs(600);

#[derive(Debug, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// Heartbeat file absent: the bot never ran here, or the file was
    /// removed. Logged, no alert.
    MissingHeartbeat,
    Healthy { elapsed_secs: u64 },
    Stalled { elapsed_secs: u64 },
}

/// Independent liveness check over the heartbeat file. Runs as a separate
/// invocation (`--watchdog`), cooperating with the collector only through
/// that file.
pub struct Watchdog {
    heartbeat_path: PathBuf,
    threshold: Duration,
}

impl Watchdog {
    pub fn new(health_dir: impl Into<PathBuf>, threshold: Duration) -> Self {
        Self {
            heartbeat_path: health_dir.into().join(HEARTBEAT_FILE),
            threshold,
        }
    }

    /// Read the heartbeat, compute elapsed time, and alert through the sink
    /// when the collector looks stalled.
    pub async fn check(&self, sink: &dyn NotificationSink) -> Result<WatchdogStatus> {
        let raw = match std::fs::read_to_string(&self.heartbeat_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.heartbeat_path.display(), "heartbeat file missing, bot may never have run");
                return Ok(WatchdogStatus::MissingHeartbeat);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read heartbeat {}", self.heartbeat_path.display())
                })
            }
        };

        let last_run_ts: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("malformed heartbeat timestamp: {:?}", raw.trim()))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before epoch")?
            .as_secs_f64();
        let elapsed_secs = (now - last_run_ts).max(0.0) as u64;

        if elapsed_secs > self.threshold.as_secs() {
            let minutes = elapsed_secs / 60;
            let message = format!(
                "🚨 [비상] 네이버 카페 봇이 멈췄습니다!\n\n마지막 실행: {}분 전\n서버 상태를 확인해주세요.",
                minutes
            );
            tracing::warn!(elapsed_secs, "bot heartbeat is stale, alerting");
            if let Err(e) = sink.send(&message).await {
                tracing::warn!(error = %format!("{:#}", e), "stall alert delivery failed");
            }
            Ok(WatchdogStatus::Stalled { elapsed_secs })
        } else {
            tracing::info!(elapsed_secs, "bot heartbeat is fresh");
            Ok(WatchdogStatus::Healthy { elapsed_secs })
        }
    }
}
