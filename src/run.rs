use crate::alert::CookieExpiryAlerter;
use crate::config::Config;
use crate::feed::types::FeedItem;
use crate::feed::FeedSource;
use crate::health::HealthReporter;
use crate::lock::RunLock;
use crate::notify::NotificationSink;
use crate::store::SeenSetStore;
use crate::timeparse;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SENT_POSTS_FILE: &str = "sent_posts.json";
pub const COOKIE_ALERT_FILE: &str = "cookie_alert_sent.txt";
pub const LOCK_FILE: &str = "bot.lock";

/// Terminal classification of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Ok,
    CookieExpired,
    FetchError,
    TimedOut,
    Interrupted,
    InternalError,
    SkippedConcurrent,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Ok => "ok",
            RunState::CookieExpired => "cookie_expired",
            RunState::FetchError => "fetch_error",
            RunState::TimedOut => "timed_out",
            RunState::Interrupted => "interrupted",
            RunState::InternalError => "internal_error",
            RunState::SkippedConcurrent => "skipped_concurrent",
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub detail: String,
}

impl RunReport {
    fn new(state: RunState, detail: impl Into<String>) -> Self {
        Self {
            state,
            detail: detail.into(),
        }
    }
}

/// Message body for one delivered post.
pub fn format_message(post: &FeedItem) -> String {
    format!(
        "{}\n{}\n{}\n좋아요 {} 댓글 {}",
        post.absolute_time, post.title, post.link, post.like_count, post.comment_count
    )
}

/// Drives one run: lock → deadline → fetch → diff → deliver → persist →
/// health report. Owns the per-run state; nothing here survives between
/// invocations except through the persisted files.
pub struct RunCoordinator {
    store: SeenSetStore,
    alerter: CookieExpiryAlerter,
    health: HealthReporter,
    lock_path: PathBuf,
    deadline: Duration,
    message_delay: Duration,
}

impl RunCoordinator {
    pub fn new(
        store: SeenSetStore,
        alerter: CookieExpiryAlerter,
        health: HealthReporter,
        lock_path: PathBuf,
        deadline: Duration,
        message_delay: Duration,
    ) -> Self {
        Self {
            store,
            alerter,
            health,
            lock_path,
            deadline,
            message_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let data_dir = config.data_dir();
        Self::new(
            SeenSetStore::new(data_dir.join(SENT_POSTS_FILE)),
            CookieExpiryAlerter::new(data_dir.join(COOKIE_ALERT_FILE)),
            HealthReporter::new(
                &data_dir,
                config.storage.health_dir.as_deref().map(Path::new),
            ),
            data_dir.join(LOCK_FILE),
            Duration::from_secs(config.run.deadline_s),
            Duration::from_millis(config.run.message_delay_ms),
        )
    }

    /// Execute one run to a terminal state. Every branch except lock
    /// contention reports its outcome to the health files; contention exits
    /// without touching any persisted state.
    pub async fn run(
        &self,
        feed: &mut dyn FeedSource,
        sink: &dyn NotificationSink,
    ) -> RunReport {
        let _guard = match RunLock::try_acquire(&self.lock_path) {
            Ok(Some(guard)) => Some(guard),
            Ok(None) => {
                tracing::info!("another run holds the lock, skipping");
                return RunReport::new(RunState::SkippedConcurrent, "another run in progress");
            }
            Err(e) => {
                // A broken lock file should not stop collection outright.
                tracing::warn!(error = %format!("{:#}", e), "run lock setup failed, continuing unlocked");
                None
            }
        };

        let report = tokio::select! {
            res = tokio::time::timeout(self.deadline, self.pipeline(feed, sink)) => match res {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    tracing::error!(error = %format!("{:#}", e), "run aborted");
                    RunReport::new(RunState::InternalError, format!("{:#}", e))
                }
                Err(_) => RunReport::new(
                    RunState::TimedOut,
                    format!("deadline exceeded ({}s)", self.deadline.as_secs()),
                ),
            },
            _ = interrupt_signal() => {
                RunReport::new(RunState::Interrupted, "interrupted by signal")
            }
        };

        self.health.report(report.state.as_str(), &report.detail);
        tracing::info!(state = report.state.as_str(), detail = %report.detail, "run finished");
        report
    }

    async fn pipeline(
        &self,
        feed: &mut dyn FeedSource,
        sink: &dyn NotificationSink,
    ) -> Result<RunReport> {
        self.health.report("running", "feed collection started");

        let mut seen = self.store.load();
        tracing::info!(seen = seen.len(), "seen-set loaded");

        let snapshot = feed.fetch().await;

        // Expiry wins over the mechanical fetch flag: an expired session is
        // an alerting condition, not a fetch error.
        if snapshot.session_expired {
            self.alerter
                .maybe_alert(sink, timeparse::kst_now().date_naive())
                .await;
            return Ok(RunReport::new(RunState::CookieExpired, "session cookie expired"));
        }
        if !snapshot.fetch_ok {
            return Ok(RunReport::new(RunState::FetchError, "feed fetch failed"));
        }
        if snapshot.posts.is_empty() {
            return Ok(RunReport::new(RunState::Ok, "no new posts"));
        }

        // Fetch order is newest-first; deliver oldest-first so multiple new
        // posts arrive in chronological order.
        let mut delivered = 0usize;
        for post in snapshot.posts.iter().rev() {
            if seen.iter().any(|link| link == &post.link) {
                continue;
            }

            let message = format_message(post);
            if let Err(e) = sink.send(&message).await {
                // At-most-once-attempt: the link is recorded as seen below
                // even though this send failed, so it is never retried.
                tracing::warn!(link = %post.link, error = %format!("{:#}", e), "delivery failed");
            }
            seen.push(post.link.clone());
            delivered += 1;
            tokio::time::sleep(self.message_delay).await;
        }

        if delivered > 0 {
            self.store.save(&seen);
            Ok(RunReport::new(
                RunState::Ok,
                format!("{} new posts delivered", delivered),
            ))
        } else {
            Ok(RunReport::new(RunState::Ok, "no unseen posts"))
        }
    }
}

/// Resolves when the process receives an interrupt. If the handler cannot
/// be installed the run proceeds without interrupt support.
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install interrupt handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::FeedItem;

    #[test]
    fn test_state_strings() {
        assert_eq!(RunState::Ok.as_str(), "ok");
        assert_eq!(RunState::CookieExpired.as_str(), "cookie_expired");
        assert_eq!(RunState::FetchError.as_str(), "fetch_error");
        assert_eq!(RunState::TimedOut.as_str(), "timed_out");
        assert_eq!(RunState::Interrupted.as_str(), "interrupted");
        assert_eq!(RunState::SkippedConcurrent.as_str(), "skipped_concurrent");
    }

    #[test]
    fn test_message_format() {
        let post = FeedItem {
            title: "오늘 저녁 모임 공지".to_string(),
            link: "https://cafe.naver.com/c/1".to_string(),
            relative_time: "방금 전".to_string(),
            absolute_time: "오후 3:07".to_string(),
            like_count: 3,
            comment_count: 5,
        };
        assert_eq!(
            format_message(&post),
            "오후 3:07\n오늘 저녁 모임 공지\nhttps://cafe.naver.com/c/1\n좋아요 3 댓글 5"
        );
    }
}
