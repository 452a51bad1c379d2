use crate::notify::NotificationSink;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Fixed alert sent when the session cookie has expired.
pub const COOKIE_ALERT_MESSAGE: &str = "⚠️ [긴급] 네이버 쿠키가 만료되었습니다!\n\n\
    봇이 더 이상 정상 수집할 수 없습니다.\n\
    PC에서 네이버 카페 로그인 후 새 쿠키를 복사하여 .env를 갱신해주세요.";

/// Suppresses duplicate session-expiry alerts to at most one per calendar
/// day, tracked by a single `YYYY-MM-DD` stamp file.
///
/// Stamp I/O failures fail open: a stamp that cannot be read or written
/// means the alert may repeat, never that it stays silent forever.
pub struct CookieExpiryAlerter {
    stamp_path: PathBuf,
}

impl CookieExpiryAlerter {
    pub fn new(stamp_path: impl Into<PathBuf>) -> Self {
        Self {
            stamp_path: stamp_path.into(),
        }
    }

    fn already_sent(&self, today: &str) -> bool {
        match std::fs::read_to_string(&self.stamp_path) {
            Ok(stamp) => stamp.trim() == today,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %self.stamp_path.display(), error = %e, "failed to read alert stamp");
                false
            }
        }
    }

    /// Send the expiry alert unless one already went out today. Returns
    /// whether an alert was sent.
    pub async fn maybe_alert(&self, sink: &dyn NotificationSink, today: NaiveDate) -> bool {
        let today = today.format("%Y-%m-%d").to_string();
        if self.already_sent(&today) {
            tracing::info!("cookie expiry alert already sent today, suppressing");
            return false;
        }

        if let Err(e) = sink.send(COOKIE_ALERT_MESSAGE).await {
            tracing::warn!(error = %e, "cookie expiry alert delivery failed");
        }
        if let Err(e) = std::fs::write(&self.stamp_path, &today) {
            tracing::warn!(path = %self.stamp_path.display(), error = %e, "failed to record alert stamp");
        }
        true
    }
}
