use super::types::{FeedItem, FeedSnapshot};
use super::FeedSource;
use crate::config::FeedConfig;
use crate::timeparse;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::header;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const FEED_PATH: &str = "/api/v1/home/feed";

/// HTTP feed source for the cafe home feed, authenticated by the session
/// cookie from the environment. Redirects are not followed: a redirect to
/// the login surface is the session-expiry signal.
pub struct CafeFeed {
    client: Client,
    base_url: String,
    /// Normalized `k=v; k=v` header value; `None` when the raw cookie had no
    /// usable pairs (fetch fails without making a request).
    cookie_header: Option<String>,
    max_items: usize,
    /// One-shot debug flag, fresh per instance (and so per run).
    payload_snippet_logged: bool,
}

/// Split a `;`-joined cookie string into (key, value) pairs, dropping
/// malformed fragments.
pub fn parse_cookie_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

fn is_login_redirect(location: &str) -> bool {
    location.contains("nid.naver.com") || location.contains("nidlogin")
}

impl CafeFeed {
    pub fn new(raw_cookie: &str, config: &FeedConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .build()
            .expect("failed to build HTTP client");

        let pairs = parse_cookie_pairs(raw_cookie);
        let cookie_header = if pairs.is_empty() {
            None
        } else {
            Some(
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_header,
            max_items: config.max_items,
            payload_snippet_logged: false,
        }
    }

    /// Log the first part of an unexpected payload, at most once per run.
    fn log_payload_snippet(&mut self, body: &str) {
        if self.payload_snippet_logged {
            tracing::debug!("payload snippet already logged this run, skipping");
            return;
        }
        self.payload_snippet_logged = true;
        let snippet: String = body.chars().take(500).collect();
        tracing::warn!(snippet = %snippet, "feed payload yielded no items");
    }
}

#[async_trait]
impl FeedSource for CafeFeed {
    async fn fetch(&mut self) -> FeedSnapshot {
        let Some(cookie) = self.cookie_header.clone() else {
            tracing::warn!("NAVER_COOKIE is missing or has no key=value pairs");
            return FeedSnapshot::failed();
        };

        let url = format!(
            "{}{}?page=1&pageSize={}",
            self.base_url, FEED_PATH, self.max_items
        );

        let resp = match self.client.get(&url).header(header::COOKIE, cookie).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "feed request failed");
                return FeedSnapshot::failed();
            }
        };

        let status = resp.status();
        if status.is_redirection() {
            let location = resp
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if is_login_redirect(location) {
                tracing::warn!(location, "redirected to login page, session cookie expired");
                return FeedSnapshot::expired();
            }
            tracing::warn!(location, status = %status, "unexpected redirect from feed");
            return FeedSnapshot::failed();
        }
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("feed returned 401, session cookie expired");
            return FeedSnapshot::expired();
        }
        if !status.is_success() {
            tracing::warn!(status = %status, "feed returned non-success status");
            return FeedSnapshot::failed();
        }

        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read feed body");
                return FeedSnapshot::failed();
            }
        };

        let posts = match parse_feed_payload(&body, timeparse::kst_now(), self.max_items) {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse feed payload");
                self.log_payload_snippet(&body);
                return FeedSnapshot::failed();
            }
        };

        if posts.is_empty() {
            self.log_payload_snippet(&body);
        } else {
            tracing::debug!(count = posts.len(), "feed items collected");
        }

        FeedSnapshot::ok(posts)
    }
}

// ── Feed payload deserialization ─────────────────────────────────────

#[derive(Deserialize)]
struct FeedEnvelope {
    message: FeedMessage,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FeedMessage {
    result: FeedResult,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FeedResult {
    items: Vec<FeedEntry>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct FeedEntry {
    subject: String,
    web_url: String,
    write_time_text: String,
    like_count: CountField,
    comment_count: CountField,
}

/// Counts come back as a number or as display text ("좋아요 12"); either way
/// an unparsable value defaults to 0 instead of dropping the item.
#[derive(Deserialize)]
#[serde(untagged)]
enum CountField {
    Num(u32),
    Text(String),
}

impl Default for CountField {
    fn default() -> Self {
        CountField::Num(0)
    }
}

impl CountField {
    fn value(&self) -> u32 {
        match self {
            CountField::Num(n) => *n,
            CountField::Text(s) => {
                let start = match s.find(|c: char| c.is_ascii_digit()) {
                    Some(start) => start,
                    None => return 0,
                };
                s[start..]
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            }
        }
    }
}

/// Parse the feed JSON into items, newest-first as the feed returns them.
/// Per-item problems (missing title or link) drop only that item; a
/// malformed envelope is an error for the caller to classify.
pub fn parse_feed_payload(
    json: &str,
    now: DateTime<FixedOffset>,
    max_items: usize,
) -> Result<Vec<FeedItem>> {
    let envelope: FeedEnvelope =
        serde_json::from_str(json).context("failed to parse feed envelope")?;

    let mut posts = Vec::new();
    for entry in envelope.message.result.items {
        if posts.len() >= max_items {
            break;
        }
        let title = entry.subject.trim().to_string();
        let link = entry.web_url.trim().to_string();
        if title.is_empty() || link.is_empty() {
            tracing::debug!("skipping feed entry with missing title or link");
            continue;
        }
        let relative_time = entry.write_time_text.trim().to_string();
        let absolute_time = timeparse::format_relative_time(&relative_time, now);
        posts.push(FeedItem {
            title,
            link,
            relative_time,
            absolute_time,
            like_count: entry.like_count.value(),
            comment_count: entry.comment_count.value(),
        });
    }
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<FixedOffset> {
        timeparse::kst().with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_cookie_pairs() {
        let pairs = parse_cookie_pairs("NID_AUT=abc; NID_SES=def;broken;=x");
        assert_eq!(
            pairs,
            vec![
                ("NID_AUT".to_string(), "abc".to_string()),
                ("NID_SES".to_string(), "def".to_string()),
            ]
        );
        assert!(parse_cookie_pairs("").is_empty());
        assert!(parse_cookie_pairs("no-equals-here").is_empty());
    }

    #[test]
    fn test_login_redirect_detection() {
        assert!(is_login_redirect("https://nid.naver.com/nidlogin.login?url=x"));
        assert!(is_login_redirect("/nidlogin.login"));
        assert!(!is_login_redirect("https://section.cafe.naver.com/home"));
    }

    #[test]
    fn test_parse_feed_payload() {
        let json = r#"{
            "message": {
                "status": "200",
                "result": {
                    "items": [
                        {
                            "subject": "오늘 저녁 모임 공지",
                            "webUrl": "https://cafe.naver.com/c/1",
                            "writeTimeText": "방금 전",
                            "likeCount": 3,
                            "commentCount": "댓글 5"
                        },
                        {
                            "subject": "  ",
                            "webUrl": "https://cafe.naver.com/c/2",
                            "writeTimeText": "10분 전"
                        },
                        {
                            "subject": "중고 거래합니다",
                            "webUrl": "https://cafe.naver.com/c/3",
                            "writeTimeText": "2시간 전"
                        }
                    ]
                }
            }
        }"#;

        let posts = parse_feed_payload(json, noon(), 20).unwrap();
        // Entry with a blank subject is dropped, the rest survive.
        assert_eq!(posts.len(), 2);

        let first = &posts[0];
        assert_eq!(first.title, "오늘 저녁 모임 공지");
        assert_eq!(first.link, "https://cafe.naver.com/c/1");
        assert_eq!(first.absolute_time, "오후 12:00");
        assert_eq!(first.like_count, 3);
        assert_eq!(first.comment_count, 5);

        let second = &posts[1];
        assert_eq!(second.relative_time, "2시간 전");
        assert_eq!(second.absolute_time, "오전 10:00");
        assert_eq!(second.like_count, 0);
        assert_eq!(second.comment_count, 0);
    }

    #[test]
    fn test_parse_feed_payload_respects_item_cap() {
        let items: Vec<String> = (0..30)
            .map(|i| {
                format!(
                    r#"{{"subject":"post {i}","webUrl":"https://cafe.naver.com/c/{i}","writeTimeText":"{i}분 전"}}"#
                )
            })
            .collect();
        let json = format!(
            r#"{{"message":{{"result":{{"items":[{}]}}}}}}"#,
            items.join(",")
        );

        let posts = parse_feed_payload(&json, noon(), 20).unwrap();
        assert_eq!(posts.len(), 20);
        assert_eq!(posts[0].title, "post 0");
    }

    #[test]
    fn test_parse_feed_payload_rejects_malformed_envelope() {
        assert!(parse_feed_payload("<html>login</html>", noon(), 20).is_err());
        assert!(parse_feed_payload("{}", noon(), 20).is_err());
    }

    #[test]
    fn test_parse_feed_payload_empty_result() {
        let json = r#"{"message":{"result":{"items":[]}}}"#;
        assert!(parse_feed_payload(json, noon(), 20).unwrap().is_empty());
    }

    #[test]
    fn test_count_field_coercion() {
        assert_eq!(CountField::Num(7).value(), 7);
        assert_eq!(CountField::Text("12".to_string()).value(), 12);
        assert_eq!(CountField::Text("좋아요 4".to_string()).value(), 4);
        assert_eq!(CountField::Text("없음".to_string()).value(), 0);
    }

    #[test]
    fn test_missing_cookie_fails_without_request() {
        let feed = CafeFeed::new("", &FeedConfig::default());
        assert!(feed.cookie_header.is_none());
    }
}
