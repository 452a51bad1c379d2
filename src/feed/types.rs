/// One post surfaced by the cafe feed. Identity is `link`; everything else
/// is descriptive. Built fresh on every fetch and never mutated.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Raw relative-time string as the feed rendered it ("30분 전").
    pub relative_time: String,
    /// Clock label derived from `relative_time`, e.g. "오후 3:07".
    pub absolute_time: String,
    pub like_count: u32,
    pub comment_count: u32,
}

/// Result of one fetch against the feed. Mirrors the three-way contract the
/// coordinator branches on: `session_expired` wins over `fetch_ok`, and an
/// empty `posts` with `fetch_ok` is a legitimate "nothing new".
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    /// Up to 20 items, newest-first.
    pub posts: Vec<FeedItem>,
    pub session_expired: bool,
    pub fetch_ok: bool,
}

impl FeedSnapshot {
    /// Fetch mechanism itself failed (auth absent, transport error, timeout).
    pub fn failed() -> Self {
        Self::default()
    }

    /// Fetch worked but the source bounced us to a login surface.
    pub fn expired() -> Self {
        Self {
            posts: Vec::new(),
            session_expired: true,
            fetch_ok: true,
        }
    }

    pub fn ok(posts: Vec<FeedItem>) -> Self {
        Self {
            posts,
            session_expired: false,
            fetch_ok: true,
        }
    }
}
