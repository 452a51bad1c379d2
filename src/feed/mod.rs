pub mod cafe;
pub mod types;

use async_trait::async_trait;
use types::FeedSnapshot;

/// Produces one snapshot of the feed per invocation. Implementations never
/// error out of this call: transport and auth failures are folded into the
/// snapshot's `fetch_ok` / `session_expired` flags so the coordinator has a
/// single classification point.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&mut self) -> FeedSnapshot;
}
