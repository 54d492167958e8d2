//! Data acquisition seams.
//!
//! Two ways in: a one-shot pull of a full metrics payload
//! ([`SnapshotFetch`]), and a continuous push of payloads by topic
//! ([`UpdateBus`]). Both hand the store *raw* JSON: shape detection
//! belongs to the normalizer, so no source ever needs to know which
//! producer generation it is talking to.

mod bus;
mod file;
mod stream;

pub use bus::{Subscription, UpdateBus, METRICS_TOPIC};
pub use file::FileFetch;
pub use stream::spawn_feed;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// One-shot pull of a full metrics payload from an external source.
#[async_trait]
pub trait SnapshotFetch: Send + Sync {
    /// Perform the pull. One request, no parameters.
    async fn fetch(&self) -> Result<Value, FetchError>;

    /// Human-readable description of the source, for logs.
    fn description(&self) -> &str;
}
