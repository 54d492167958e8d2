//! Error types for the synchronization layer.
//!
//! The taxonomy follows the three failure surfaces: the one-shot pull, the
//! normalization of push payloads, and the push channel itself. Only pull
//! failures are user-visible error state; the other two degrade gracefully.

use thiserror::Error;

/// The initial (or refreshed) snapshot pull failed.
///
/// Surfaces to consumers via `StoreView::error` and resets derived state to
/// zeroed defaults so stale numbers never sit next to an error banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source could not be reached or read.
    #[error("snapshot read failed: {0}")]
    Io(String),

    /// The source responded with something that is not a metrics payload.
    #[error("snapshot payload could not be parsed: {0}")]
    Parse(String),

    /// The pull did not complete within the configured bound.
    #[error("snapshot fetch timed out")]
    Timeout,
}

/// A wire payload could not be converted to canonical form.
///
/// Swallowed at the service boundary: the payload is discarded with a
/// diagnostic, existing good state is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Payload matches neither known wire shape.
    #[error("payload matches no known wire shape")]
    UnrecognizedSchema,

    /// Payload carries the right shape markers but undecodable content.
    #[error("payload failed to decode: {0}")]
    InvalidPayload(String),
}

/// The push mechanism is not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// No push mechanism was configured at startup; the store serves the
    /// initial snapshot and simply never receives further updates.
    #[error("update channel unavailable")]
    Unavailable,
}
