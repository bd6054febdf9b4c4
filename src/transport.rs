//! The `Transport` collaborator (§6): everything the executor needs to get
//! an encoded COMPOUND request to a server and an encoded reply back.
//!
//! This crate ships no real RPC transport; production callers wire in their
//! own (TCP to an RPC/TLS endpoint, an in-kernel channel, whatever fronts
//! the NFSv4.1 session). Tests and the demo binary use an in-memory
//! implementation that talks directly to a fake compound evaluator.

use async_trait::async_trait;

/// Why a round-trip failed, distinguishing conditions the executor retries
/// from ones it reports straight back to the caller (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection dropped, reset, or refused mid-call.
    Disconnected(String),
    /// No reply arrived within the transport's own deadline.
    TimedOut,
    /// Any other collaborator-reported failure.
    Other(String),
}

impl TransportError {
    /// Whether the executor's retry loop should treat this the same as a
    /// transient NFS4ERR_DELAY/GRACE (§4.4).
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Disconnected(_) | TransportError::TimedOut)
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Disconnected(msg) => write!(f, "disconnected: {msg}"),
            TransportError::TimedOut => write!(f, "timed out"),
            TransportError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Sends one already-encoded COMPOUND request and returns the matching
/// encoded reply. Implementations own their own connection state,
/// reconnect policy below the compound-retry layer, and per-call deadline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, request: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Tears down and re-establishes the underlying connection. Invoked by
    /// the executor's retry policy on `BADSESSION` before it re-sends.
    async fn reconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
