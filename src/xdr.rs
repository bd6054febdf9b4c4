//! The `XdrCodec` collaborator (§6): turns a [`CompoundPlan`] into the bytes
//! a `Transport` sends, and a reply's bytes back into per-op results.
//!
//! As with `Transport`, this crate does not implement RFC 4506 XDR itself —
//! that is a wire-format concern the caller's codec owns. What lives here is
//! the shape the rest of the planner needs on either side of that boundary.

use crate::nfs4::{NfsOpArgs, NfsOpResult, NfsStat};

/// One operation as the codec is asked to encode it: the opcode implied by
/// `args` plus the current-fh/saved-fh context the executor has already
/// resolved.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EncodedOp {
    pub args: NfsOpArgs,
}

/// One operation as decoded out of a COMPOUND reply, in request order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecodedOp {
    pub status: NfsStat,
    pub result: Option<NfsOpResult>,
}

/// A full compound reply: the overall status plus the per-op results that
/// were actually executed (the server stops at the first failing op).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecodedReply {
    pub status: NfsStat,
    pub ops: Vec<DecodedOp>,
}

/// Encodes/decodes COMPOUND requests and replies.
///
/// A real implementation serializes [`EncodedOp`] sequences to RFC 4506 XDR
/// prefixed with the session/SEQUENCE header; the in-memory test codec just
/// threads the structured values straight through.
pub trait XdrCodec: Send + Sync {
    fn encode_compound(&self, tag: &str, ops: &[EncodedOp]) -> Vec<u8>;
    fn decode_reply(&self, bytes: &[u8]) -> Result<DecodedReply, String>;
}
