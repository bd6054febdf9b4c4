//! The library-wide error type and its mapping to POSIX errno (§7).

use std::fmt;

use crate::nfs4::status::{self, NfsStat};

/// Errors surfaced by any public entry point.
///
/// Every per-operation failure is folded into the aggregate `result.errno`
/// through [`NfsClientError::errno`]; nothing here is meant to be matched
/// exhaustively by callers outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NfsClientError {
    /// A caller argument was malformed (oversized path, null batch, a
    /// `FileRef::Current` at position zero, …). Never touches the network.
    Invalid(&'static str),
    /// A `Current` reference at the front of a batch, or pointing at an op
    /// that produced no handle.
    DanglingCurrent,
    /// A descriptor used in the wrong state-machine state, or not found.
    BadState { fd: u32 },
    /// An NFSv4 operation inside a compound reported a non-OK status.
    Nfs(NfsStat),
    /// The transport collaborator could not complete the round-trip.
    Transport(String),
    /// The transport collaborator's retry/backoff budget was exhausted.
    Timeout,
    /// `is_transaction=true` and the batch does not fit in one compound.
    TooManyOps { len: usize, max: usize },
    /// `init` could not load or parse the configuration file.
    Config(String),
}

impl NfsClientError {
    /// Maps this error onto the POSIX errno the public `result` reports.
    pub fn errno(&self) -> i32 {
        match self {
            NfsClientError::Invalid(_) => status::EINVAL,
            NfsClientError::DanglingCurrent => status::EINVAL,
            NfsClientError::BadState { .. } => status::EBADF,
            NfsClientError::Nfs(stat) => stat.to_errno(),
            NfsClientError::Transport(_) => status::EIO,
            NfsClientError::Timeout => status::ETIMEDOUT,
            NfsClientError::TooManyOps { .. } => status::E2BIG,
            NfsClientError::Config(_) => status::EIO,
        }
    }
}

impl fmt::Display for NfsClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NfsClientError::Invalid(msg) => write!(f, "invalid argument: {msg}"),
            NfsClientError::DanglingCurrent => {
                write!(f, "`Current` reference has no preceding op in this batch")
            }
            NfsClientError::BadState { fd } => write!(f, "descriptor {fd} is not open"),
            NfsClientError::Nfs(stat) => write!(f, "server returned {stat:?}"),
            NfsClientError::Transport(msg) => write!(f, "transport error: {msg}"),
            NfsClientError::Timeout => write!(f, "compound timed out"),
            NfsClientError::TooManyOps { len, max } => {
                write!(f, "batch of {len} ops exceeds the {max}-op transaction limit")
            }
            NfsClientError::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for NfsClientError {}

pub type Result<T> = std::result::Result<T, NfsClientError>;
