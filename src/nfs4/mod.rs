//! NFSv4.1 wire vocabulary the planner builds compounds out of.
//!
//! This module defines the opcode and argument types the Compound Builder
//! assembles and the Compound Executor submits; it does not encode or
//! decode them onto the wire — that is the XDR collaborator's job (§6).

pub mod ops;
pub mod stateid;
pub mod status;

pub use ops::{NfsOp, NfsOpArgs, NfsOpResult};
pub use stateid::{OpenLifecycle, OpenState, SeqId, StateId};
pub use status::NfsStat;

/// Opaque, server-assigned identity of a filesystem object (RFC 5661 §2.10.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FileHandle(pub Vec<u8>);

/// Maximum length of a file handle the protocol allows us to accept.
pub const MAX_FILE_HANDLE_LEN: usize = 128;

impl FileHandle {
    pub fn new(bytes: Vec<u8>) -> Self {
        FileHandle(bytes)
    }
}

impl std::fmt::Display for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// `(seconds, nanoseconds)` timestamp matching `nfstime4`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct NfsTime {
    pub sec: i64,
    pub nsec: u32,
}

/// Access rights requested by an OPEN (RFC 5661 §18.16).
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OpenAccess {
    Read,
    Write,
    Both,
}

/// Data stability requested by a WRITE (RFC 5661 §18.32).
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Stability {
    Unstable,
    DataSync,
    FileSync,
}

impl Stability {
    /// Maps an `IoVec::is_write_stable` flag onto a wire stability value;
    /// callers wanting `UNSTABLE4` set the flag to `false`, everyone else
    /// gets the common `FILE_SYNC4` default.
    pub fn from_flag(stable: bool) -> Self {
        if stable {
            Stability::FileSync
        } else {
            Stability::Unstable
        }
    }
}
