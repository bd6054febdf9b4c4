//! NFSv4 operation codes and the argument/result payloads the planner cares
//! about. Real wire numbers follow RFC 5661 §18 so that a real XDR
//! collaborator can be slotted in without renumbering anything here.

use num_derive::{FromPrimitive, ToPrimitive};

use super::stateid::StateId;
use super::{FileHandle, NfsTime, OpenAccess, Stability};
use crate::attrs::{AttrMask, Attrs};

/// NFSv4 operation codes actually emitted by the Compound Builder.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum NfsOp {
    Access = 3,
    Close = 4,
    Commit = 5,
    Create = 6,
    GetAttr = 9,
    GetFh = 10,
    Lookup = 14,
    Open = 17,
    OpenConfirm = 19,
    PutFh = 22,
    PutRootFh = 24,
    Read = 25,
    ReadDir = 26,
    Remove = 28,
    Rename = 29,
    RestoreFh = 31,
    SaveFh = 32,
    SetAttr = 34,
    Write = 38,
    Sequence = 53,
}

/// Creation strategy for OPEN/CREATE (RFC 5661 §18.16).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CreateHow {
    /// Open an existing file; fail if absent.
    NoCreate,
    /// Create unconditionally, truncating if it already exists.
    Unchecked(Attrs),
    /// Create only if absent; fail with `EXIST` otherwise.
    Guarded(Attrs),
}

/// Arguments for one NFSv4 operation, as laid out by the Compound Builder.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum NfsOpArgs {
    PutRootFh,
    PutFh(FileHandle),
    GetFh,
    SaveFh,
    RestoreFh,
    Sequence { session_id: [u8; 16], slot: u32, sequence_id: u32 },
    Lookup { name: String },
    Open { owner: String, name: String, access: OpenAccess, how: CreateHow },
    OpenConfirm { stateid: StateId, seqid: u32 },
    Close { stateid: StateId },
    Read { stateid: StateId, offset: u64, count: u32 },
    Write { stateid: StateId, offset: u64, stable: Stability, data: Vec<u8> },
    Commit { offset: u64, count: u32 },
    GetAttr { mask: AttrMask },
    SetAttr { stateid: StateId, mask: AttrMask, attrs: Attrs },
    Rename { old_name: String, new_name: String },
    Remove { name: String },
    Create { name: String, is_dir: bool, attrs: Attrs },
    ReadDir { cookie: u64, cookie_verf: [u8; 8], max_bytes: u32, mask: AttrMask },
}

/// Decoded result of one NFSv4 operation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum NfsOpResult {
    PutRootFh,
    PutFh,
    GetFh(FileHandle),
    SaveFh,
    RestoreFh,
    Sequence,
    Lookup,
    Open { stateid: StateId },
    OpenConfirm { stateid: StateId },
    Close,
    Read { data: Vec<u8>, eof: bool },
    Write { count: u32, verifier: [u8; 8] },
    Commit { verifier: [u8; 8] },
    GetAttr(Attrs),
    SetAttr,
    Rename,
    Remove,
    Create,
    ReadDir { entries: Vec<DirEntry>, cookie_verf: [u8; 8], eof: bool },
}

/// One entry returned by READDIR.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DirEntry {
    pub cookie: u64,
    pub name: String,
    pub attrs: Attrs,
}

impl NfsTime {
    pub const ZERO: NfsTime = NfsTime { sec: 0, nsec: 0 };
}
