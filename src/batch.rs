//! The caller-facing vectorized argument types (§3 `IoVec`, `AttrMask`) and
//! the internal `IntendedOp`/`Batch`/`ResultVector` representation the
//! Compound Builder consumes (§3 `Batch`, `Compound Plan`, `Result Vector`).

use crate::attrs::{AttrMask, Attrs};
use crate::fileref::{Descriptor, FileRef};
use crate::nfs4::NfsStat;

/// Sentinel offsets recognized by [`IoVec::offset`].
pub const OFFSET_APPEND: i64 = -1;
pub const OFFSET_CURRENT: i64 = -2;

/// One read or write request, as accepted by `readv`/`writev` (§3).
#[derive(Debug, Clone)]
pub struct IoVec {
    pub file: FileRef,
    pub offset: i64,
    pub length: u32,
    pub buffer: Vec<u8>,
    pub is_creation: bool,
    pub is_write_stable: bool,
}

impl IoVec {
    pub fn read(file: FileRef, offset: i64, length: u32) -> Self {
        IoVec { file, offset, length, buffer: Vec::new(), is_creation: false, is_write_stable: true }
    }

    pub fn write(file: FileRef, offset: i64, buffer: Vec<u8>) -> Self {
        let length = buffer.len() as u32;
        IoVec { file, offset, length, buffer, is_creation: false, is_write_stable: true }
    }

    pub fn creating(mut self) -> Self {
        self.is_creation = true;
        self
    }

    pub fn unstable(mut self) -> Self {
        self.is_write_stable = false;
        self
    }
}

/// One element of `setattrsv`/`mkdirv`: the file the attributes apply to,
/// plus the values to write (present fields only).
#[derive(Debug, Clone)]
pub struct AttrSpec {
    pub file: FileRef,
    pub attrs: Attrs,
}

impl AttrSpec {
    pub fn new(file: FileRef, attrs: Attrs) -> Self {
        AttrSpec { file, attrs }
    }

    pub fn mask(&self) -> AttrMask {
        self.attrs.mask()
    }
}

/// One element of `getattrsv`: the file to fetch attributes for, plus
/// which fields are wanted.
#[derive(Debug, Clone)]
pub struct GetAttrSpec {
    pub file: FileRef,
    pub mask: AttrMask,
}

impl GetAttrSpec {
    pub fn new(file: FileRef, mask: AttrMask) -> Self {
        GetAttrSpec { file, mask }
    }
}

/// One element of `renamev`.
#[derive(Debug, Clone)]
pub struct RenamePair {
    pub from: FileRef,
    pub to: FileRef,
}

/// One element of `openv`.
#[derive(Debug, Clone)]
pub struct OpenSpec {
    pub path: String,
    pub access: crate::nfs4::OpenAccess,
    pub create: bool,
    pub mode: u32,
}

impl OpenSpec {
    pub fn new(path: impl Into<String>, access: crate::nfs4::OpenAccess) -> Self {
        OpenSpec { path: path.into(), access, create: false, mode: 0o644 }
    }

    pub fn creating(mut self, mode: u32) -> Self {
        self.create = true;
        self.mode = mode;
        self
    }
}

/// One element of `copyv`.
#[derive(Debug, Clone)]
pub struct CopyPair {
    pub src: FileRef,
    pub src_offset: i64,
    pub dst: FileRef,
    pub dst_offset: i64,
    pub length: u32,
}

/// A single high-level operation after a public call has been unpacked but
/// before the Compound Builder has expanded it into NFSv4 opcodes.
#[derive(Debug, Clone)]
pub enum IntendedOp {
    Read { file: FileRef, offset: i64, length: u32 },
    Write { file: FileRef, offset: i64, data: Vec<u8>, is_creation: bool, stable: bool },
    Open { path: String, access: crate::nfs4::OpenAccess, create: bool, mode: u32 },
    Close { fd: Descriptor },
    GetAttr { file: FileRef, mask: AttrMask },
    SetAttr { file: FileRef, attrs: Attrs },
    Rename { from: FileRef, to: FileRef },
    Remove { file: FileRef },
    Mkdir { file: FileRef, attrs: Attrs },
    ReadDirPage { dir: FileRef, cookie: u64, cookie_verf: [u8; 8], max_bytes: u32, mask: AttrMask },
}

impl IntendedOp {
    /// The `FileRef` this op targets, used by the builder to dedup LOOKUP
    /// chains and decide sharing groups (§4.3).
    pub fn file_ref(&self) -> Option<&FileRef> {
        match self {
            IntendedOp::Read { file, .. } => Some(file),
            IntendedOp::Write { file, .. } => Some(file),
            IntendedOp::GetAttr { file, .. } => Some(file),
            IntendedOp::SetAttr { file, .. } => Some(file),
            IntendedOp::Remove { file } => Some(file),
            IntendedOp::Mkdir { file, .. } => Some(file),
            IntendedOp::ReadDirPage { dir, .. } => Some(dir),
            IntendedOp::Rename { from, .. } => Some(from),
            IntendedOp::Open { .. } | IntendedOp::Close { .. } => None,
        }
    }
}

/// Outcome of a single [`IntendedOp`], 1:1 with the caller's input (§3
/// `Result Vector`).
#[derive(Debug, Clone, Default)]
pub struct OpResult {
    pub status: OpStatus,
    pub bytes_done: u32,
    pub eof: bool,
    pub attrs_out: Option<Attrs>,
    pub handle_out: Option<crate::nfs4::FileHandle>,
    pub fd_out: Option<Descriptor>,
    /// Bytes read back by a `Read` op.
    pub data: Vec<u8>,
    /// Entries returned by a `ReadDirPage` op.
    pub dir_entries: Vec<crate::nfs4::ops::DirEntry>,
    pub cookie_verf_out: [u8; 8],
}

impl OpResult {
    pub fn not_executed() -> Self {
        OpResult { status: OpStatus::NotExecuted, ..Default::default() }
    }

    pub fn ok() -> Self {
        OpResult { status: OpStatus::Ok, ..Default::default() }
    }

    pub fn failed(stat: NfsStat) -> Self {
        OpResult { status: OpStatus::Failed(stat), ..Default::default() }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, OpStatus::Ok)
    }
}

/// Per-op status, distinguishing "never ran" from "ran and failed" (§3
/// invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpStatus {
    Ok,
    Failed(NfsStat),
    #[default]
    NotExecuted,
}

/// The in-flight representation of one public call: an ordered list of
/// `IntendedOp` plus the aligned result vector the executor fills in.
#[derive(Debug, Clone)]
pub struct Batch {
    pub ops: Vec<IntendedOp>,
}

impl Batch {
    pub fn new(ops: Vec<IntendedOp>) -> Self {
        Batch { ops }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Aggregate outcome returned by every public vectorized call (§6 `Result`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VResult {
    pub ok: bool,
    pub failed_index: i32,
    pub errno: i32,
}

impl VResult {
    pub fn success() -> Self {
        VResult { ok: true, failed_index: -1, errno: 0 }
    }

    pub fn from_results(results: &[OpResult]) -> Self {
        for (i, r) in results.iter().enumerate() {
            if let OpStatus::Failed(stat) = r.status {
                return VResult { ok: false, failed_index: i as i32, errno: stat.to_errno() };
            }
        }
        VResult::success()
    }

    pub fn from_error(index: usize, errno: i32) -> Self {
        VResult { ok: false, failed_index: index as i32, errno }
    }
}
