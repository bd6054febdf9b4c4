//! [`FileRef`]: the tagged file identifier every vectorized call accepts
//! (§3). Resolution of a `FileRef` into a server-side handle happens while
//! the Compound Builder walks a batch (§4.2).

use crate::nfs4::FileHandle;

/// Library-issued integer identifying one open file, returned by `openv`.
pub type Descriptor = u32;

/// How the caller names the file a vectorized operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    /// Absolute or CWD-relative path.
    Path(String),
    /// A descriptor previously returned by `openv`.
    Descriptor(Descriptor),
    /// "The file the previous op in this batch named."
    Current,
    /// Raw NFSv4 file handle bytes, taken verbatim.
    Handle(FileHandle),
}

impl FileRef {
    pub fn path(p: impl Into<String>) -> Self {
        FileRef::Path(p.into())
    }

    pub fn from_fd(fd: Descriptor) -> Self {
        FileRef::Descriptor(fd)
    }

    pub fn current() -> Self {
        FileRef::Current
    }

    pub fn from_handle(handle: FileHandle) -> Self {
        FileRef::Handle(handle)
    }

    pub fn is_current(&self) -> bool {
        matches!(self, FileRef::Current)
    }
}
