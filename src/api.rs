//! The public, synchronous, vectorized API (§6). Every entry point here
//! blocks the calling thread on the context's own Tokio runtime; nothing in
//! this module is `async` itself.

use crate::attrs::AttrMask;
use crate::batch::{
    AttrSpec, CopyPair, GetAttrSpec, IntendedOp, IoVec, OpResult, OpenSpec, RenamePair, VResult, OFFSET_APPEND,
    OFFSET_CURRENT,
};
use crate::context::Context;
use crate::error::{NfsClientError, Result};
use crate::fileref::{Descriptor, FileRef};
use crate::nfs4::ops::DirEntry;

/// Constructs a path-based file reference (`tc_file_from_path` in the
/// original API).
pub fn file_from_path(path: impl Into<String>) -> FileRef {
    FileRef::path(path)
}

/// Constructs a file reference from a previously-`openv`'d descriptor
/// (`tc_file_from_fd`).
pub fn file_from_fd(fd: Descriptor) -> FileRef {
    FileRef::from_fd(fd)
}

/// The "whatever the previous op in this batch named" reference
/// (`tc_file_current`).
pub fn file_current() -> FileRef {
    FileRef::current()
}

impl Context {
    /// Reads `iovecs.len()` spans in as few compounds as the batch allows.
    /// `OFFSET_APPEND`/`OFFSET_CURRENT` are resolved against the server (or
    /// the descriptor's tracked position) before the read compound is sent.
    pub fn readv(&self, iovecs: Vec<IoVec>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        self.block_on(async {
            let offsets = resolve_offsets(self, &cwd, &iovecs).await?;
            let ops: Vec<IntendedOp> = iovecs
                .iter()
                .zip(offsets)
                .map(|(iov, offset)| IntendedOp::Read { file: iov.file.clone(), offset, length: iov.length })
                .collect();
            let (vresult, results) = self.dispatcher(&cwd).run(ops, is_transaction).await?;
            update_descriptor_offsets(self, &iovecs, &results).await;
            Ok((vresult, results))
        })
    }

    /// Writes `iovecs.len()` spans; `IoVec::is_creation` turns a slot into
    /// a CREATE-then-WRITE, `IoVec::is_write_stable` controls
    /// UNSTABLE4 vs FILE_SYNC4.
    pub fn writev(&self, iovecs: Vec<IoVec>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        self.block_on(async {
            let offsets = resolve_offsets(self, &cwd, &iovecs).await?;
            let ops: Vec<IntendedOp> = iovecs
                .iter()
                .zip(offsets)
                .map(|(iov, offset)| IntendedOp::Write {
                    file: iov.file.clone(),
                    offset,
                    data: iov.buffer.clone(),
                    is_creation: iov.is_creation,
                    stable: iov.is_write_stable,
                })
                .collect();
            let (vresult, results) = self.dispatcher(&cwd).run(ops, is_transaction).await?;
            update_descriptor_offsets(self, &iovecs, &results).await;
            Ok((vresult, results))
        })
    }

    /// Opens `specs.len()` files, returning their descriptors in
    /// `OpResult::fd_out`.
    pub fn openv(&self, specs: Vec<OpenSpec>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        let ops: Vec<IntendedOp> = specs
            .into_iter()
            .map(|s| IntendedOp::Open { path: s.path, access: s.access, create: s.create, mode: s.mode })
            .collect();
        self.block_on(self.dispatcher(&cwd).run(ops, is_transaction))
    }

    pub fn closev(&self, fds: Vec<Descriptor>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        let ops: Vec<IntendedOp> = fds.into_iter().map(|fd| IntendedOp::Close { fd }).collect();
        self.block_on(self.dispatcher(&cwd).run(ops, is_transaction))
    }

    pub fn getattrsv(&self, specs: Vec<GetAttrSpec>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        let ops: Vec<IntendedOp> =
            specs.into_iter().map(|s| IntendedOp::GetAttr { file: s.file, mask: s.mask }).collect();
        self.block_on(self.dispatcher(&cwd).run(ops, is_transaction))
    }

    pub fn setattrsv(&self, specs: Vec<AttrSpec>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        let ops: Vec<IntendedOp> =
            specs.into_iter().map(|s| IntendedOp::SetAttr { file: s.file, attrs: s.attrs }).collect();
        self.block_on(self.dispatcher(&cwd).run(ops, is_transaction))
    }

    pub fn renamev(&self, pairs: Vec<RenamePair>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        let ops: Vec<IntendedOp> =
            pairs.into_iter().map(|p| IntendedOp::Rename { from: p.from, to: p.to }).collect();
        self.block_on(self.dispatcher(&cwd).run(ops, is_transaction))
    }

    pub fn removev(&self, files: Vec<FileRef>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        let ops: Vec<IntendedOp> = files.into_iter().map(|file| IntendedOp::Remove { file }).collect();
        self.block_on(self.dispatcher(&cwd).run(ops, is_transaction))
    }

    pub fn mkdirv(&self, specs: Vec<AttrSpec>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        let ops: Vec<IntendedOp> =
            specs.into_iter().map(|s| IntendedOp::Mkdir { file: s.file, attrs: s.attrs }).collect();
        self.block_on(self.dispatcher(&cwd).run(ops, is_transaction))
    }

    /// Copies `pairs.len()` byte ranges, retrying a short read until
    /// `length` bytes have been observed or EOF (§4.6, `copy.rs`).
    pub fn copyv(&self, pairs: Vec<CopyPair>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        let cwd = self.getcwd();
        self.block_on(crate::copy::run_copy(self, &cwd, pairs, is_transaction))
    }

    /// Lists a whole directory, paging through READDIR cookies under the
    /// hood (§4.7, `listdir.rs`).
    pub fn listdir(&self, dir: FileRef, mask: AttrMask) -> Result<Vec<DirEntry>> {
        let cwd = self.getcwd();
        self.block_on(crate::listdir::list_all(self, &cwd, dir, mask))
    }
}

/// Resolves `OFFSET_CURRENT`/`OFFSET_APPEND` sentinels to real byte
/// offsets. `OFFSET_CURRENT` comes from the descriptor's tracked position
/// with no round-trip; `OFFSET_APPEND` costs one GETATTR per distinct file
/// (batched into a single compound) to learn the current size.
async fn resolve_offsets(ctx: &Context, cwd: &str, iovecs: &[IoVec]) -> Result<Vec<i64>> {
    let mut resolved: Vec<i64> = iovecs.iter().map(|v| v.offset).collect();
    let mut needs_size = Vec::new();

    for (i, iov) in iovecs.iter().enumerate() {
        match iov.offset {
            OFFSET_CURRENT => {
                let FileRef::Descriptor(fd) = &iov.file else {
                    return Err(NfsClientError::Invalid("OFFSET_CURRENT requires an open descriptor"));
                };
                let state = ctx.descriptors.get(*fd).await.ok_or(NfsClientError::BadState { fd: *fd })?;
                resolved[i] = state.offset;
            }
            OFFSET_APPEND => needs_size.push(i),
            _ => {}
        }
    }

    if !needs_size.is_empty() {
        let ops: Vec<IntendedOp> = needs_size
            .iter()
            .map(|&i| IntendedOp::GetAttr { file: iovecs[i].file.clone(), mask: AttrMask::SIZE })
            .collect();
        let (_, results) = ctx.dispatcher(cwd).run(ops, false).await?;
        for (k, &i) in needs_size.iter().enumerate() {
            let size = results[k].attrs_out.as_ref().and_then(|a| a.size).unwrap_or(0);
            resolved[i] = size as i64;
        }
    }

    Ok(resolved)
}

/// After a read/write against an open descriptor, advances its tracked
/// offset by the bytes actually transferred, so a later `OFFSET_CURRENT`
/// call continues where this one left off.
async fn update_descriptor_offsets(ctx: &Context, iovecs: &[IoVec], results: &[OpResult]) {
    for (iov, result) in iovecs.iter().zip(results) {
        if !result.is_ok() {
            continue;
        }
        if let FileRef::Descriptor(fd) = &iov.file {
            let bytes_done = result.bytes_done as i64;
            ctx.descriptors
                .update(*fd, |state| state.offset += bytes_done)
                .await;
        }
    }
}
