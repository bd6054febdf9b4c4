//! Expands a batch of [`IntendedOp`]s into one or more [`CompoundPlan`]s
//! (§4.3): resolves each `FileRef` into a PUTROOTFH/PUTFH + LOOKUP chain
//! (or a single cached PUTFH), then appends the op itself.

use crate::batch::IntendedOp;
use crate::cache::{DescriptorTable, HandleCache};
use crate::error::{NfsClientError, Result};
use crate::fileref::FileRef;
use crate::nfs4::ops::CreateHow;
use crate::nfs4::{NfsOpArgs, StateId};
use crate::path;
use crate::xdr::EncodedOp;

use super::plan::{CompoundPlan, PlannedOp, Role};

/// Builds compound plans against the handle cache and descriptor table of
/// one `Context`.
pub struct CompoundBuilder<'a> {
    pub cwd: &'a str,
    pub handles: &'a HandleCache,
    pub descriptors: &'a DescriptorTable,
    pub client_owner: &'a str,
}

/// One `IntendedOp` expanded into wire ops, kept together as an atomic unit
/// during sharding.
struct Chunk {
    ops: Vec<PlannedOp>,
    /// True if the first op relies on whatever current-fh the previous
    /// chunk in the batch left behind (`FileRef::Current`).
    depends_on_previous: bool,
}

impl<'a> CompoundBuilder<'a> {
    pub fn new(
        cwd: &'a str,
        handles: &'a HandleCache,
        descriptors: &'a DescriptorTable,
        client_owner: &'a str,
    ) -> Self {
        CompoundBuilder { cwd, handles, descriptors, client_owner }
    }

    /// Builds every chunk, then shards them into plans of at most
    /// `max_ops_per_compound` wire operations (§4.3 sharding rule).
    ///
    /// A chunk whose first op depends on its predecessor's current-fh
    /// (`FileRef::Current`) is never split onto a different shard, even if
    /// that pushes a shard slightly past the limit.
    pub async fn build(&self, batch: &[IntendedOp], max_ops_per_compound: usize) -> Result<Vec<CompoundPlan>> {
        let span = tracing::debug_span!("compound_build", op_count = batch.len(), shard_count = tracing::field::Empty);
        let _guard = span.enter();

        let mut chunks = Vec::with_capacity(batch.len());
        let mut last_produced_handle = false;
        for (index, op) in batch.iter().enumerate() {
            if matches!(op.file_ref(), Some(FileRef::Current)) && !last_produced_handle {
                return Err(NfsClientError::DanglingCurrent);
            }
            chunks.push(self.build_chunk(index, op).await?);
            // Every IntendedOp's wire expansion leaves some current-fh behind
            // by the time it completes (LOOKUP chain, OPEN, CREATE, …), so a
            // `Current` ref is only dangling if nothing preceded it at all.
            last_produced_handle = true;
        }

        let mut plans = Vec::new();
        let mut current = CompoundPlan::new(format!("nfs4-vec-client-{index}", index = plans.len()));

        for chunk in chunks {
            let would_overflow = current.len() + chunk.ops.len() > max_ops_per_compound;
            if would_overflow && !current.is_empty() && !chunk.depends_on_previous {
                plans.push(current);
                current = CompoundPlan::new(format!("nfs4-vec-client-{index}", index = plans.len()));
            }
            for planned in chunk.ops {
                current.ops.push(planned);
            }
        }
        if !current.is_empty() {
            plans.push(current);
        }

        span.record("shard_count", plans.len());
        Ok(plans)
    }

    async fn build_chunk(&self, index: usize, op: &IntendedOp) -> Result<Chunk> {
        let mut ops = Vec::new();
        let depends_on_previous = matches!(op.file_ref(), Some(FileRef::Current));

        match op {
            IntendedOp::Read { file, offset, length } => {
                let stateid = self.resolve_into(file, &mut ops).await?;
                let offset = self.resolve_offset(*offset);
                ops.push(planned(NfsOpArgs::Read { stateid, offset, count: *length }, Role::Payload, Some(index)));
            }
            IntendedOp::Write { file, data, is_creation, stable, offset } => {
                let stateid = if *is_creation {
                    let FileRef::Path(p) = file else {
                        return Err(NfsClientError::Invalid(
                            "a creating write requires a path, not a descriptor/handle",
                        ));
                    };
                    let name = self.resolve_parent(p, &mut ops).await?;
                    let how = CreateHow::Unchecked(crate::attrs::Attrs::new());
                    ops.push(planned(
                        NfsOpArgs::Open {
                            owner: self.client_owner.to_string(),
                            name,
                            access: crate::nfs4::OpenAccess::Write,
                            how,
                        },
                        Role::Setup,
                        None,
                    ));
                    ops.push(planned(NfsOpArgs::GetFh, Role::Setup, None));
                    StateId::CURRENT
                } else {
                    self.resolve_into(file, &mut ops).await?
                };
                let offset = self.resolve_offset(*offset);
                let stability = crate::nfs4::Stability::from_flag(*stable);
                ops.push(planned(
                    NfsOpArgs::Write { stateid, offset, stable: stability, data: data.clone() },
                    Role::Payload,
                    Some(index),
                ));
                if *is_creation {
                    ops.push(planned(NfsOpArgs::Close { stateid: StateId::CURRENT }, Role::Teardown, None));
                }
            }
            IntendedOp::Open { path, access, create, mode } => {
                let name = self.resolve_parent(path, &mut ops).await?;
                let how = if *create {
                    CreateHow::Unchecked(crate::attrs::Attrs::new().set_mode(*mode))
                } else {
                    CreateHow::NoCreate
                };
                ops.push(planned(
                    NfsOpArgs::Open { owner: self.client_owner.to_string(), name, access: *access, how },
                    Role::Payload,
                    Some(index),
                ));
                ops.push(planned(NfsOpArgs::GetFh, Role::Setup, None));
            }
            IntendedOp::Close { fd } => {
                let state = self.descriptors.require_opened(*fd).await?;
                self.descriptors.mark_closing(*fd).await?;
                ops.push(planned(NfsOpArgs::PutFh(state.handle.clone()), Role::Setup, None));
                ops.push(planned(NfsOpArgs::Close { stateid: state.stateid }, Role::Payload, Some(index)));
            }
            IntendedOp::GetAttr { file, mask } => {
                self.resolve_into(file, &mut ops).await?;
                ops.push(planned(NfsOpArgs::GetAttr { mask: *mask }, Role::Payload, Some(index)));
            }
            IntendedOp::SetAttr { file, attrs } => {
                let stateid = self.resolve_into(file, &mut ops).await?;
                ops.push(planned(
                    NfsOpArgs::SetAttr { stateid, mask: attrs.mask(), attrs: *attrs },
                    Role::Payload,
                    Some(index),
                ));
            }
            IntendedOp::Rename { from, to } => {
                let (from_parent, from_name) = self.split(from)?;
                let (to_parent, to_name) = self.split(to)?;
                self.resolve_path(&from_parent, &mut ops).await?;
                ops.push(planned(NfsOpArgs::SaveFh, Role::Setup, None));
                self.resolve_path(&to_parent, &mut ops).await?;
                ops.push(planned(
                    NfsOpArgs::Rename { old_name: from_name, new_name: to_name },
                    Role::Payload,
                    Some(index),
                ));
            }
            IntendedOp::Remove { file } => {
                let (parent, name) = self.split(file)?;
                self.resolve_path(&parent, &mut ops).await?;
                ops.push(planned(NfsOpArgs::Remove { name }, Role::Payload, Some(index)));
            }
            IntendedOp::Mkdir { file, attrs } => {
                let (parent, name) = self.split(file)?;
                self.resolve_path(&parent, &mut ops).await?;
                ops.push(planned(
                    NfsOpArgs::Create { name, is_dir: true, attrs: *attrs },
                    Role::Payload,
                    Some(index),
                ));
            }
            IntendedOp::ReadDirPage { dir, cookie, cookie_verf, max_bytes, mask } => {
                self.resolve_into(dir, &mut ops).await?;
                ops.push(planned(
                    NfsOpArgs::ReadDir { cookie: *cookie, cookie_verf: *cookie_verf, max_bytes: *max_bytes, mask: *mask },
                    Role::Payload,
                    Some(index),
                ));
            }
        }

        Ok(Chunk { ops, depends_on_previous })
    }

    fn resolve_offset(&self, offset: i64) -> u64 {
        // OFFSET_APPEND/OFFSET_CURRENT are resolved by the dispatcher before
        // the builder sees them; by the time we get here offset is a real
        // byte position.
        offset.max(0) as u64
    }

    /// Splits a `FileRef::Path` into its parent directory and final
    /// component; rename/remove/mkdir operate on directory entries and
    /// need a name, which only a path can supply.
    fn split(&self, file: &FileRef) -> Result<(String, String)> {
        let FileRef::Path(p) = file else {
            return Err(NfsClientError::Invalid("this operation requires a path, not a descriptor/handle"));
        };
        let absolute = self.absolute(p)?;
        let tok = path::tokenize(&absolute).map_err(|_| NfsClientError::Invalid("path too long"))?;
        let name = tok.components.last().cloned().ok_or(NfsClientError::Invalid("path has no final component"))?;
        let parent_components = &tok.components[..tok.components.len() - 1];
        let parent = if parent_components.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", parent_components.join("/"))
        };
        Ok((parent, name))
    }

    fn absolute(&self, p: &str) -> Result<String> {
        if p.starts_with('/') {
            path::normalize(p).map_err(|_| NfsClientError::Invalid("path too long"))
        } else {
            path::join(self.cwd, p).map_err(|_| NfsClientError::Invalid("path too long"))
        }
    }

    /// Resolves a `FileRef` to a current-fh, pushing setup ops, and returns
    /// the stateid subsequent I/O should present (the open descriptor's if
    /// there is one, the anonymous special stateid otherwise, RFC 5661
    /// §8.2.3).
    async fn resolve_into(&self, file: &FileRef, ops: &mut Vec<PlannedOp>) -> Result<StateId> {
        match file {
            FileRef::Current => Ok(StateId::ANONYMOUS),
            FileRef::Handle(h) => {
                ops.push(planned(NfsOpArgs::PutFh(h.clone()), Role::Setup, None));
                Ok(StateId::ANONYMOUS)
            }
            FileRef::Descriptor(fd) => {
                let state = self.descriptors.require_opened(*fd).await?;
                ops.push(planned(NfsOpArgs::PutFh(state.handle.clone()), Role::Setup, None));
                Ok(state.stateid)
            }
            FileRef::Path(p) => {
                let absolute = self.absolute(p)?;
                self.resolve_path(&absolute, ops).await?;
                Ok(StateId::ANONYMOUS)
            }
        }
    }

    /// `resolve_into` for operations that never carry a stateid (directory
    /// entry lookups, GETATTR targets resolved to a plain path).
    async fn resolve_path(&self, absolute: &str, ops: &mut Vec<PlannedOp>) -> Result<()> {
        if let Some(handle) = self.handles.get(absolute) {
            ops.push(planned(NfsOpArgs::PutFh(handle), Role::Setup, None));
            return Ok(());
        }

        let tok = path::tokenize(absolute).map_err(|_| NfsClientError::Invalid("path too long"))?;

        // Longest cached-prefix search: walk from the full path down to the
        // root looking for a cached handle, then LOOKUP only the suffix.
        let mut start = tok.components.len();
        let mut anchor = None;
        while start > 0 {
            let prefix = format!("/{}", tok.components[..start].join("/"));
            if let Some(handle) = self.handles.get(&prefix) {
                anchor = Some((handle, start));
                break;
            }
            start -= 1;
        }

        match anchor {
            Some((handle, from)) => {
                ops.push(planned(NfsOpArgs::PutFh(handle), Role::Setup, None));
                for name in &tok.components[from..] {
                    ops.push(planned(NfsOpArgs::Lookup { name: name.clone() }, Role::Setup, None));
                }
            }
            None => {
                ops.push(planned(NfsOpArgs::PutRootFh, Role::Setup, None));
                for name in &tok.components {
                    ops.push(planned(NfsOpArgs::Lookup { name: name.clone() }, Role::Setup, None));
                }
            }
        }
        Ok(())
    }

    /// Resolves `path`'s parent directory to current-fh and returns the
    /// final path component. Used by OPEN, whose current-fh on entry must be
    /// the directory (not the target file, which may not exist yet) — the
    /// name and create strategy travel in the OPEN args themselves (RFC 5661
    /// §18.16), and OPEN's post-op current-fh becomes the opened/created
    /// file.
    async fn resolve_parent(&self, path: &str, ops: &mut Vec<PlannedOp>) -> Result<String> {
        let absolute = self.absolute(path)?;
        let tok = crate::path::tokenize(&absolute).map_err(|_| NfsClientError::Invalid("path too long"))?;
        let parent = if tok.components.len() <= 1 {
            "/".to_string()
        } else {
            format!("/{}", tok.components[..tok.components.len() - 1].join("/"))
        };
        self.resolve_path(&parent, ops).await?;
        tok.components.last().cloned().ok_or(NfsClientError::Invalid("path has no final component"))
    }

}

fn planned(args: NfsOpArgs, role: Role, source: Option<usize>) -> PlannedOp {
    PlannedOp { op: EncodedOp { args }, role, source }
}
