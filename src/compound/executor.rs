//! Drives one [`CompoundPlan`] to completion: prefixes SEQUENCE, calls the
//! transport, decodes the reply, folds results back onto the caller's
//! batch, and implements the retry policy (§4.4).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::batch::{IntendedOp, OpResult};
use crate::cache::{DescriptorTable, HandleCache};
use crate::error::{NfsClientError, Result};
use crate::fileref::{Descriptor, FileRef};
use crate::nfs4::ops::{NfsOpArgs, NfsOpResult};
use crate::nfs4::stateid::{OpenLifecycle, OpenState};
use crate::nfs4::NfsStat;
use crate::path;
use crate::transport::Transport;
use crate::xdr::{DecodedReply, EncodedOp, XdrCodec};

use super::plan::{CompoundPlan, Role};

/// Session identity and per-slot sequencing (RFC 5661 §2.10). A single slot
/// is enough for a client that never pipelines more than one compound at a
/// time per session, which matches how `Dispatcher` drives shards.
pub struct SessionState {
    session_id: Mutex<[u8; 16]>,
    sequence_id: AtomicU32,
}

impl SessionState {
    pub fn new(session_id: [u8; 16]) -> Self {
        SessionState { session_id: Mutex::new(session_id), sequence_id: AtomicU32::new(1) }
    }

    fn current_id(&self) -> [u8; 16] {
        *self.session_id.lock().expect("session id mutex poisoned")
    }

    fn next_sequence(&self) -> u32 {
        self.sequence_id.fetch_add(1, Ordering::SeqCst)
    }

    /// After a reconnect, sequence numbers restart from the beginning of
    /// the (possibly renegotiated) session.
    fn reset_sequence(&self) {
        self.sequence_id.store(1, Ordering::SeqCst);
    }
}

pub struct CompoundExecutor<'a> {
    pub cwd: &'a str,
    pub transport: &'a dyn Transport,
    pub codec: &'a dyn XdrCodec,
    pub session: &'a SessionState,
    pub handles: &'a HandleCache,
    pub descriptors: &'a DescriptorTable,
    pub retry_limit: u32,
}

impl<'a> CompoundExecutor<'a> {
    /// Runs `plan` to completion, retrying transient failures up to
    /// `retry_limit` times with exponential backoff. `results` must already
    /// be sized to the whole batch and pre-filled with `NotExecuted`; only
    /// the slots this plan's ops are sourced from are touched.
    pub async fn execute(
        &self,
        plan: &CompoundPlan,
        batch: &[IntendedOp],
        results: &mut [OpResult],
    ) -> Result<()> {
        let span = tracing::debug_span!("compound_execute", shard_index = %plan.tag, op_count = plan.len(), attempt = 0u32);
        let _guard = span.enter();

        let mut attempt = 0u32;
        loop {
            span.record("attempt", attempt);
            let sequence_id = self.session.next_sequence();
            let mut wire_ops = Vec::with_capacity(plan.len() + 1);
            wire_ops.push(EncodedOp {
                args: NfsOpArgs::Sequence { session_id: self.session.current_id(), slot: 0, sequence_id },
            });
            wire_ops.extend(plan.encoded_ops());

            let request = self.codec.encode_compound(&plan.tag, &wire_ops);

            let reply = match self.transport.call(&request).await {
                Ok(bytes) => self.codec.decode_reply(&bytes).map_err(NfsClientError::Transport)?,
                Err(err) => {
                    if err.is_transient() && attempt < self.retry_limit {
                        let backoff_ms = self.backoff_ms(attempt);
                        tracing::warn!(reason = %err, attempt, backoff_ms, "retrying after transport error");
                        self.sleep(backoff_ms).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(NfsClientError::Transport(err.to_string()));
                }
            };

            if needs_session_renewal(reply.status) {
                if attempt >= self.retry_limit {
                    return Err(NfsClientError::Nfs(reply.status));
                }
                tracing::warn!(reason = ?reply.status, attempt, "reconnecting for session renewal");
                self.transport.reconnect().await.map_err(|e| NfsClientError::Transport(e.to_string()))?;
                self.session.reset_sequence();
                attempt += 1;
                continue;
            }

            if reply.status.is_transient() {
                if attempt >= self.retry_limit {
                    return Err(NfsClientError::Nfs(reply.status));
                }
                let backoff_ms = self.backoff_ms(attempt);
                tracing::warn!(reason = ?reply.status, attempt, backoff_ms, "retrying after transient status");
                self.sleep(backoff_ms).await;
                attempt += 1;
                continue;
            }

            self.fold(plan, batch, &reply, results).await;
            return Ok(());
        }
    }

    fn backoff_ms(&self, attempt: u32) -> u64 {
        50u64 * (1u64 << attempt.min(6))
    }

    async fn sleep(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Walks the decoded reply in lockstep with the plan, writing results
    /// into the caller's slots and updating the handle cache / descriptor
    /// table as each op's effect becomes known. Stops at the server's first
    /// non-OK status (RFC 5661 §15.2), leaving later slots `NotExecuted`.
    async fn fold(&self, plan: &CompoundPlan, batch: &[IntendedOp], reply: &DecodedReply, results: &mut [OpResult]) {
        let mut pending_open: Option<(usize, crate::nfs4::StateId)> = None;
        let owners = chunk_owners(plan);

        for (i, (decoded, planned)) in reply.ops.iter().zip(plan.ops.iter()).enumerate() {
            if decoded.status != NfsStat::Ok {
                // A failing Setup op (a LOOKUP resolving a path, say) carries no
                // `source` of its own; attribute it to the payload op its chunk
                // was building toward so the batch item it belongs to is the one
                // that ends up `Failed`, not silently left `NotExecuted`. A failing
                // Teardown op (the CLOSE after a creating WRITE) looks back to the
                // payload it follows instead — forward-filling would instead blame
                // the next chunk's unrelated op.
                let owner = match planned.role {
                    Role::Teardown => owners[i].1,
                    _ => owners[i].0,
                };
                if let Some(idx) = planned.source.or(owner) {
                    if matches!(decoded.status, NfsStat::Stale | NfsStat::BadHandle) {
                        self.invalidate_for(batch, idx, "stale");
                    }
                    if decoded.status == NfsStat::StaleStateId {
                        if let Some(fd) = descriptor_of(&batch[idx]) {
                            self.descriptors.remove(fd).await;
                        }
                        self.invalidate_for(batch, idx, "stale_stateid");
                    } else if let IntendedOp::Close { fd } = &batch[idx] {
                        self.descriptors.revert_closing(*fd).await;
                    }
                    results[idx] = OpResult::failed(decoded.status);
                }
                return;
            }

            match (&planned.op.args, &decoded.result) {
                (NfsOpArgs::Open { .. }, Some(NfsOpResult::Open { stateid })) => {
                    if let Some(idx) = planned.source {
                        pending_open = Some((idx, *stateid));
                    }
                }
                (NfsOpArgs::GetFh, Some(NfsOpResult::GetFh(handle))) => {
                    if let Some((idx, stateid)) = pending_open.take() {
                        let access = match &batch[idx] {
                            IntendedOp::Open { access, .. } => *access,
                            _ => crate::nfs4::OpenAccess::Both,
                        };
                        let fd = self.descriptors.reserve();
                        self.descriptors.insert(fd, OpenState::new(handle.clone(), stateid, access)).await;
                        self.descriptors.update(fd, |s| s.lifecycle = OpenLifecycle::Opened).await;
                        if let IntendedOp::Open { path: opened_path, .. } = &batch[idx] {
                            if let Ok(absolute) = self.absolute(opened_path) {
                                self.handles.insert(absolute, handle.clone());
                            }
                        }
                        let mut result = OpResult::ok();
                        result.fd_out = Some(fd);
                        result.handle_out = Some(handle.clone());
                        results[idx] = result;
                    }
                }
                (NfsOpArgs::Close { .. }, Some(NfsOpResult::Close)) => {
                    if let Some(idx) = planned.source {
                        if let IntendedOp::Close { fd } = &batch[idx] {
                            self.descriptors.remove(*fd).await;
                        }
                        results[idx] = OpResult::ok();
                    }
                }
                (NfsOpArgs::Read { .. }, Some(NfsOpResult::Read { data, eof })) => {
                    if let Some(idx) = planned.source {
                        let mut result = OpResult::ok();
                        result.bytes_done = data.len() as u32;
                        result.eof = *eof;
                        result.data = data.clone();
                        results[idx] = result;
                    }
                }
                (NfsOpArgs::Write { .. }, Some(NfsOpResult::Write { count, .. })) => {
                    if let Some(idx) = planned.source {
                        let mut result = OpResult::ok();
                        result.bytes_done = *count;
                        results[idx] = result;
                    }
                }
                (NfsOpArgs::GetAttr { .. }, Some(NfsOpResult::GetAttr(attrs))) => {
                    if let Some(idx) = planned.source {
                        let mut result = OpResult::ok();
                        result.attrs_out = Some(*attrs);
                        results[idx] = result;
                    }
                }
                (NfsOpArgs::ReadDir { .. }, Some(NfsOpResult::ReadDir { entries, cookie_verf, eof })) => {
                    if let Some(idx) = planned.source {
                        let mut result = OpResult::ok();
                        result.dir_entries = entries.clone();
                        result.cookie_verf_out = *cookie_verf;
                        result.eof = *eof;
                        results[idx] = result;
                    }
                }
                _ => {
                    if let Some(idx) = planned.source {
                        results[idx] = OpResult::ok();
                    }
                }
            }
        }
    }

    fn invalidate_for(&self, batch: &[IntendedOp], idx: usize, reason: &str) {
        let Some(FileRef::Path(p)) = batch.get(idx).and_then(|op| op.file_ref()) else {
            return;
        };
        if let Ok(absolute) = self.absolute(p) {
            self.handles.invalidate_because(&absolute, reason);
        }
    }

    fn absolute(&self, p: &str) -> std::result::Result<String, path::PathError> {
        if p.starts_with('/') {
            path::normalize(p)
        } else {
            path::join(self.cwd, p)
        }
    }
}

/// Maps each wire-op position in `plan` to the batch index of the payload op
/// its chunk belongs to, as a `(next, prev)` pair: `next` is the nearest
/// following `source` (what a Setup op's chunk is building toward), `prev`
/// is the nearest preceding one (what a Teardown op's chunk just produced).
/// Chunks lay out as zero or more Setup ops, one Payload op, then zero or
/// more Teardown ops, so these two scans always land on the right chunk.
fn chunk_owners(plan: &CompoundPlan) -> Vec<(Option<usize>, Option<usize>)> {
    let mut next = vec![None; plan.ops.len()];
    let mut running = None;
    for i in (0..plan.ops.len()).rev() {
        if let Some(idx) = plan.ops[i].source {
            running = Some(idx);
        }
        next[i] = running;
    }

    let mut prev = vec![None; plan.ops.len()];
    let mut running = None;
    for i in 0..plan.ops.len() {
        if let Some(idx) = plan.ops[i].source {
            running = Some(idx);
        }
        prev[i] = running;
    }

    next.into_iter().zip(prev).collect()
}

/// The descriptor a failed op's stateid traces back to, if any — used to
/// move a descriptor to `Unopened` on `STALE_STATEID` (§4.4).
fn descriptor_of(op: &IntendedOp) -> Option<Descriptor> {
    match op {
        IntendedOp::Close { fd } => Some(*fd),
        _ => match op.file_ref() {
            Some(FileRef::Descriptor(fd)) => Some(*fd),
            _ => None,
        },
    }
}

/// Statuses that mean "the session/sequence is out of sync, reconnect and
/// resubmit" rather than "the operation itself failed" (§4.4).
fn needs_session_renewal(status: NfsStat) -> bool {
    matches!(status, NfsStat::BadSession | NfsStat::BadSeqId | NfsStat::StaleClientId | NfsStat::SeqMisordered)
}
