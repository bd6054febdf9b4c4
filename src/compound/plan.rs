//! The output of the Compound Builder: an ordered list of NFSv4 operations
//! annotated with enough bookkeeping for the executor to fold results back
//! onto the caller's batch (§4.3).

use crate::xdr::EncodedOp;

/// Why an op is present in the plan, not part of the caller's batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// PUTROOTFH/PUTFH/LOOKUP/SAVEFH/RESTOREFH machinery that establishes
    /// the current-fh an op needs, plus the leading SEQUENCE.
    Setup,
    /// The op a batch entry actually asked for; its result is back-indexed
    /// to a caller-visible slot.
    Payload,
    /// Machinery that runs after an op's result is captured, such as the
    /// CLOSE that follows a creating WRITE's OPEN+GETFH+WRITE in the same
    /// compound.
    Teardown,
}

/// One wire operation plus the bookkeeping the executor needs.
#[derive(Debug, Clone)]
pub struct PlannedOp {
    pub op: EncodedOp,
    pub role: Role,
    /// Index into the batch this op's result should be written back to,
    /// `None` for setup/teardown ops with no caller-visible result.
    pub source: Option<usize>,
}

/// A single COMPOUND's worth of operations, one shard of a (possibly
/// larger) batch.
#[derive(Debug, Clone)]
pub struct CompoundPlan {
    pub tag: String,
    pub ops: Vec<PlannedOp>,
}

impl CompoundPlan {
    pub fn new(tag: impl Into<String>) -> Self {
        CompoundPlan { tag: tag.into(), ops: Vec::new() }
    }

    pub fn push(&mut self, op: EncodedOp, role: Role, source: Option<usize>) {
        self.ops.push(PlannedOp { op, role, source });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn encoded_ops(&self) -> Vec<EncodedOp> {
        self.ops.iter().map(|p| p.op.clone()).collect()
    }
}
