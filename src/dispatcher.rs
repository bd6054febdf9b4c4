//! The Vector Dispatcher (§4.3/§4.4): turns a list of [`IntendedOp`]s into
//! one or more compounds, runs them in order, and stops issuing further
//! shards as soon as one produces a failure — the rest of the batch stays
//! `NotExecuted` (§3 invariant 4).

use crate::batch::{IntendedOp, OpResult, OpStatus, VResult};
use crate::cache::{DescriptorTable, HandleCache};
use crate::compound::{CompoundBuilder, CompoundExecutor};
use crate::compound::executor::SessionState;
use crate::config::Config;
use crate::error::{NfsClientError, Result};
use crate::transport::Transport;
use crate::xdr::XdrCodec;

pub struct Dispatcher<'a> {
    pub cwd: &'a str,
    pub client_owner: &'a str,
    pub handles: &'a HandleCache,
    pub descriptors: &'a DescriptorTable,
    pub session: &'a SessionState,
    pub transport: &'a dyn Transport,
    pub codec: &'a dyn XdrCodec,
    pub config: &'a Config,
}

impl<'a> Dispatcher<'a> {
    /// Runs `ops` to completion, sharding across compounds as needed.
    ///
    /// `is_transaction` demands the whole batch execute as one COMPOUND;
    /// if it would not fit, this fails with `TooManyOps` before sending
    /// anything rather than silently sharding it (§4.3).
    pub async fn run(&self, ops: Vec<IntendedOp>, is_transaction: bool) -> Result<(VResult, Vec<OpResult>)> {
        if is_transaction && ops.len() > self.config.max_ops_per_compound {
            return Err(NfsClientError::TooManyOps { len: ops.len(), max: self.config.max_ops_per_compound });
        }

        let mut results: Vec<OpResult> = (0..ops.len()).map(|_| OpResult::not_executed()).collect();

        let builder = CompoundBuilder::new(self.cwd, self.handles, self.descriptors, self.client_owner);
        let plans = builder.build(&ops, self.config.max_ops_per_compound).await?;

        if is_transaction && plans.len() > 1 {
            return Err(NfsClientError::TooManyOps { len: ops.len(), max: self.config.max_ops_per_compound });
        }

        let executor = CompoundExecutor {
            cwd: self.cwd,
            transport: self.transport,
            codec: self.codec,
            session: self.session,
            handles: self.handles,
            descriptors: self.descriptors,
            retry_limit: self.config.retry_limit,
        };

        for plan in &plans {
            executor.execute(plan, &ops, &mut results).await?;

            let touched: Vec<usize> = plan.ops.iter().filter_map(|p| p.source).collect();
            let shard_failed = touched.iter().any(|&i| matches!(results[i].status, OpStatus::Failed(_)));
            if shard_failed {
                break;
            }
        }

        Ok((VResult::from_results(&results), results))
    }
}
