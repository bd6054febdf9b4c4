//! The Copy Vector driver (§4.6): reads a range from one file and writes it
//! to another, retrying short reads until `length` bytes have been moved
//! or the source hits EOF.
//!
//! This crate does not model the NFSv4.2 server-side `COPY` operation, so
//! every `copyv` pair costs a read round-trip and a write round-trip;
//! `is_transaction` can never be honored here and is rejected up front.

use crate::batch::{CopyPair, IntendedOp, OpResult, VResult};
use crate::context::Context;
use crate::error::{NfsClientError, Result};

pub async fn run_copy(
    ctx: &Context,
    cwd: &str,
    pairs: Vec<CopyPair>,
    is_transaction: bool,
) -> Result<(VResult, Vec<OpResult>)> {
    if is_transaction {
        return Err(NfsClientError::TooManyOps { len: pairs.len(), max: 1 });
    }

    let mut results = Vec::with_capacity(pairs.len());

    for pair in &pairs {
        match copy_one(ctx, cwd, pair).await {
            Ok(result) => results.push(result),
            Err(NfsClientError::Nfs(stat)) => results.push(OpResult::failed(stat)),
            Err(other) => return Err(other),
        }
    }

    let vresult = VResult::from_results(&results);
    Ok((vresult, results))
}

async fn copy_one(ctx: &Context, cwd: &str, pair: &CopyPair) -> Result<OpResult> {
    let mut buffer = Vec::with_capacity(pair.length as usize);
    let mut offset = pair.src_offset;
    let mut remaining = pair.length;

    while remaining > 0 {
        let ops = vec![IntendedOp::Read { file: pair.src.clone(), offset, length: remaining }];
        let (_, mut read_results) = ctx.dispatcher(cwd).run(ops, false).await?;
        let read = read_results.remove(0);
        if !read.is_ok() {
            return Ok(read);
        }

        let got = read.data.len() as u32;
        buffer.extend_from_slice(&read.data);
        offset += got as i64;
        remaining = remaining.saturating_sub(got);

        if got == 0 || read.eof {
            break;
        }
    }

    let write_ops = vec![IntendedOp::Write {
        file: pair.dst.clone(),
        offset: pair.dst_offset,
        data: buffer,
        is_creation: false,
        stable: true,
    }];
    let (_, mut write_results) = ctx.dispatcher(cwd).run(write_ops, false).await?;
    Ok(write_results.remove(0))
}
