//! The Listdir driver (§4.7): pages through READDIR with the cookie and
//! cookieverf the server hands back, growing the requested buffer when a
//! page comes back empty but not at EOF.

use crate::attrs::AttrMask;
use crate::batch::{IntendedOp, OpStatus};
use crate::context::Context;
use crate::error::{NfsClientError, Result};
use crate::fileref::FileRef;
use crate::nfs4::ops::DirEntry;

const INITIAL_PAGE_BYTES: u32 = 4096;
const MAX_PAGE_BYTES: u32 = 1 << 20;

pub async fn list_all(ctx: &Context, cwd: &str, dir: FileRef, mask: AttrMask) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    let mut cookie = 0u64;
    let mut cookie_verf = [0u8; 8];
    let mut max_bytes = INITIAL_PAGE_BYTES;

    loop {
        let ops = vec![IntendedOp::ReadDirPage { dir: dir.clone(), cookie, cookie_verf, max_bytes, mask }];
        let (_, mut results) = ctx.dispatcher(cwd).run(ops, false).await?;
        let page = results.remove(0);

        if let OpStatus::Failed(stat) = page.status {
            return Err(NfsClientError::Nfs(stat));
        }

        if page.dir_entries.is_empty() && !page.eof {
            // The page didn't fit; ask for more room at the same cookie.
            max_bytes = (max_bytes.saturating_mul(2)).min(MAX_PAGE_BYTES);
            continue;
        }

        if let Some(last) = page.dir_entries.last() {
            cookie = last.cookie;
        }
        cookie_verf = page.cookie_verf_out;
        entries.extend(page.dir_entries);

        if page.eof {
            break;
        }
    }

    Ok(entries)
}
