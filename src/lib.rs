//! A vectorized NFSv4.1 client: batch many logical file operations into as
//! few COMPOUND round-trips as the protocol allows, instead of one
//! round-trip per `read`/`write`/`getattr` call.
//!
//! The entry point is [`Context`], built via [`Context::init`] with a
//! caller-supplied transport factory and [`XdrCodec`] (this crate carries
//! no concrete network transport or XDR wire codec of its own — see
//! `transport` and `xdr`). Every other public call — `readv`, `writev`,
//! `openv`, `getattrsv`, and friends — lives on [`Context`] in `api`.

pub mod api;
pub mod attrs;
pub mod batch;
pub mod cache;
pub mod compound;
pub mod config;
pub mod context;
pub mod copy;
pub mod dispatcher;
pub mod error;
pub mod fileref;
pub mod listdir;
pub mod nfs4;
pub mod path;
pub mod transport;
pub mod xdr;

pub use api::{file_current, file_from_fd, file_from_path};
pub use batch::{
    AttrSpec, CopyPair, GetAttrSpec, IoVec, OpResult, OpenSpec, RenamePair, VResult, OFFSET_APPEND, OFFSET_CURRENT,
};
pub use context::Context;
pub use error::{NfsClientError, Result};
pub use fileref::{Descriptor, FileRef};
