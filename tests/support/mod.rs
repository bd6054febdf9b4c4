//! Shared test/demo fixture: an in-memory NFSv4 server plus the
//! `Transport`/`XdrCodec` pair that talks to it.
//!
//! Nothing here is part of the published API; it exists so integration
//! tests and `demos/vecbench` can exercise `Context` without a real
//! network. The wire format is `toml` over the structures the real codec
//! would otherwise turn into RFC 4506 XDR — adequate for a process-local
//! loopback, not meant to resemble the real wire encoding.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use byteorder::{BigEndian, ByteOrder};

use nfs4_vec_client::attrs::{AttrMask, Attrs};
use nfs4_vec_client::nfs4::ops::{CreateHow, DirEntry, NfsOpArgs, NfsOpResult};
use nfs4_vec_client::nfs4::{FileHandle, NfsStat, StateId};
use nfs4_vec_client::transport::{Transport, TransportError};
use nfs4_vec_client::xdr::{DecodedOp, DecodedReply, EncodedOp, XdrCodec};

#[derive(Debug, Clone)]
struct Node {
    is_dir: bool,
    data: Vec<u8>,
    attrs: Attrs,
}

impl Node {
    fn dir() -> Self {
        Node { is_dir: true, data: Vec::new(), attrs: Attrs::new().set_mode(0o755) }
    }

    fn file() -> Self {
        Node { is_dir: false, data: Vec::new(), attrs: Attrs::new().set_mode(0o644) }
    }
}

struct Fs {
    nodes: HashMap<String, Node>,
}

impl Fs {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::dir());
        Fs { nodes }
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Request envelope `MockCodec::encode_compound` produces and `MockServer`
/// parses back apart. Kept separate from `DecodedReply` because requests and
/// replies carry different shapes (a tag instead of a status).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RequestEnvelope {
    tag: String,
    ops: Vec<EncodedOp>,
}

/// Turns an integer counter into deterministic filler bytes for stateids and
/// cookie verifiers — the one place this fixture reaches for `byteorder`
/// rather than just formatting a string, mirroring how the real codec would
/// lay an integer into a fixed-width wire field.
fn counter_bytes<const N: usize>(counter: u32) -> [u8; N] {
    let mut buf = [0u8; N];
    let mut scratch = [0u8; 4];
    BigEndian::write_u32(&mut scratch, counter);
    let take = N.min(4);
    buf[N - take..].copy_from_slice(&scratch[4 - take..]);
    buf
}

/// An in-memory NFSv4 server: evaluates compounds against a flat path-keyed
/// filesystem. File handles are simply the path's bytes, which keeps PUTFH
/// trivial and sidesteps modeling a real inode table.
pub struct MockServer {
    fs: Mutex<Fs>,
    next_id: AtomicU32,
    /// Op-call counter the fault-injection knobs below count against.
    calls: AtomicU32,
    /// If set, the call at this index (0-based, across every `Transport::call`
    /// this server backs) fails at the transport level instead of being
    /// evaluated — used to exercise the dispatcher's shard-abort path.
    fail_at_call: AtomicI64,
}

impl MockServer {
    pub fn new() -> Arc<Self> {
        Arc::new(MockServer {
            fs: Mutex::new(Fs::new()),
            next_id: AtomicU32::new(1),
            calls: AtomicU32::new(0),
            fail_at_call: AtomicI64::new(-1),
        })
    }

    /// Makes the `n`th call into this server (0-based) fail at the transport
    /// layer, simulating a dropped connection partway through a batch.
    pub fn fail_call(&self, n: u32) {
        self.fail_at_call.store(n as i64, Ordering::SeqCst);
    }

    /// Number of `Transport::call` round-trips this server has backed so
    /// far — one per COMPOUND, so tests can assert a batch sharded into the
    /// expected number of compounds.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_stateid(&self) -> StateId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        StateId { seqid: 0, other: counter_bytes(id) }
    }

    fn process(&self, request: &RequestEnvelope) -> DecodedReply {
        let mut fs = self.fs.lock().expect("mock fs mutex poisoned");
        let mut current: Option<String> = None;
        let mut saved: Option<String> = None;
        let mut decoded = Vec::with_capacity(request.ops.len());
        let mut status = NfsStat::Ok;

        for op in &request.ops {
            let (result, op_status) = eval_op(&mut fs, &mut current, &mut saved, &op.args, self);
            let failed = op_status != NfsStat::Ok;
            decoded.push(DecodedOp { status: op_status, result });
            if failed {
                status = op_status;
                break;
            }
        }

        DecodedReply { status, ops: decoded }
    }
}

/// Evaluates one operation against `fs`, threading `current`/`saved` the way
/// a real server's compound loop does (RFC 5661 §15.2).
fn eval_op(
    fs: &mut Fs,
    current: &mut Option<String>,
    saved: &mut Option<String>,
    args: &NfsOpArgs,
    server: &MockServer,
) -> (Option<NfsOpResult>, NfsStat) {
    match args {
        NfsOpArgs::PutRootFh => {
            *current = Some("/".to_string());
            (Some(NfsOpResult::PutRootFh), NfsStat::Ok)
        }
        NfsOpArgs::PutFh(handle) => match String::from_utf8(handle.0.clone()) {
            Ok(path) if fs.nodes.contains_key(&path) => {
                *current = Some(path);
                (Some(NfsOpResult::PutFh), NfsStat::Ok)
            }
            Ok(_) => (None, NfsStat::Stale),
            Err(_) => (None, NfsStat::BadHandle),
        },
        NfsOpArgs::GetFh => match current {
            Some(path) => (Some(NfsOpResult::GetFh(FileHandle(path.clone().into_bytes()))), NfsStat::Ok),
            None => (None, NfsStat::ServerFault),
        },
        NfsOpArgs::SaveFh => {
            *saved = current.clone();
            (Some(NfsOpResult::SaveFh), NfsStat::Ok)
        }
        NfsOpArgs::RestoreFh => {
            *current = saved.clone();
            (Some(NfsOpResult::RestoreFh), NfsStat::Ok)
        }
        NfsOpArgs::Sequence { .. } => (Some(NfsOpResult::Sequence), NfsStat::Ok),
        NfsOpArgs::Lookup { name } => {
            let Some(dir) = current.clone() else { return (None, NfsStat::ServerFault) };
            let child = join(&dir, name);
            if fs.nodes.contains_key(&child) {
                *current = Some(child);
                (Some(NfsOpResult::Lookup), NfsStat::Ok)
            } else {
                (None, NfsStat::NoEnt)
            }
        }
        NfsOpArgs::Open { name, how, .. } => {
            let Some(dir) = current.clone() else { return (None, NfsStat::ServerFault) };
            let child = join(&dir, name);
            let exists = fs.nodes.contains_key(&child);
            match how {
                CreateHow::NoCreate => {
                    if !exists {
                        return (None, NfsStat::NoEnt);
                    }
                }
                CreateHow::Guarded(attrs) => {
                    if exists {
                        return (None, NfsStat::Exist);
                    }
                    let mut node = Node::file();
                    node.attrs = *attrs;
                    fs.nodes.insert(child.clone(), node);
                }
                CreateHow::Unchecked(attrs) => {
                    let mut node = Node::file();
                    node.attrs = *attrs;
                    fs.nodes.insert(child.clone(), node);
                }
            }
            *current = Some(child);
            (Some(NfsOpResult::Open { stateid: server.next_stateid() }), NfsStat::Ok)
        }
        NfsOpArgs::OpenConfirm { stateid, .. } => (Some(NfsOpResult::OpenConfirm { stateid: *stateid }), NfsStat::Ok),
        NfsOpArgs::Close { .. } => (Some(NfsOpResult::Close), NfsStat::Ok),
        NfsOpArgs::Read { offset, count, .. } => {
            let Some(path) = current.clone() else { return (None, NfsStat::ServerFault) };
            match fs.nodes.get(&path) {
                Some(node) if !node.is_dir => {
                    let start = (*offset as usize).min(node.data.len());
                    let end = (start + *count as usize).min(node.data.len());
                    let data = node.data[start..end].to_vec();
                    let eof = end >= node.data.len();
                    (Some(NfsOpResult::Read { data, eof }), NfsStat::Ok)
                }
                Some(_) => (None, NfsStat::IsDir),
                None => (None, NfsStat::Stale),
            }
        }
        NfsOpArgs::Write { offset, data, .. } => {
            let Some(path) = current.clone() else { return (None, NfsStat::ServerFault) };
            match fs.nodes.get_mut(&path) {
                Some(node) if !node.is_dir => {
                    let start = *offset as usize;
                    if node.data.len() < start + data.len() {
                        node.data.resize(start + data.len(), 0);
                    }
                    node.data[start..start + data.len()].copy_from_slice(data);
                    (Some(NfsOpResult::Write { count: data.len() as u32, verifier: counter_bytes(1) }), NfsStat::Ok)
                }
                Some(_) => (None, NfsStat::IsDir),
                None => (None, NfsStat::Stale),
            }
        }
        NfsOpArgs::Commit { .. } => (Some(NfsOpResult::Commit { verifier: counter_bytes(1) }), NfsStat::Ok),
        NfsOpArgs::GetAttr { .. } => {
            let Some(path) = current.clone() else { return (None, NfsStat::ServerFault) };
            match fs.nodes.get(&path) {
                Some(node) => {
                    let mut attrs = node.attrs;
                    attrs.size = Some(node.data.len() as u64);
                    (Some(NfsOpResult::GetAttr(attrs)), NfsStat::Ok)
                }
                None => (None, NfsStat::Stale),
            }
        }
        NfsOpArgs::SetAttr { attrs, .. } => {
            let Some(path) = current.clone() else { return (None, NfsStat::ServerFault) };
            match fs.nodes.get_mut(&path) {
                Some(node) => {
                    if let Some(mode) = attrs.mode {
                        node.attrs.mode = Some(mode);
                    }
                    if let Some(uid) = attrs.uid {
                        node.attrs.uid = Some(uid);
                    }
                    if let Some(gid) = attrs.gid {
                        node.attrs.gid = Some(gid);
                    }
                    if let Some(atime) = attrs.atime {
                        node.attrs.atime = Some(atime);
                    }
                    if let Some(mtime) = attrs.mtime {
                        node.attrs.mtime = Some(mtime);
                    }
                    if let Some(size) = attrs.size {
                        node.data.resize(size as usize, 0);
                    }
                    (Some(NfsOpResult::SetAttr), NfsStat::Ok)
                }
                None => (None, NfsStat::Stale),
            }
        }
        NfsOpArgs::Rename { old_name, new_name } => {
            let Some(src_dir) = saved.clone() else { return (None, NfsStat::ServerFault) };
            let Some(dst_dir) = current.clone() else { return (None, NfsStat::ServerFault) };
            let old_path = join(&src_dir, old_name);
            let new_path = join(&dst_dir, new_name);
            if !fs.nodes.contains_key(&old_path) {
                return (None, NfsStat::NoEnt);
            }
            let moved: Vec<(String, Node)> = fs
                .nodes
                .iter()
                .filter(|(k, _)| *k == &old_path || k.starts_with(&format!("{old_path}/")))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (k, v) in moved {
                let suffix = &k[old_path.len()..];
                fs.nodes.remove(&k);
                fs.nodes.insert(format!("{new_path}{suffix}"), v);
            }
            (Some(NfsOpResult::Rename), NfsStat::Ok)
        }
        NfsOpArgs::Remove { name } => {
            let Some(dir) = current.clone() else { return (None, NfsStat::ServerFault) };
            let target = join(&dir, name);
            let has_children = fs.nodes.keys().any(|k| k.starts_with(&format!("{target}/")));
            if has_children {
                return (None, NfsStat::NotEmpty);
            }
            match fs.nodes.remove(&target) {
                Some(_) => (Some(NfsOpResult::Remove), NfsStat::Ok),
                None => (None, NfsStat::NoEnt),
            }
        }
        NfsOpArgs::Create { name, is_dir, attrs } => {
            let Some(dir) = current.clone() else { return (None, NfsStat::ServerFault) };
            let child = join(&dir, name);
            if *is_dir && fs.nodes.contains_key(&child) {
                return (None, NfsStat::Exist);
            }
            let mut node = if *is_dir { Node::dir() } else { Node::file() };
            node.attrs = *attrs;
            fs.nodes.insert(child.clone(), node);
            *current = Some(child);
            (Some(NfsOpResult::Create), NfsStat::Ok)
        }
        NfsOpArgs::ReadDir { cookie, max_bytes, mask, .. } => {
            let Some(dir) = current.clone() else { return (None, NfsStat::ServerFault) };
            let prefix = if dir == "/" { "/".to_string() } else { format!("{dir}/") };
            let mut children: Vec<String> = fs
                .nodes
                .keys()
                .filter(|k| k.starts_with(&prefix) && !k[prefix.len()..].contains('/') && k.as_str() != dir.as_str())
                .cloned()
                .collect();
            children.sort();

            let start = *cookie as usize;
            let mut entries = Vec::new();
            let mut bytes_used = 0u32;
            let mut idx = start;
            while idx < children.len() {
                let path = &children[idx];
                if bytes_used > 0 && bytes_used + 96 > *max_bytes {
                    break;
                }
                let node = fs.nodes.get(path).expect("listed child vanished");
                let name = path[prefix.len()..].to_string();
                let mut attrs = node.attrs;
                if mask.contains(AttrMask::SIZE) {
                    attrs.size = Some(node.data.len() as u64);
                }
                entries.push(DirEntry { cookie: (idx + 1) as u64, name, attrs });
                bytes_used += 96;
                idx += 1;
            }
            let eof = idx >= children.len();
            (
                Some(NfsOpResult::ReadDir { entries, cookie_verf: counter_bytes(7), eof }),
                NfsStat::Ok,
            )
        }
    }
}

/// `Transport` that hands each encoded request to a background task which
/// evaluates it against a shared `MockServer`, replying over a one-shot
/// `async_channel` — a stand-in for a real socket round-trip that still
/// exercises genuine cross-task scheduling.
pub struct MockTransport {
    server: Arc<MockServer>,
}

impl MockTransport {
    pub fn new(server: Arc<MockServer>) -> Self {
        MockTransport { server }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn call(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let n = self.server.calls.fetch_add(1, Ordering::SeqCst);
        if self.server.fail_at_call.load(Ordering::SeqCst) == n as i64 {
            return Err(TransportError::Disconnected("mock fault injection".to_string()));
        }

        let text = std::str::from_utf8(request).map_err(|e| TransportError::Other(e.to_string()))?;
        let envelope: RequestEnvelope = toml::from_str(text).map_err(|e| TransportError::Other(e.to_string()))?;

        let (tx, rx) = async_channel::bounded(1);
        let server = self.server.clone();
        tokio::spawn(async move {
            let reply = server.process(&envelope);
            let _ = tx.send(reply).await;
        });

        let reply = rx.recv().await.map_err(|e| TransportError::Other(e.to_string()))?;
        toml::to_string(&reply).map(String::into_bytes).map_err(|e| TransportError::Other(e.to_string()))
    }
}

/// `XdrCodec` matching `MockTransport`'s wire format: `toml` over the
/// structured request/reply envelopes, not a real RFC 4506 encoding.
pub struct MockCodec;

impl XdrCodec for MockCodec {
    fn encode_compound(&self, tag: &str, ops: &[EncodedOp]) -> Vec<u8> {
        let envelope = RequestEnvelope { tag: tag.to_string(), ops: ops.to_vec() };
        toml::to_string(&envelope).expect("mock envelope always serializes").into_bytes()
    }

    fn decode_reply(&self, bytes: &[u8]) -> Result<DecodedReply, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
        toml::from_str(text).map_err(|e| e.to_string())
    }
}
