//! Configuration loaded at `init` time (§4.8): a TOML file merged over
//! built-in defaults.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::error::{NfsClientError, Result};

/// Credential material attached to every compound's RPC auth flavor.
///
/// Only AUTH_SYS fields are modeled; a deployment needing Kerberos/RPCSEC_GSS
/// would extend this rather than replace it, since the rest of the planner
/// never inspects these fields itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Credential {
    pub uid: u32,
    pub gid: u32,
    pub machine_name: String,
}

impl Default for Credential {
    fn default() -> Self {
        Credential { uid: 0, gid: 0, machine_name: "localhost".to_string() }
    }
}

/// Tuning knobs for the planner. Every field has a sensible default so a
/// caller can pass an empty (or absent) config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address of the NFSv4.1 server this context talks to. The config
    /// loader only carries this value; building a connection from it is the
    /// caller-supplied transport factory's job (§6).
    pub server_addr: SocketAddr,
    /// Path of the export this context's root directory resolves under.
    pub export_root: String,
    /// RPC auth flavor fields threaded through to the transport factory.
    pub credential: Credential,
    /// Upper bound on NFSv4 operations packed into one COMPOUND before the
    /// dispatcher shards a batch across several (§4.3).
    pub max_ops_per_compound: usize,
    /// How long the executor waits for one compound round-trip before
    /// treating it as timed out.
    pub compound_timeout_ms: u64,
    /// Number of retries the executor attempts on a transient failure
    /// before giving up (§4.4).
    pub retry_limit: u32,
    /// Capacity of the path → handle cache.
    pub handle_cache_capacity: u64,
    /// Path to the log file `init` should direct `tracing` output to; `None`
    /// logs to stderr.
    pub log_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 2049)),
            export_root: "/".to_string(),
            credential: Credential::default(),
            max_ops_per_compound: 16,
            compound_timeout_ms: 30_000,
            retry_limit: 3,
            handle_cache_capacity: 8192,
            log_path: None,
        }
    }
}

impl Config {
    /// Loads and parses a TOML config file, defaulting any field it omits.
    pub fn load(path: &str) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| NfsClientError::Config(format!("reading {path}: {e}")))?;
        toml::from_str(&text).map_err(|e| NfsClientError::Config(format!("parsing {path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.max_ops_per_compound, 16);
        assert_eq!(cfg.retry_limit, 3);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nfs4-vec-client.toml");
        std::fs::write(&path, "retry_limit = 5\n").unwrap();
        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.retry_limit, 5);
        assert_eq!(cfg.max_ops_per_compound, 16);
    }
}
