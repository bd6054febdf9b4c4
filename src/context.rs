//! Context init/deinit (§4.8/§4.9): owns the Tokio runtime the
//! "synchronous" public API drives to completion, the per-process caches,
//! session state, and the caller-supplied `Transport`/`XdrCodec` pair.

use std::process;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::cache::{DescriptorTable, HandleCache};
use crate::compound::executor::SessionState;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{NfsClientError, Result};
use crate::transport::Transport;
use crate::xdr::XdrCodec;

/// Everything a call into this crate needs: one long-lived value, built
/// once at `init` and torn down at `deinit`.
pub struct Context {
    runtime: tokio::runtime::Runtime,
    pub(crate) config: Config,
    pub(crate) handles: HandleCache,
    pub(crate) descriptors: DescriptorTable,
    pub(crate) session: SessionState,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) codec: Box<dyn XdrCodec>,
    pub(crate) client_owner: String,
    cwd: Mutex<String>,
    export_id: String,
}

impl Context {
    /// Loads config, builds logging, then hands the loaded `Config` to
    /// `transport_factory` so the caller's transport can pick up
    /// `server_addr`/`credential` without this crate fabricating a concrete
    /// network implementation of its own (§6 excludes that from scope;
    /// `codec` is supplied the same way for the wire encoding).
    pub fn init(
        transport_factory: Box<dyn FnOnce(&Config) -> Box<dyn Transport>>,
        codec: Box<dyn XdrCodec>,
        config_path: Option<&str>,
        log_path: Option<&str>,
        export_id: &str,
    ) -> Result<Context> {
        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        init_logging(log_path.or(config.log_path.as_deref()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| NfsClientError::Config(format!("building tokio runtime: {e}")))?;

        let transport = transport_factory(&config);
        let handles = HandleCache::new(config.handle_cache_capacity);
        let descriptors = DescriptorTable::new();
        let session = SessionState::new([0u8; 16]);
        let client_owner = format!("nfs4-vec-client.{}", process::id());

        tracing::info!(export_id, %client_owner, "context initialized");

        Ok(Context {
            runtime,
            config,
            handles,
            descriptors,
            session,
            transport,
            codec,
            client_owner,
            cwd: Mutex::new("/".to_string()),
            export_id: export_id.to_string(),
        })
    }

    pub fn export_id(&self) -> &str {
        &self.export_id
    }

    pub fn chdir(&self, path: &str) -> Result<()> {
        let absolute = if path.starts_with('/') {
            crate::path::normalize(path)
        } else {
            let cwd = self.cwd.lock().expect("cwd mutex poisoned").clone();
            crate::path::join(&cwd, path)
        }
        .map_err(|_| NfsClientError::Invalid("path too long"))?;
        *self.cwd.lock().expect("cwd mutex poisoned") = absolute;
        Ok(())
    }

    pub fn getcwd(&self) -> String {
        self.cwd.lock().expect("cwd mutex poisoned").clone()
    }

    /// Logs and drops everything. Kept as an explicit call (rather than
    /// relying on `Drop`) so a caller controls exactly when the runtime and
    /// any outstanding connections go away.
    pub fn deinit(self) {
        tracing::info!(export_id = %self.export_id, "context deinitialized");
    }

    /// Runs an async future on this context's runtime, giving every public
    /// API entry point its "synchronous" signature (§6).
    pub(crate) fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Builds a `Dispatcher` borrowing this context and the snapshot of the
    /// current working directory `cwd` holds — callers build one of these
    /// per API call, right before `block_on`ning its `run`.
    pub(crate) fn dispatcher<'a>(&'a self, cwd: &'a str) -> Dispatcher<'a> {
        Dispatcher {
            cwd,
            client_owner: &self.client_owner,
            handles: &self.handles,
            descriptors: &self.descriptors,
            session: &self.session,
            transport: self.transport.as_ref(),
            codec: self.codec.as_ref(),
            config: &self.config,
        }
    }
}

fn init_logging(log_path: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match log_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| NfsClientError::Config(format!("opening log file {path}: {e}")))?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        None => builder.try_init(),
    };

    // A prior `init` in this process already installed a subscriber; that
    // is fine, not every test gets its own process.
    let _ = result;
    Ok(())
}
