//! Logging infrastructure
//!
//! - Console logging (human-readable, verbose mode only)
//! - JSON file logging, rotated daily
//! - SQLite chat log in the same directory

use crate::chat_log::SqliteChatLog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Owns the logging pipeline for the life of the process
pub struct Telemetry {
    session_id: Uuid,
    chat_log: Arc<SqliteChatLog>,
    _file_guard: Option<WorkerGuard>,
}

impl Telemetry {
    /// Install the tracing subscriber and open the chat log under `log_dir`
    pub fn init(log_dir: PathBuf, verbose: bool) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&log_dir)?;

        let session_id = Uuid::new_v4();
        let chat_log = Arc::new(SqliteChatLog::open(&log_dir.join("chat_log.db"), session_id)?);

        let file_appender = tracing_appender::rolling::daily(&log_dir, "ark_bridge.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

        let make_env_filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if verbose {
                    EnvFilter::new("debug,hyper=info,reqwest=info,h2=info,rustls=info")
                } else {
                    EnvFilter::new("info,hyper=warn,reqwest=warn,h2=warn,rustls=warn")
                }
            })
        };

        if verbose {
            // Verbose mode: console (stderr) + file
            tracing_subscriber::registry()
                .with(make_env_filter())
                .with(
                    fmt::layer()
                        .with_target(false)
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init()
                .ok();
        } else {
            // Normal mode: file only (no console noise)
            tracing_subscriber::registry()
                .with(make_env_filter())
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init()
                .ok();
        }

        tracing::info!(
            session_id = %session_id,
            log_dir = %log_dir.display(),
            "Telemetry initialized"
        );

        Ok(Self {
            session_id,
            chat_log,
            _file_guard: Some(file_guard),
        })
    }

    /// Chat log only, no subscriber (for tests and embedding hosts)
    pub fn minimal(log_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let session_id = Uuid::new_v4();
        let chat_log = Arc::new(SqliteChatLog::open(&log_dir.join("chat_log.db"), session_id)?);

        Ok(Self {
            session_id,
            chat_log,
            _file_guard: None,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Shared handle to the chat log
    pub fn chat_log(&self) -> Arc<SqliteChatLog> {
        self.chat_log.clone()
    }
}
