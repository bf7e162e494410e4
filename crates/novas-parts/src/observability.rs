use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

/// Filter used when neither `NOVAS_LOG` nor `RUST_LOG` is set: the novas
/// crates at `info`, everything else (reqwest, hyper) at `warn`.
pub const DEFAULT_FILTER: &str = "warn,novas=info,novas_chat=info,novas_parts=info,novas_plugins=info";

const DEFAULT_LOG_FILE: &str = "novas.logs.jsonl";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact lines on stderr, so they never mix with transcripts on stdout.
    Stderr,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

/// Logging setup resolved from the environment.
///
/// - `NOVAS_LOG`: filter directives (`debug`, `novas_chat=trace`, `off`).
///   Falls back to `RUST_LOG`, then [`DEFAULT_FILTER`].
/// - `NOVAS_LOG_FILE`: write JSON lines to this file instead of stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub output: LogOutput,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            output: LogOutput::Stderr,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let filter = non_empty("NOVAS_LOG")
            .or_else(|| non_empty("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let output = non_empty("NOVAS_LOG_FILE")
            .map(|path| LogOutput::JsonFile(PathBuf::from(path)))
            .unwrap_or(LogOutput::Stderr);
        Self { filter, output }
    }

    /// Parsed filter; invalid directives fall back to [`DEFAULT_FILTER`].
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    /// Installs the global subscriber. Only the first call per process has
    /// any effect.
    pub fn init(&self) {
        INIT.get_or_init(|| match &self.output {
            LogOutput::JsonFile(path) => {
                let (dir, file_name) = split_log_path(path);
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(self.env_filter())
                    .with(json_layer)
                    .try_init();
            }
            LogOutput::Stderr => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(self.env_filter())
                    .with(console_layer)
                    .try_init();
            }
        });
    }
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Initializes logging from the environment, once per process.
pub fn init_observability() {
    LogSettings::from_env().init();
}
