pub mod process;

use std::path::{Path, PathBuf};

use embedded_cluster_shared::constants::names;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
pub use tracing_appender::non_blocking::WorkerGuard;

/// Name the operator invoked us by, used for service and metrics naming.
pub fn binary_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| names::DEFAULT_BINARY_NAME.to_string())
}

/// Whether the effective user is root.
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Fail with `NotRoot` unless running as root.
pub fn ensure_root(command: &str) -> ClusterResult<()> {
    if is_root() {
        Ok(())
    } else {
        Err(ClusterError::NotRoot {
            command: command.to_string(),
        })
    }
}

/// Open a non-blocking debug log file under `logs_dir`.
///
/// The returned guard must be held until exit so buffered lines are flushed.
pub fn log_file_writer(
    logs_dir: &Path,
    binary_name: &str,
) -> ClusterResult<(NonBlocking, WorkerGuard, PathBuf)> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        ClusterError::Storage(format!(
            "failed to create log dir {}: {e}",
            logs_dir.display()
        ))
    })?;

    let file_name = format!(
        "{}-{}.log",
        binary_name,
        chrono::Local::now().format("%Y%m%d%H%M%S")
    );
    let appender = tracing_appender::rolling::never(logs_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    Ok((non_blocking, guard, logs_dir.join(file_name)))
}

/// Install the global subscriber: console output filtered by
/// `console_filter`, plus an optional debug-level file layer.
pub fn register_to_tracing(console_filter: EnvFilter, file: Option<NonBlocking>) {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let file = file.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(false)
            .with_filter(EnvFilter::new("debug"))
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
