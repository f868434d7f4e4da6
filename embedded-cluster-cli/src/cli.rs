use crate::commands::{install::InstallArgs, join::JoinArgs, version::VersionArgs};
use clap::{Args, Parser, Subcommand};
use embedded_cluster::bundle::ReleaseBundle;
use embedded_cluster::util::{WorkerGuard, binary_name, log_file_writer, register_to_tracing};
use embedded_cluster::{HostContext, HostLayout};
use embedded_cluster_shared::constants::envs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "embedded-cluster",
    author,
    version,
    about = "Install and join embedded Kubernetes clusters",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the first node of a new cluster
    Install(InstallArgs),
    /// Join this node to an existing cluster
    Join(JoinArgs),
    /// Show component versions
    Version(VersionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Enable debug logging on the console
    #[arg(long, global = true)]
    pub debug: bool,

    /// Root every host path is resolved under
    #[arg(long, global = true, hide = true, env = envs::HOST_ROOT, default_value = "/")]
    pub host_root: PathBuf,

    /// Release bundle directory (defaults to `release/` next to the binary)
    #[arg(long, global = true, env = envs::RELEASE_DIR)]
    pub release_dir: Option<PathBuf>,
}

impl GlobalFlags {
    pub fn layout(&self) -> HostLayout {
        HostLayout::new(self.host_root.clone())
    }

    pub fn release(&self) -> anyhow::Result<ReleaseBundle> {
        match &self.release_dir {
            Some(dir) => Ok(ReleaseBundle::new(dir.clone())),
            None => Ok(ReleaseBundle::locate()?),
        }
    }

    /// Collaborators wired against the real host.
    pub fn host_context(&self) -> anyhow::Result<HostContext> {
        Ok(HostContext::system(
            self.layout(),
            self.release()?,
            binary_name(),
        )?)
    }

    /// Console logging, plus a debug log file when `with_file` is set.
    ///
    /// The returned guard flushes the file on drop.
    pub fn init_logging(&self, with_file: bool) -> Option<WorkerGuard> {
        let console = if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };

        if !with_file {
            register_to_tracing(console, None);
            return None;
        }

        match log_file_writer(&self.layout().logs_dir(), &binary_name()) {
            Ok((writer, guard, path)) => {
                register_to_tracing(console, Some(writer));
                tracing::debug!(path = %path.display(), "writing debug log");
                Some(guard)
            }
            Err(e) => {
                register_to_tracing(console, None);
                tracing::debug!(error = %e, "debug log file unavailable");
                None
            }
        }
    }
}
