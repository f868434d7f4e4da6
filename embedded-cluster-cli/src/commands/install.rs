use clap::{Args, Subcommand};
use embedded_cluster::install::{InstallOptions, install, install_preflights};
use embedded_cluster::net::ProxySpec;
use embedded_cluster::util::ensure_root;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(subcommand)]
    pub command: Option<InstallCommand>,

    #[command(flatten)]
    pub flags: InstallFlags,
}

#[derive(Subcommand, Debug)]
pub enum InstallCommand {
    /// Run host preflights without installing
    #[command(hide = true)]
    RunPreflights(InstallFlags),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallFlags {
    /// Do not prompt; accept preflight warnings
    #[arg(long)]
    pub no_prompt: bool,

    /// File with unsupported overrides for the cluster config
    #[arg(long, value_name = "PATH")]
    pub overrides: Option<PathBuf>,

    /// Path to the application license
    #[arg(long, short = 'l', value_name = "PATH")]
    pub license: Option<PathBuf>,

    /// Interface whose address the node advertises
    #[arg(long, value_name = "NAME")]
    pub network_interface: Option<String>,

    /// HTTP proxy for the cluster
    #[arg(long, env = "HTTP_PROXY", value_name = "URL")]
    pub http_proxy: Option<String>,

    /// HTTPS proxy for the cluster
    #[arg(long, env = "HTTPS_PROXY", value_name = "URL")]
    pub https_proxy: Option<String>,

    /// Comma separated addresses that bypass the proxy
    #[arg(long, env = "NO_PROXY", value_name = "LIST")]
    pub no_proxy: Option<String>,
}

impl InstallFlags {
    pub fn proxy(&self) -> Option<ProxySpec> {
        let spec = ProxySpec {
            http_proxy: self.http_proxy.clone().unwrap_or_default(),
            https_proxy: self.https_proxy.clone().unwrap_or_default(),
            no_proxy: self.no_proxy.clone().unwrap_or_default(),
        };
        spec.is_set().then_some(spec)
    }

    pub fn options(&self) -> InstallOptions {
        InstallOptions {
            no_prompt: self.no_prompt,
            overrides: self.overrides.clone(),
            license: self.license.clone(),
            network_interface: self.network_interface.clone(),
            proxy: self.proxy(),
        }
    }
}

pub async fn execute(args: InstallArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    match args.command {
        Some(InstallCommand::RunPreflights(flags)) => {
            ensure_root("run-preflights")?;
            let host = global.host_context()?;
            let cancel = super::cancel_on_interrupt();
            install_preflights(&host, &flags.options(), &cancel).await?;
        }
        None => {
            ensure_root("install")?;
            let host = global.host_context()?;
            let cancel = super::cancel_on_interrupt();
            install(&host, &args.flags.options(), &cancel).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_unset() {
        assert!(InstallFlags::default().proxy().is_none());
    }

    #[test]
    fn test_proxy_partial() {
        let flags = InstallFlags {
            https_proxy: Some("http://proxy:3128".into()),
            ..Default::default()
        };
        let proxy = flags.proxy().unwrap();
        assert_eq!(proxy.https_proxy, "http://proxy:3128");
        assert!(proxy.no_proxy.is_empty());
    }
}
