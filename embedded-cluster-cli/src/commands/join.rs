use clap::{Args, Subcommand};
use embedded_cluster::HttpTokenSource;
use embedded_cluster::join::{JoinOptions, join, join_preflights};
use embedded_cluster::util::ensure_root;

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct JoinArgs {
    #[command(subcommand)]
    pub command: Option<JoinCommand>,

    #[command(flatten)]
    pub target: JoinTarget,

    #[command(flatten)]
    pub flags: JoinFlags,

    /// Enable high availability after joining a controller
    #[arg(long)]
    pub enable_ha: bool,
}

#[derive(Subcommand, Debug)]
pub enum JoinCommand {
    /// Run host preflights without joining
    #[command(hide = true)]
    RunPreflights {
        #[command(flatten)]
        target: JoinTarget,
        #[command(flatten)]
        flags: JoinFlags,
    },
}

#[derive(Args, Debug, Clone)]
pub struct JoinTarget {
    /// Admin console address, `host:port`
    #[arg(required = true)]
    pub url: Option<String>,

    /// Join token issued by the admin console
    #[arg(required = true)]
    pub token: Option<String>,
}

impl JoinTarget {
    fn parts(&self) -> anyhow::Result<(&str, &str)> {
        match (&self.url, &self.token) {
            (Some(url), Some(token)) => Ok((url, token)),
            _ => anyhow::bail!("usage: join <url> <token>"),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct JoinFlags {
    /// Do not prompt; accept preflight warnings
    #[arg(long)]
    pub no_prompt: bool,

    /// Interface whose address the node advertises
    #[arg(long, value_name = "NAME")]
    pub network_interface: Option<String>,
}

impl JoinFlags {
    fn options(&self, enable_ha: bool) -> JoinOptions {
        JoinOptions {
            no_prompt: self.no_prompt,
            network_interface: self.network_interface.clone(),
            enable_ha,
        }
    }
}

pub async fn execute(args: JoinArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let tokens = HttpTokenSource::new()?;
    match args.command {
        Some(JoinCommand::RunPreflights { target, flags }) => {
            ensure_root("run-preflights")?;
            let (url, token) = target.parts()?;
            let host = global.host_context()?;
            let cancel = super::cancel_on_interrupt();
            join_preflights(&host, &tokens, url, token, &flags.options(false), &cancel).await?;
        }
        None => {
            ensure_root("join")?;
            let (url, token) = args.target.parts()?;
            let host = global.host_context()?;
            let cancel = super::cancel_on_interrupt();
            join(
                &host,
                &tokens,
                url,
                token,
                &args.flags.options(args.enable_ha),
                &cancel,
            )
            .await?;
        }
    }
    Ok(())
}
