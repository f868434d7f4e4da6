use clap::{Args, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use embedded_cluster::images::{Arch, list_images, metadata};
use embedded_cluster::images::enumerate::distribution_images;
use embedded_cluster::install::stages::config::render_and_patch;
use embedded_cluster::util::SystemCommandRunner;
use embedded_cluster_shared::constants::names;
use std::io::Write;

#[derive(Args, Debug)]
pub struct VersionArgs {
    #[command(subcommand)]
    pub command: Option<VersionCommand>,
}

#[derive(Subcommand, Debug)]
pub enum VersionCommand {
    /// List the images the cluster needs
    #[command(hide = true)]
    ListImages,
}

pub async fn execute(args: VersionArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    match args.command {
        Some(VersionCommand::ListImages) => list(global).await,
        None => {
            println!("{}", versions_table());
            Ok(())
        }
    }
}

fn versions_table() -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Component", "Version"]);
    table.add_row(vec!["Installer".to_string(), embedded_cluster::VERSION.to_string()]);

    let md = metadata();
    if let Ok(arch) = Arch::current() {
        for name in md.names() {
            if let Ok(image) = md.resolve(name, arch) {
                table.add_row(vec![name.to_string(), image.tag]);
            }
        }
    }
    table.to_string()
}

/// Render the config, ask the bundled k0s for its images and filter them.
async fn list(global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let host = global.host_context()?;
    let cfg = render_and_patch(&host, None)?;

    let mut file = tempfile::Builder::new()
        .prefix("k0s-config")
        .suffix(".yaml")
        .tempfile()?;
    file.write_all(cfg.to_yaml()?.as_bytes())?;

    let k0s = host.release.bin_dir().join(names::K0S_BINARY);
    let upstream = distribution_images(&SystemCommandRunner, &k0s, file.path()).await?;
    for image in list_images(&cfg, upstream) {
        println!("{image}");
    }
    Ok(())
}
