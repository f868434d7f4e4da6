mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use embedded_cluster::ClusterError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let with_file = !matches!(cli.command, Commands::Version(_));
    let guard = cli.global.init_logging(with_file);

    if let Err(e) = embedded_cluster::images::load() {
        eprintln!("Error: {e}");
        drop(guard);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Install(args) => commands::install::execute(args, &cli.global).await,
        Commands::Join(args) => commands::join::execute(args, &cli.global).await,
        Commands::Version(args) => commands::version::execute(args, &cli.global).await,
    };

    if let Err(e) = result {
        // The preflight table has already been printed.
        let reported = e
            .downcast_ref::<ClusterError>()
            .is_some_and(ClusterError::is_preflights_failed);
        if !reported {
            eprintln!("Error: {e:#}");
        }
        drop(guard);
        std::process::exit(1);
    }
}
