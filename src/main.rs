use std::io::IsTerminal;

use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use grid_cli::cli::{Cli, Command, NodesCommand, VmsCommand};
use grid_cli::commands::{self, connect, nodes, vms, whoami};
use grid_cli::error::GridCliError;
use grid_cli::grid::proxy::ProxyGrid;
use grid_cli::profile::{FileProfileStore, ProfileStore};
use grid_cli::progress::{OutputMode, Progress};
use grid_cli::prompt::{DefaultsPrompter, InquirePrompter, Prompter};
use grid_cli::{paths, render};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = parse_args();

    let terminal_filter = if cli.quiet {
        EnvFilter::new("off")
    } else if cli.verbose {
        EnvFilter::new("grid_cli=debug")
    } else {
        EnvFilter::from_default_env()
            .add_directive("grid_cli=info".parse().expect("valid log directive"))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(terminal_filter),
        )
        .init();

    // Debug lines would interleave with spinner redraws.
    let progress = Progress::new(if std::io::stderr().is_terminal() && !cli.verbose {
        OutputMode::Spinner
    } else {
        OutputMode::Plain
    });

    let store = FileProfileStore::new(cli.profile.clone().unwrap_or_else(paths::profile_path));
    tracing::info!("searching for the config file");

    match cli.command {
        Command::Connect(args) => {
            let mut prompter = prompter_for(args.interactive);
            let profile = connect::prepare(&args, store.load()?, prompter.as_mut())?;

            let mut grid =
                ProxyGrid::new(profile.network()?, profile.twin()).map_err(GridCliError::from)?;
            connect::establish(&mut grid, profile, args.interactive, prompter.as_mut(), &store)
                .await?;
            tracing::info!("profile written to {}", store.path().display());
        }
        Command::Whoami => {
            let profile = store.load()?;
            let network = commands::ensure_connected(&profile)?;
            tracing::info!("config file found");

            let mut grid =
                ProxyGrid::new(network, profile.twin()).map_err(GridCliError::from)?;
            let profile = whoami::run(&mut grid, profile, &store).await?;
            println!("{}", render::profile(&profile));
        }
        Command::Nodes {
            action: NodesCommand::List { status },
        } => {
            let profile = store.load()?;
            let network = commands::ensure_connected(&profile)?;

            let mut grid =
                ProxyGrid::new(network, profile.twin()).map_err(GridCliError::from)?;
            let found = nodes::list(&mut grid, status, &progress).await?;
            if found.is_empty() {
                tracing::warn!("no nodes found");
            } else {
                println!("{}", render::nodes(&found));
            }
        }
        Command::Vms {
            action: VmsCommand::Deploy(args),
        } => {
            let profile = store.load()?;
            // Prompts need a person on both ends of the terminal.
            let interactive = !args.yes
                && args.deployment_file.is_none()
                && std::io::stdin().is_terminal()
                && std::io::stdout().is_terminal();

            let mut grid = ProxyGrid::new(profile.network().unwrap_or_default(), profile.twin())
                .map_err(GridCliError::from)?;
            let mut prompter = prompter_for(interactive);
            let deployment =
                vms::deploy(&args, &profile, &mut grid, prompter.as_mut(), &progress).await?;

            if deployment.machines.is_empty() {
                tracing::warn!(
                    "deployment {} submitted, but the grid reported no machines",
                    deployment.descriptor.name
                );
            } else {
                println!("{}", render::machines(&deployment.machines));
            }
        }
    }

    Ok(())
}

fn prompter_for(interactive: bool) -> Box<dyn Prompter> {
    if interactive {
        Box::new(InquirePrompter)
    } else {
        Box::new(DefaultsPrompter)
    }
}

/// Usage errors exit 1 like every other failure; help and version exit 0.
fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            // Nothing useful to do if the terminal is gone.
            let _ = e.print();
            std::process::exit(code);
        }
    }
}
