mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, RemoteArgs};
use geoengineer::definitions::Registry;
use geoengineer::providers::{self, Provider, ProviderConfig};
use geoengineer::{GeoError, Generation, RemoteInventory, output};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let remote = match &cli.command {
        Command::Generate(args) => Some(&args.remote),
        Command::Import(args) | Command::Fetch(args) => Some(args),
        _ => None,
    };
    let cloudflare: Option<Arc<dyn Provider>> = remote
        .map(|args| {
            providers::get_provider(
                "cloudflare",
                ProviderConfig {
                    token: args.token.clone(),
                    zone: args.zone.clone(),
                },
            )
        })
        .transpose()?
        .map(Arc::from);

    let mut registry = Registry::builtin(cloudflare);
    let generation = Generation::load(&cli.file, &mut registry, cli.context.to_context())?;

    match cli.command {
        Command::Where { pattern } => {
            let nodes = generation.finder().find_all(&pattern)?;
            tracing::info!(pattern = %pattern, count = nodes.len(), "nodes matched");
            println!("{}", output::node_table(nodes));
        }
        Command::Find { pattern } => {
            let node = generation.finder().find(&pattern)?;
            println!("{}", output::node_tree(node));
        }
        Command::Deref { reference } => {
            for value in generation.finder().dereference(&reference)? {
                println!("{}", value);
            }
        }
        Command::Validate => {
            let errors = generation.validate();
            println!("{}", output::validation_report(&errors));
            if !errors.is_empty() {
                return Err(eyre!("validation failed"));
            }
        }
        Command::Generate(args) => {
            let json = if args.state {
                let inventory = open_inventory(&args.remote)?;
                let state = generation.to_terraform_state(&inventory).await?;
                serde_json::to_string_pretty(&state)?
            } else {
                serde_json::to_string_pretty(&generation.to_terraform_json()?)?
            };
            println!("{}", json);
        }
        Command::Import(args) => {
            let inventory = open_inventory(&args)?;
            let blocks = generation.import_blocks(&inventory).await?;
            tracing::info!(count = blocks.len(), "import blocks generated");
            println!("{}", blocks.join("\n\n"));
        }
        Command::Fetch(args) => {
            let path = inventory_path(&args)?;
            let inventory = Arc::new(open_inventory(&args)?);
            let outcomes = generation.prefetch(Arc::clone(&inventory)).await;

            let mut failed = 0;
            for (resource_type, outcome) in &outcomes {
                match outcome {
                    Ok(count) => println!("{}: {} remote resource(s)", resource_type, count),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {}", resource_type, e);
                    }
                }
            }

            inventory.save(&path)?;
            tracing::info!(path = %path.display(), "inventory snapshot written");

            if failed > 0 {
                return Err(eyre!(
                    "{} of {} resource type(s) failed to fetch",
                    failed,
                    outcomes.len()
                ));
            }
        }
    }

    Ok(())
}

fn inventory_path(args: &RemoteArgs) -> Result<PathBuf, GeoError> {
    args.inventory
        .clone()
        .or_else(RemoteInventory::default_path)
        .ok_or_else(|| {
            GeoError::Config(
                "No inventory path. Set GEO_INVENTORY or use --inventory flag".to_string(),
            )
        })
}

// NOTE: A missing snapshot is not an error; types are fetched on demand.
fn open_inventory(args: &RemoteArgs) -> Result<RemoteInventory, GeoError> {
    if args.refresh {
        return Ok(RemoteInventory::new());
    }
    let path = inventory_path(args)?;
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no inventory snapshot");
        return Ok(RemoteInventory::new());
    }
    Ok(RemoteInventory::load(&path)?)
}
