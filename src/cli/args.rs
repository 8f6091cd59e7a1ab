use std::path::PathBuf;

use clap::{Parser, Subcommand};

use geoengineer::gps::Context;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Declarations file
    #[arg(long, short, env = "GEO_FILE", default_value = "geo.json", global = true)]
    pub file: PathBuf,

    #[command(flatten)]
    pub context: ContextArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Defaults for empty reference segments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ContextArgs {
    #[arg(long, env = "GEO_PROJECT", global = true)]
    pub project: Option<String>,

    #[arg(long, env = "GEO_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    #[arg(long, env = "GEO_CONFIGURATION", global = true)]
    pub configuration: Option<String>,

    #[arg(long, env = "GEO_NODE_NAME", global = true)]
    pub node_name: Option<String>,
}

impl ContextArgs {
    pub fn to_context(&self) -> Context {
        Context {
            project: self.project.clone(),
            environment: self.environment.clone(),
            configuration: self.configuration.clone(),
            node_name: self.node_name.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every node matching a pattern
    Where { pattern: String },
    /// Show the single node matching a pattern
    Find { pattern: String },
    /// Resolve a `...#resource[.attribute]` reference
    Deref { reference: String },
    /// Run every validation rule and report all failures
    Validate,
    /// Emit Terraform JSON, or state with --state
    Generate(GenerateArgs),
    /// Emit import blocks for resources that already exist remotely
    Import(RemoteArgs),
    /// Fetch remote inventory for all declared types and write the snapshot
    Fetch(RemoteArgs),
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    #[arg(long)]
    pub state: bool,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RemoteArgs {
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    pub zone: Option<String>,

    /// Inventory snapshot path (defaults to the user cache directory)
    #[arg(long, env = "GEO_INVENTORY")]
    pub inventory: Option<PathBuf>,

    /// Ignore the snapshot and fetch again
    #[arg(long)]
    pub refresh: bool,
}
