//! Arbor CLI - arbor command

use anyhow::Result;
use arbor_core::RevisionNumber;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

/// Arbor - versioned node store
#[derive(Parser)]
#[command(name = "arbor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository root (default: search upward for .arbor/)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// User recorded for the session
    #[arg(long, global = true, default_value = "operator")]
    user: String,

    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a repository and write the root node
    Init {
        /// Directory to initialize (default: current directory)
        path: Option<PathBuf>,
        /// Type of the root node (namespace:name:version)
        #[arg(long)]
        root_type: Option<String>,
    },
    /// Show revision, pending journal sets and storage size
    Status,
    /// Create a node and commit it
    Create {
        /// Path of the new node
        path: String,
        /// Node type (namespace:name:version)
        #[arg(short = 't', long = "type")]
        node_type: String,
        /// Properties as key=value
        properties: Vec<String>,
    },
    /// Replace a node's properties and commit
    Update {
        /// Node path
        path: String,
        /// New node type
        #[arg(short = 't', long = "type")]
        node_type: Option<String>,
        /// Keep existing properties not named on the command line
        #[arg(long)]
        merge: bool,
        /// Remove a property (with --merge)
        #[arg(long = "unset", value_name = "KEY")]
        unset: Vec<String>,
        /// Properties as key=value
        properties: Vec<String>,
    },
    /// Delete a node and its subtree, then commit
    Delete {
        /// Node path
        path: String,
    },
    /// Show a node
    Show {
        /// Node path
        path: String,
        /// Read at an earlier revision (hex)
        #[arg(short, long)]
        revision: Option<RevisionNumber>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// List children of a node
    Ls {
        /// Node path
        #[arg(default_value = "/")]
        path: String,
        /// Read at an earlier revision (hex)
        #[arg(short, long)]
        revision: Option<RevisionNumber>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// List nodes referring to a node
    Refs {
        /// Node path
        path: String,
    },
    /// Apply journal sets left behind by an interrupted commit
    Recover,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let repo = cli.repo.as_deref();
    let user = cli.user.as_str();

    match cli.command {
        Commands::Init { path, root_type } => cmd::init::run(path, root_type).await,
        Commands::Status => cmd::status::run(repo).await,
        Commands::Create { path, node_type, properties } => {
            cmd::create::run(repo, user, &path, &node_type, &properties).await
        }
        Commands::Update { path, node_type, merge, unset, properties } => {
            cmd::update::run(repo, user, &path, node_type.as_deref(), merge, &unset, &properties).await
        }
        Commands::Delete { path } => cmd::delete::run(repo, user, &path).await,
        Commands::Show { path, revision, json } => {
            cmd::show::run(repo, user, &path, revision, json).await
        }
        Commands::Ls { path, revision, json } => {
            cmd::ls::run(repo, user, &path, revision, json).await
        }
        Commands::Refs { path } => cmd::refs::run(repo, user, &path).await,
        Commands::Recover => cmd::recover::run(repo).await,
    }
}
