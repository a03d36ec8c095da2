//! mediavault command-line interface.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use mediavault::Archive;
use mediavault::config::ArchiveConfig;

#[derive(Parser, Debug)]
#[command(name = "mediavault")]
#[command(version, about = "Deduplicating, content-addressed media archive")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Catalog entries without copying any bytes into the archive
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Skip files whose path, mtime and size are already archived, without
    /// hashing them. Misses edits that keep all three.
    #[arg(long, global = true)]
    relaxed: bool,

    /// Config file (default: <root>/mediavault.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Archive root directory
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add files, directories (recursively) or glob patterns
    Add {
        /// Tag every added file (repeatable)
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,

        /// Files, directories or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// List entries, newest first
    List {
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Show an entry with its attributes and log
    Show {
        /// Entry id
        entry_id: i64,
    },
    /// Serve archived objects over HTTP
    Serve {
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show archive statistics and layout
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let archive = Archive::open(&cli.root, config)
        .with_context(|| format!("Failed to open archive at {}", cli.root.display()))?;

    match cli.command {
        Commands::Add { tags, paths } => commands::add::execute(&archive, &tags, &paths).await,
        Commands::List { json } => commands::list::execute(&archive, json),
        Commands::Show { entry_id } => commands::show::execute(&archive, entry_id),
        Commands::Serve { .. } => commands::serve::execute(&archive).await,
        Commands::Info => commands::info::execute(&archive),
    }
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<ArchiveConfig> {
    let mut config = match &cli.config {
        Some(path) => ArchiveConfig::load_from(path)?,
        None => ArchiveConfig::load_for_root(&cli.root)?,
    };

    if cli.dry_run {
        config.ingest.dry_run = true;
    }
    if cli.relaxed {
        config.ingest.relaxed = true;
    }
    if let Commands::Serve { port, bind } = &cli.command {
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(bind) = bind {
            config.server.bind.clone_from(bind);
        }
    }

    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }
    Ok(config)
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
