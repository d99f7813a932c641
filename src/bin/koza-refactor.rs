//! CLI for migrating and documenting Koza transforms.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use koza_refactor::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "koza-refactor")]
#[command(author, version, about = "Analysis and migration of Koza transforms", long_about = None)]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a transform to the record-function API and print it
    Migrate {
        /// Transform script to migrate
        file: PathBuf,

        /// Print a unified diff instead of the rewritten source
        #[arg(long)]
        diff: bool,
    },

    /// Extract documented classes from a transform as JSON
    Document {
        /// Transform script to analyse
        file: PathBuf,

        /// Python interpreter with jedi installed
        #[arg(long)]
        python: Option<String>,

        /// Virtual environment, relative to the project root
        #[arg(long)]
        venv: Option<PathBuf>,
    },

    /// List every filename an ingest has used
    History {
        /// Path to the ingest repository
        repo: PathBuf,

        /// Ingest tag, e.g. "hgnc"
        tag: String,

        /// List files without following renames
        #[arg(long)]
        no_follow_renames: bool,

        /// Do not print the file list
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.config {
        Some(ref path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Migrate { file, diff } => cmd_migrate(&config, &file, diff),
        Commands::Document { file, python, venv } => cmd_document(config, &file, python, venv),
        Commands::History {
            repo,
            tag,
            no_follow_renames,
            quiet,
        } => cmd_history(&config, &repo, tag, !no_follow_renames, quiet),
    }
}

fn init_tracing(verbose: bool) {
    let directive = if verbose {
        "koza_refactor=debug"
    } else {
        "koza_refactor=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_migrate(config: &Config, file: &Path, diff: bool) -> Result<()> {
    let migration = KozaMigration::new(config.migration.clone());

    if diff {
        let change = koza_refactor::transform::FileChange::compute(&migration, file)
            .with_context(|| format!("Migration of {} failed", file.display()))?;
        print!("{}", change.diff());
        let summary = change.summary();
        if !summary.is_empty() {
            println!("\n{}", summary);
        }
        return Ok(());
    }

    let migrated = migration
        .migrate_file(file)
        .with_context(|| format!("Migration of {} failed", file.display()))?;
    println!("{}", migrated);
    Ok(())
}

fn cmd_document(
    mut config: Config,
    file: &Path,
    python: Option<String>,
    venv: Option<PathBuf>,
) -> Result<()> {
    if let Some(python) = python {
        config.oracle.python = python;
    }
    if venv.is_some() {
        config.oracle.environment = venv;
    }

    let classes = extract_documentation(file, &config)
        .with_context(|| format!("Documentation extraction from {} failed", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&classes)?);
    Ok(())
}

fn cmd_history(config: &Config, repo: &Path, tag: String, follow_renames: bool, quiet: bool) -> Result<()> {
    let service = HistoryService::open(repo)
        .context("Failed to open ingest repository")?
        .with_rename_similarity(config.history.rename_similarity);

    HistoryQuery::new(tag)
        .follow_renames(follow_renames)
        .quiet(quiet)
        .execute(&service, &config.history, &mut std::io::stdout().lock())
        .context("History query failed")?;
    Ok(())
}
