//! Taxon CLI: inspect and maintain a taxonomy store.
//!
//! Usage:
//!   taxon [--data-dir path] [--config file] stats
//!   taxon parents <concept> | children <concept>
//!   taxon ever-kind-of <child> <parent>
//!   taxon verify | rebuild-index

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use taxon::config::default_data_dir;
use taxon::{Sequence, SequenceIdentifiers, StampTable, TaxonomyConfig, TaxonomyService};
use tracing::Level;

#[derive(Parser)]
#[command(name = "taxon", version, about = "Versioned taxonomy store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Store directory (defaults to the configured or platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// YAML or JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show record, triple and reverse index counts
    Stats,
    /// List every is-a parent ever recorded for a concept
    Parents {
        concept: Sequence,
    },
    /// List every is-a child ever recorded for a concept
    Children {
        concept: Sequence,
    },
    /// Check whether any history makes CHILD a kind of PARENT
    EverKindOf {
        child: Sequence,
        parent: Sequence,
    },
    /// Compare the reverse index against the forward store
    Verify,
    /// Rebuild the reverse index from the forward store and save it
    RebuildIndex,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<TaxonomyConfig, String> {
    let mut config = match &cli.config {
        Some(path) => TaxonomyConfig::load(path).map_err(|e| e.to_string())?,
        None => TaxonomyConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if config.data_dir.is_none() {
        config.data_dir = Some(default_data_dir());
    }
    Ok(config)
}

fn open_service(cli: &Cli) -> Result<Arc<TaxonomyService>, String> {
    let config = load_config(cli)?;
    TaxonomyService::open(
        config,
        Arc::new(StampTable::new()),
        Arc::new(SequenceIdentifiers::default()),
    )
    .map_err(|e| format!("Failed to open taxonomy store: {}", e))
}

fn print_sequences(sequences: &[Sequence]) {
    if sequences.is_empty() {
        println!("(none)");
        return;
    }
    for sequence in sequences {
        println!("{}", sequence);
    }
}

fn cmd_stats(service: &TaxonomyService) -> Result<i32, String> {
    let stats = service.stats().map_err(|e| e.to_string())?;
    println!("{:<16} {:>12}", "origins", stats.origins);
    println!("{:<16} {:>12}", "type stamps", stats.type_stamps);
    println!("{:<16} {:>12}", "reverse pairs", stats.reverse_pairs);
    println!("{:<16} {:>12}", "recovered", stats.recovered);
    Ok(0)
}

fn cmd_verify(service: &TaxonomyService) -> Result<i32, String> {
    let report = service.verify_reverse_index().map_err(|e| e.to_string())?;
    if report.is_consistent() {
        println!("Reverse index is consistent");
        return Ok(0);
    }
    println!(
        "Reverse index drift: {} missing, {} orphaned",
        report.missing.len(),
        report.orphans.len()
    );
    for pair in &report.missing {
        println!("  missing  {} <- {}", pair.destination, pair.origin);
    }
    for pair in &report.orphans {
        println!("  orphan   {} <- {}", pair.destination, pair.origin);
    }
    Ok(1)
}

fn cmd_rebuild(service: &TaxonomyService) -> Result<i32, String> {
    let pairs = service.rebuild_reverse_index().map_err(|e| e.to_string())?;
    service.stop().map_err(|e| format!("Failed to save store: {}", e))?;
    println!("Rebuilt reverse index with {} pairs", pairs);
    Ok(0)
}

fn run(cli: &Cli) -> Result<i32, String> {
    let service = open_service(cli)?;
    match &cli.command {
        Commands::Stats => cmd_stats(&service),
        Commands::Parents { concept } => {
            let parents = service
                .taxonomy_parent_sequences(*concept)
                .map_err(|e| e.to_string())?;
            print_sequences(&parents);
            Ok(0)
        }
        Commands::Children { concept } => {
            let children = service
                .taxonomy_child_sequences(*concept)
                .map_err(|e| e.to_string())?;
            print_sequences(&children);
            Ok(0)
        }
        Commands::EverKindOf { child, parent } => {
            let kind_of = service
                .was_ever_kind_of(*child, *parent)
                .map_err(|e| e.to_string())?;
            println!("{}", kind_of);
            Ok(if kind_of { 0 } else { 1 })
        }
        Commands::Verify => cmd_verify(&service),
        Commands::RebuildIndex => cmd_rebuild(&service),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    std::process::exit(code);
}
