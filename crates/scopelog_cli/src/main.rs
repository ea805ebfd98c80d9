//! scopelog CLI
//!
//! Command-line tools for inspecting and driving backup scopes.
//!
//! # Commands
//!
//! - `inspect` - Display cursors and segment statistics of a scope
//! - `dump` - Walk the frames of one segment file
//! - `append` - Append records to a scope
//! - `drain` - Consume records from a scope

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// scopelog command-line tools.
#[derive(Parser)]
#[command(name = "scopelog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Parent directory holding the scope directories
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display cursors and segment statistics
    Inspect {
        /// Scope identifier
        #[arg(short, long)]
        scope: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Walk the frames of one segment without consuming them
    Dump {
        /// Scope identifier
        #[arg(short, long)]
        scope: String,

        /// Segment index
        #[arg(long, default_value = "0")]
        segment: u64,

        /// Maximum number of frames to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Append records (arguments, or stdin lines when none are given)
    Append {
        /// Scope identifier
        #[arg(short, long)]
        scope: String,

        /// Capacity of newly created segment files
        #[arg(long)]
        max_segment_bytes: Option<u64>,

        /// Records to append
        records: Vec<String>,
    },

    /// Consume records and print them
    Drain {
        /// Scope identifier
        #[arg(short, long)]
        scope: String,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Keep polling for new records
        #[arg(long)]
        follow: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { scope, format } => {
            let path = cli.path.ok_or("Scope parent path required for inspect")?;
            commands::inspect::run(&path, &scope, &format)?;
        }
        Commands::Dump {
            scope,
            segment,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Scope parent path required for dump")?;
            commands::dump::run(&path, &scope, segment, limit, &format)?;
        }
        Commands::Append {
            scope,
            max_segment_bytes,
            records,
        } => {
            let path = cli.path.ok_or("Scope parent path required for append")?;
            commands::append::run(&path, &scope, max_segment_bytes, &records)?;
        }
        Commands::Drain {
            scope,
            limit,
            follow,
        } => {
            let path = cli.path.ok_or("Scope parent path required for drain")?;
            commands::drain::run(&path, &scope, limit, follow)?;
        }
        Commands::Version => {
            println!("scopelog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("scopelog Core v{}", scopelog_core::VERSION);
        }
    }

    Ok(())
}
