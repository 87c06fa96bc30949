use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Append-only change-log version space for text documents
///
/// A document is stored as a log of edits, one record per change. Each
/// change names the version it is based on, so history forms a tree:
/// forks are cheap, and every branch head is a "tip". Any version is
/// reconstructed on demand by replaying the chain of edits that led to it.
///
/// QUICK START:
///
///   # List the heads of a change log
///   palimpsest tips doc.scroll
///
///   # Reconstruct the document as of a change
///   palimpsest show doc.scroll sjd_3
///
///   # Seed a change log from an existing XML document
///   palimpsest import book.xml --output book.scroll
///
/// Logs in the delimited encoding use one record per line; files ending
/// in .xml are read in the structural encoding. Diagnostics go to stderr,
/// controlled by PALIMPSEST_LOG (e.g. PALIMPSEST_LOG=debug).
#[derive(Parser)]
#[command(name = "palimpsest")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'palimpsest <command> --help' for more information on a specific command.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tip versions (branch heads) of a change log
    Tips {
        /// Path to the change log
        log: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: commands::OutputFormat,
    },

    /// Reconstruct and print the document as of a change
    Show {
        /// Path to the change log
        log: PathBuf,

        /// The change id to reconstruct
        change_id: String,
    },

    /// Print the ancestry chain of a change, oldest first
    Log {
        /// Path to the change log
        log: PathBuf,

        /// The change id to trace
        change_id: String,

        /// Output format
        #[arg(long, default_value = "text")]
        format: commands::OutputFormat,
    },

    /// Verify a change log's internal consistency
    ///
    /// Recomputes the tip set from scratch and compares it against the
    /// incrementally maintained one, then reports record and metadata
    /// counts.
    Check {
        /// Path to the change log
        log: PathBuf,
    },

    /// Convert an XML document into a change log
    ///
    /// Emits one append per structural token (tags, text runs), forming a
    /// linear chain that replays back to the document text. The authoring
    /// identity comes from .palimpsest.toml unless overridden.
    Import {
        /// Path to the XML document to convert
        input: PathBuf,

        /// Where to write the generated change log
        #[arg(long, short)]
        output: PathBuf,

        /// Author to stamp on generated changes (overrides config)
        #[arg(long)]
        author: Option<String>,
    },
}

fn main() -> Result<()> {
    palimpsest::telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tips { log, format } => commands::tips(&log, format),
        Commands::Show { log, change_id } => commands::show(&log, &change_id),
        Commands::Log {
            log,
            change_id,
            format,
        } => commands::log(&log, &change_id, format),
        Commands::Check { log } => commands::check(&log),
        Commands::Import {
            input,
            output,
            author,
        } => commands::import(&input, &output, author.as_deref()),
    }
}
