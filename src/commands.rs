//! Subcommand implementations for the `palimpsest` binary.
//!
//! Each handler loads a change log (picking the encoding by file
//! extension), runs one core operation, and prints text or JSON. All
//! failures come back as `anyhow` errors with enough context to act on;
//! structural log errors abort with a nonzero exit.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde_json::json;

use palimpsest::config::{CONFIG_FILE, PalimpsestConfig};
use palimpsest::import::import_xml_file;
use palimpsest::log::Scroll;
use palimpsest::log::read::load_scroll;
use palimpsest::log::write::write_scroll;
use palimpsest::log::xml::load_scroll_xml;
use palimpsest::model::{ChangeId, ChangeRecord};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Output format for listing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// One JSON document on stdout.
    Json,
}

/// Load a change log, picking the encoding by extension (`.xml` means the
/// structural encoding; anything else, the delimited one).
fn load_any(path: &Path) -> Result<Scroll> {
    let is_xml = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
    let scroll = if is_xml {
        load_scroll_xml(path).with_context(|| format!("loading '{}'", path.display()))?
    } else {
        load_scroll(path).with_context(|| format!("loading '{}'", path.display()))?
    };
    Ok(scroll)
}

fn parse_id(s: &str) -> Result<ChangeId> {
    ChangeId::new(s).with_context(|| format!("'{s}' is not a valid change id"))
}

fn format_time(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map_or_else(|| secs.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn record_json(record: &ChangeRecord) -> serde_json::Value {
    json!({
        "id": record.id().as_str(),
        "parent": record.parent().as_str(),
        "author": record.author(),
        "timestamp": record.timestamp(),
        "target": record.target(),
        "source": record.source(),
    })
}

// ---------------------------------------------------------------------------
// tips
// ---------------------------------------------------------------------------

/// List tip versions (branch heads).
pub fn tips(log: &Path, format: OutputFormat) -> Result<()> {
    let scroll = load_any(log)?;
    match format {
        OutputFormat::Text => {
            for tip in scroll.tips() {
                // Tips always name stored records; the lookup cannot miss.
                if let Some(record) = scroll.get(tip) {
                    println!(
                        "{}  (based on {}, {} by {})",
                        tip,
                        record.parent(),
                        format_time(record.timestamp()),
                        record.author()
                    );
                }
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = scroll
                .tips()
                .iter()
                .filter_map(|tip| scroll.get(tip).map(record_json))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "tips": entries }))?);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

/// Reconstruct and print one version.
pub fn show(log: &Path, change_id: &str) -> Result<()> {
    let scroll = load_any(log)?;
    let id = parse_id(change_id)?;
    let doc = scroll
        .reconstruct_document(&id)
        .with_context(|| format!("reconstructing '{change_id}'"))?;
    println!("{doc}");
    Ok(())
}

// ---------------------------------------------------------------------------
// log
// ---------------------------------------------------------------------------

/// Print the ancestry chain of a change, oldest first.
pub fn log(log: &Path, change_id: &str, format: OutputFormat) -> Result<()> {
    let scroll = load_any(log)?;
    let id = parse_id(change_id)?;
    let path = scroll
        .path_to_change(&id)
        .with_context(|| format!("tracing '{change_id}'"))?;
    match format {
        OutputFormat::Text => {
            for record in path {
                println!(
                    "{}  {}  {}  {}",
                    record.id(),
                    format_time(record.timestamp()),
                    record.author(),
                    record.target()
                );
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = path.iter().map(|r| record_json(r)).collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "chain": entries }))?);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

/// Verify internal consistency: the incrementally maintained tip set must
/// equal the full recompute.
pub fn check(log: &Path) -> Result<()> {
    let scroll = load_any(log)?;
    let recomputed = scroll.find_all_tip_versions();
    if &recomputed != scroll.tips() {
        bail!(
            "tip sets disagree: maintained {:?} vs recomputed {:?}",
            scroll.tips(),
            recomputed
        );
    }
    println!(
        "ok: {} records, {} tips, {} metadata fields",
        scroll.len(),
        scroll.tips().len(),
        scroll.meta().len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

/// Convert an XML document into a fresh change log.
pub fn import(input: &Path, output: &Path, author: Option<&str>) -> Result<()> {
    let config = PalimpsestConfig::load(Path::new(CONFIG_FILE))?;
    let author = author.unwrap_or(&config.author.name);
    let now = chrono::Utc::now().timestamp();

    let scroll = import_xml_file(input, author, config.author.subseq, now)
        .with_context(|| format!("importing '{}'", input.display()))?;
    write_scroll(&scroll, output)
        .with_context(|| format!("writing '{}'", output.display()))?;

    println!(
        "imported {} changes from '{}' into '{}'",
        scroll.len(),
        input.display(),
        output.display()
    );
    Ok(())
}
