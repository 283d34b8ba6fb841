//! NWP catalog inspector.
//!
//! Lists and describes the named sources of a YAML catalog without
//! contacting any archive.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use nwp_common::{format_cycle, round_time};
use nwp_source::{Catalog, CatalogEntry};

#[derive(Parser, Debug)]
#[command(name = "nwp-catalog")]
#[command(about = "Inspect NWP source catalogs")]
struct Args {
    /// Catalog file path
    #[arg(short, long, env = "NWP_CATALOG", default_value = "catalog.yaml")]
    catalog: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs and output
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List catalog entries
    List,
    /// Show the parsed definition of an entry
    Describe { name: String },
    /// Show the lead times an entry requests
    LeadTimes { name: String },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog))?;

    match &args.command {
        Command::List => list(&catalog, args.json),
        Command::Describe { name } => describe(entry(&catalog, name)?, args.json),
        Command::LeadTimes { name } => lead_times(entry(&catalog, name)?, args.json),
    }
}

fn entry<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a CatalogEntry> {
    catalog
        .entry(name)
        .with_context(|| format!("Unknown source '{}'", name))
}

fn list(catalog: &Catalog, as_json: bool) -> Result<()> {
    if as_json {
        let entries: Vec<_> = catalog
            .entries()
            .map(|e| json!({ "name": e.name, "driver": e.driver(), "description": e.description }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for e in catalog.entries() {
        println!("{:<24} {:<10} {}", e.name, e.driver(), e.description);
    }
    Ok(())
}

fn describe(entry: &CatalogEntry, as_json: bool) -> Result<()> {
    let definition = &entry.definition;
    let lead_times = definition
        .lead_times()
        .with_context(|| format!("Invalid lead times for '{}'", entry.name))?;

    // Without a pinned cycle, show where latest-cycle lookup would start.
    let cycle = match definition.explicit_cycle() {
        Some(cycle) => format_cycle(&cycle),
        None => {
            let step = i64::from(definition.cycle_step());
            let candidate = round_time(Utc::now(), step).context("Invalid cycle_step")?;
            debug!(step, "No explicit cycle, using latest candidate");
            format!("latest (first candidate {})", format_cycle(&candidate))
        }
    };

    if as_json {
        let out = json!({
            "name": entry.name,
            "driver": entry.driver(),
            "description": entry.description,
            "cycle": cycle,
            "lead_times": lead_times.hours(),
            "args": definition,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("name:        {}", entry.name);
    println!("driver:      {}", entry.driver());
    if !entry.description.is_empty() {
        println!("description: {}", entry.description);
    }
    println!("cycle:       {}", cycle);
    println!("lead times:  {}", lead_times);
    println!("---");
    print!("{}", serde_yaml::to_string(definition)?);
    Ok(())
}

fn lead_times(entry: &CatalogEntry, as_json: bool) -> Result<()> {
    let lead_times = entry
        .definition
        .lead_times()
        .with_context(|| format!("Invalid lead times for '{}'", entry.name))?;

    if as_json {
        println!("{}", serde_json::to_string(lead_times.hours())?);
    } else {
        for hour in lead_times.iter() {
            println!("f{:03}", hour);
        }
    }
    Ok(())
}
