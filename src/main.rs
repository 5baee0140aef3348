mod db;
mod error;
mod extract;
mod fetch;
mod parser;
mod settings;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use extract::{RunContext, RunSummary};
use fetch::HttpFetcher;
use settings::Settings;

#[derive(Parser)]
#[command(name = "series_scraper", about = "Cricket series and match listing extractor")]
struct Cli {
    /// Print run summaries as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Extract series from the schedule listing
    Groups,
    /// Extract matches for one stored series
    Events {
        /// Series id as stored
        group_id: i64,
        /// Read a saved series page instead of fetching it
        #[arg(long, value_name = "PATH")]
        from_file: Option<PathBuf>,
    },
    /// Extract matches for every stored series, one at a time
    EventsAll,
    /// List stored series in calendar order
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show the matches stored for one series
    Show {
        group_id: i64,
    },
    /// Show counts
    Stats,
    /// Delete all matches (and with --all, all series too)
    Clear {
        #[arg(long)]
        all: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    let fetcher = HttpFetcher::new(&settings);
    let ctx = RunContext::new(&fetcher, &conn, &settings).context("Invalid site_origin")?;

    match cli.command {
        Commands::Init => {
            println!("Schema ready at {}", settings.db_path);
        }
        Commands::Groups => {
            let summary = RunSummary::from_result(extract::extract_groups(&ctx), "series");
            report(cli.json, &summary, &summary.message)?;
        }
        Commands::Events {
            group_id,
            from_file,
        } => {
            let result = match from_file {
                Some(path) => {
                    let html = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let source = path.display().to_string();
                    extract::extract_events_from_markup(&ctx, group_id, &source, &html)
                }
                None => extract::extract_events(&ctx, group_id),
            };
            let summary = RunSummary::from_result(result, "matches");
            report(cli.json, &summary, &summary.message)?;
        }
        Commands::EventsAll => {
            let summary = extract::extract_all_events(&ctx)?;
            report(cli.json, &summary, &summary.message())?;
        }
        Commands::List { limit } => {
            let rows = db::list_groups(&conn, limit)?;
            if rows.is_empty() {
                println!("No series stored. Run 'groups' first.");
                return Ok(());
            }
            println!(
                "{:>5} | {:<10} | {:<4} | {:<40} | {:<18}",
                "id", "Month", "Year", "Series", "Dates"
            );
            println!("{}", "-".repeat(88));
            for r in &rows {
                println!(
                    "{:>5} | {:<10} | {:<4} | {:<40} | {:<18}",
                    r.id,
                    r.period,
                    r.year,
                    truncate(&r.name, 40),
                    r.date_range.as_deref().unwrap_or("-")
                );
            }
            println!("\n{} series", rows.len());
        }
        Commands::Show { group_id } => {
            use db::Store;
            let Some(group) = conn.group(group_id)? else {
                println!("Series {} not found.", group_id);
                return Ok(());
            };
            println!("{} ({} {})", group.name, group.period, group.year);
            println!("{}\n", group.url);
            let events = db::list_events(&conn, group_id)?;
            if events.is_empty() {
                println!("No matches stored. Run 'events {}' first.", group_id);
                return Ok(());
            }
            for e in &events {
                println!(
                    "{:>8} | {:<12} | {:<40} | {}",
                    e.source_id,
                    e.event_date.as_deref().unwrap_or("-"),
                    truncate(&e.title, 40),
                    e.url
                );
            }
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Series:        {}", s.groups);
            println!("Matches:       {}", s.events);
            println!("Empty series:  {}", s.empty_groups);
            let counts = db::group_counts(&conn, 50)?;
            if !counts.is_empty() {
                println!("\n--- Recent series ---");
                for c in &counts {
                    println!(
                        "{:>5}  {:<40} {:<4} {:>4}",
                        c.id,
                        truncate(&c.name, 40),
                        c.year,
                        c.events
                    );
                }
            }
        }
        Commands::Clear { all } => {
            if all {
                let n = db::clear_groups(&conn)?;
                println!("Cleared {} series and their matches.", n);
            } else {
                let n = db::clear_events(&conn)?;
                println!("Cleared {} matches.", n);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn report<T: Serialize>(json: bool, summary: &T, message: &str) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", message);
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
