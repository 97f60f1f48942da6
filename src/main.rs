//! Rivet - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use rivet::cli::{Args, Commands, ConfigCommand, GapsCommand};
use rivet::config::RivetConfig;
use rivet::engine::RivetEngine;
use rivet::gaps::{GapLogger, GapStats, KBGapRecord, SqliteGapStore};
use rivet::research::ResearchStatus;
use rivet::router::Route;
use rivet::storage;
use rivet::types::{Channel, Request, RivetResponse};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.clone();
    let config = match config_path.clone() {
        Some(path) => RivetConfig::load_from(path)?,
        None => RivetConfig::load()?,
    };

    match args.command {
        Commands::Ask {
            question,
            user,
            trace,
        } => ask(config, question, user, trace).await,
        Commands::Gaps { command } => gaps(config, command).await,
        Commands::Research { query } => research(config, query).await,
        Commands::Config { command } => handle_config(config, config_path, command),
    }
}

/// One-shot question: route, answer, then wait for any background research.
async fn ask(config: RivetConfig, question: String, user: String, show_trace: bool) -> Result<()> {
    let pb = spinner("Routing your question...");
    let engine = RivetEngine::init(config).await?;
    let request = Request::new(user, question, Channel::Cli);
    let response = engine.handle(&request).await?;
    pb.finish_and_clear();

    print_response(&response, show_trace);

    if response.kb_enrichment_triggered || response.research_triggered {
        let pb = spinner("Background research running, waiting for it to finish...");
        engine.shutdown().await;
        pb.finish_and_clear();
        println!(
            "\n{}",
            "Background research finished; future answers to this question can cite what it found."
                .dimmed()
        );
    } else {
        engine.shutdown().await;
    }

    Ok(())
}

fn print_response(response: &RivetResponse, show_trace: bool) {
    println!("{}\n", route_banner(response.route_taken));
    println!("{}", response.text);

    if !response.suggested_actions.is_empty() && response.route_taken != Route::Clarify {
        println!("\n{}", "Suggested:".bold());
        for action in &response.suggested_actions {
            println!("  - {}", action);
        }
    }

    if !response.links.is_empty() {
        println!("\n{}", "See also:".bold());
        for link in &response.links {
            println!("  {}", link.underline());
        }
    }

    if show_trace {
        let t = &response.trace;
        println!("\n{}", "Trace:".bold().dimmed());
        println!(
            "{}",
            format!(
                "  route={} coverage={} agent={} docs={} intent_confidence={:.2}",
                t.route.display_name(),
                t.coverage.display_name(),
                t.agent.description(),
                t.docs_found,
                t.intent_confidence
            )
            .dimmed()
        );
        if let Some(branch) = t.priority_branch {
            println!("{}", format!("  priority_branch={:?}", branch).dimmed());
        }
        if let Some(gap_id) = &t.gap_id {
            println!("{}", format!("  gap_id={}", gap_id).dimmed());
        }
    }
}

fn route_banner(route: Route) -> colored::ColoredString {
    match route {
        Route::Direct => "[direct] answered from the knowledge base".green().bold(),
        Route::Enrich => "[enrich] answered now, thickening coverage in the background"
            .yellow()
            .bold(),
        Route::Research => "[research] nothing on file yet, researching in the background"
            .magenta()
            .bold(),
        Route::Clarify => "[clarify] more detail needed".cyan().bold(),
    }
}

/// Gap-log maintenance works straight against storage; no knowledge store
/// or forum access needed.
async fn gaps(config: RivetConfig, command: GapsCommand) -> Result<()> {
    let pool = storage::connect(&config.storage).await?;
    storage::migrate(&pool).await?;
    let logger = GapLogger::new(
        Arc::new(SqliteGapStore::new(pool)),
        config.gaps.dedup_window_days,
    );

    match command {
        GapsCommand::List { limit, all } => {
            let records = logger.top_gaps(limit, all).await?;
            if records.is_empty() {
                println!("{}", "No knowledge gaps recorded.".dimmed());
                return Ok(());
            }
            println!("{}", format!("{} gap(s):", records.len()).bold());
            for record in &records {
                print_gap(record);
            }
        }
        GapsCommand::Stats => {
            let stats = logger.stats().await?;
            print_stats(&stats);
        }
        GapsCommand::Resolve { gap_id, atom_ids } => {
            logger.mark_resolved(&gap_id, &atom_ids).await?;
            println!(
                "{} gap {} resolved by {} atom(s)",
                "ok:".green().bold(),
                gap_id,
                atom_ids.len()
            );
        }
    }

    Ok(())
}

fn print_gap(record: &KBGapRecord) {
    let status = if record.resolved {
        "resolved".green()
    } else {
        "open".yellow()
    };
    println!(
        "  {}  {}x  [{}]  {}",
        record.id.dimmed(),
        record.frequency,
        status,
        truncate(&record.query, 60)
    );
    println!(
        "{}",
        format!(
            "      vendor={} equipment={} last asked {}",
            record.intent_vendor,
            record.intent_equipment,
            format_ts(record.last_asked_at)
        )
        .dimmed()
    );
}

fn print_stats(stats: &GapStats) {
    println!("{}", "Knowledge gap statistics".bold());
    println!("  total:            {}", stats.total);
    println!("  resolved:         {}", stats.resolved);
    println!("  unresolved:       {}", stats.unresolved);
    println!("  resolution rate:  {:.0}%", stats.resolution_rate * 100.0);
    println!("  avg frequency:    {:.1}", stats.avg_frequency);
    match stats.avg_resolution_hours {
        Some(hours) => println!("  avg time to close: {:.1}h", hours),
        None => println!("  avg time to close: n/a"),
    }
}

/// Foreground research pass with a queue summary afterwards.
async fn research(config: RivetConfig, query: String) -> Result<()> {
    let engine = RivetEngine::init(config).await?;
    let pb = spinner("Searching community and vendor sources...");
    let result = engine.research_now(&query).await?;
    pb.finish_and_clear();

    match result.status {
        ResearchStatus::Done => {
            println!(
                "{} {} source(s) found, {} queued for ingestion",
                "done:".green().bold(),
                result.sources_found,
                result.sources_queued
            );
            let pending = engine.pending_sources(10).await?;
            if !pending.is_empty() {
                println!("\n{}", "Oldest pending sources:".bold());
                for source in &pending {
                    println!("  [{}] {}", source.source_type, source.url.underline());
                }
            }
            println!(
                "\nIngestion typically lands within {} minutes.",
                result.eta_minutes
            );
        }
        ResearchStatus::Failed => {
            let reason = result.error.unwrap_or_else(|| "unknown".to_string());
            println!("{} {}", "failed:".red().bold(), reason);
        }
    }

    engine.shutdown().await;
    Ok(())
}

fn handle_config(
    config: RivetConfig,
    config_path: Option<std::path::PathBuf>,
    command: ConfigCommand,
) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommand::Init => {
            let path = match config_path {
                Some(path) => path,
                None => RivetConfig::config_path()?,
            };
            if path.exists() {
                println!(
                    "{} {} already exists; delete it first to reinitialize",
                    "skip:".yellow().bold(),
                    path.display()
                );
            } else {
                RivetConfig::default().save_to(&path)?;
                println!("{} wrote {}", "ok:".green().bold(), path.display());
            }
        }
    }

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| format!("@{}", ts))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}
