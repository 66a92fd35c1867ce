use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use date_calendar_online_sync as lib;
use lib::calendar;
use lib::config::Config;
use lib::ingest::ImageSource;
use lib::models::{EventKind, PlanEvent};
use lib::planner::Planner;
use lib::store::firebase::FirebaseStore;
use lib::store::EventStore;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "date-calendar-online-sync", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the remote collection and print the calendar live (long-running)
    Watch,
    /// Print one month of the calendar with its plans
    List {
        /// Month to show as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Show one plan in full
    Show { id: String },
    /// Add a new plan
    Add {
        #[arg(long)]
        title: String,
        /// Activity kind: food, movie, travel (other values are kept as-is)
        #[arg(long, default_value = "food")]
        kind: String,
        /// Plan date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Image files to compress and attach
        #[arg(long = "image", value_name = "FILE")]
        images: Vec<PathBuf>,
    },
    /// Edit fields of an existing plan
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a plan (asks for confirmation unless --yes)
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    /// Compress and append images to an existing plan
    AddImages {
        id: String,
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove one image from a plan by position (0-based)
    RemoveImage { id: String, index: usize },
    /// Validate config file and exit
    ConfigValidate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Resolve config path: explicit --config overrides; otherwise prefer the
    // user config dir and fall back to the repository example config for
    // local/dev usage.
    let resolved_config_path: PathBuf = match &cli.config {
        Some(p) => p.clone(),
        None => {
            let user_path = dirs::config_dir()
                .map(|d| d.join("date-calendar-sync").join("config.toml"));
            match user_path {
                Some(p) if p.exists() => p,
                _ => PathBuf::from("config/example-config.toml"),
            }
        }
    };

    let cfg = Config::from_path(&resolved_config_path)
        .with_context(|| format!("loading config from {}", resolved_config_path.display()))?;

    // Initialize log->tracing bridge and structured logging.
    // Logs go to both stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "date-calendar-sync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    if let Commands::ConfigValidate = cli.command {
        // Config already parsed above; reaching this point means it is valid.
        println!("OK");
        return Ok(());
    }

    let store: Arc<dyn EventStore> =
        Arc::new(FirebaseStore::from_config(&cfg).context("building store")?);
    let mut planner = Planner::new(
        store,
        cfg.ingest_limits(),
        Duration::from_millis(cfg.reconnect_backoff_ms),
    );

    match cli.command {
        Commands::Watch => {
            planner.start();
            let mut rx = planner.sync().watch_state();
            println!("Watching {} (Ctrl-C to stop)...", cfg.collection);
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = rx.borrow().clone();
                        if state.loading {
                            continue;
                        }
                        let marker = if state.online { "online" } else { "OFFLINE (showing last known data)" };
                        println!("[{}] {} plans", marker, state.events.len());
                        for ev in &state.events {
                            print_event_line(ev);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        break;
                    }
                }
            }
            planner.close();
        }
        Commands::List { month } => {
            let (year, month) = match month {
                Some(m) => parse_year_month(&m)?,
                None => {
                    let today = chrono::Utc::now().date_naive();
                    (today.year(), today.month())
                }
            };
            planner.start();
            wait_for_first_snapshot(&planner).await?;
            let events = planner.events();
            let grid = calendar::month_grid(year, month)
                .with_context(|| format!("invalid month {}-{}", year, month))?;
            println!(
                "{}-{:02}: {} days, starts on weekday column {}",
                grid.year, grid.month, grid.days, grid.leading_blanks
            );
            for ev in calendar::events_in_month(&events, year, month) {
                print_event_line(ev);
            }
            planner.close();
        }
        Commands::Show { id } => {
            planner.start();
            wait_for_first_snapshot(&planner).await?;
            planner.open_detail(&id)?;
            if let Some(ev) = planner.detail() {
                println!("{}  {}  [{}]", ev.id, ev.date, ev.kind.label());
                println!("  {}", ev.title);
                if !ev.description.is_empty() {
                    println!("  {}", ev.description);
                }
                println!("  {} image(s)", ev.images.len());
            }
            planner.close();
        }
        Commands::Add { title, kind, date, description, images } => {
            {
                let draft = planner.draft_mut();
                draft.title = title;
                draft.kind = EventKind::parse(&kind);
                draft.date = date;
                draft.description = description;
            }
            if !images.is_empty() {
                let sources = load_sources(&images)?;
                let report = planner.attach_images(sources).await?;
                print_batch_report(report.appended, &report.skipped);
            }
            let id = planner.save_draft().await?;
            println!("created {}", id);
        }
        Commands::Edit { id, title, kind, date, description } => {
            planner.start();
            wait_for_first_snapshot(&planner).await?;
            planner.begin_edit(&id)?;
            {
                let draft = planner.draft_mut();
                if let Some(t) = title {
                    draft.title = t;
                }
                if let Some(k) = kind {
                    draft.kind = EventKind::parse(&k);
                }
                if let Some(d) = date {
                    draft.date = d;
                }
                if let Some(d) = description {
                    draft.description = d;
                }
            }
            planner.save_draft().await?;
            println!("updated {}", id);
            planner.close();
        }
        Commands::Delete { id, yes } => {
            let confirmed = yes || confirm_on_stdin(&format!("Delete plan {}? [y/N] ", id))?;
            planner.start();
            wait_for_first_snapshot(&planner).await?;
            if planner.delete_event(&id, confirmed).await? {
                println!("deleted {}", id);
            } else {
                println!("not deleted (no confirmation)");
            }
            planner.close();
        }
        Commands::AddImages { id, files } => {
            planner.start();
            wait_for_first_snapshot(&planner).await?;
            planner.open_detail(&id)?;
            let sources = load_sources(&files)?;
            let report = planner.attach_images(sources).await?;
            print_batch_report(report.appended, &report.skipped);
            planner.close();
        }
        Commands::RemoveImage { id, index } => {
            planner.start();
            wait_for_first_snapshot(&planner).await?;
            planner.open_detail(&id)?;
            planner.remove_image(index).await?;
            println!("removed image {} from {}", index, id);
            planner.close();
        }
        Commands::ConfigValidate => unreachable!("handled above"),
    }

    Ok(())
}

fn print_event_line(ev: &PlanEvent) {
    println!(
        "  {}  {}  [{}] {} ({} images)",
        ev.id,
        ev.date,
        ev.kind.label(),
        ev.title,
        ev.images.len()
    );
}

fn print_batch_report(appended: usize, skipped: &[lib::ingest::SkippedFile]) {
    if appended > 0 {
        println!("attached {} image(s)", appended);
    }
    for skip in skipped {
        eprintln!("warning: skipped {}: {}", skip.name, skip.reason);
    }
}

fn load_sources(paths: &[PathBuf]) -> Result<Vec<ImageSource>> {
    paths
        .iter()
        .map(|p| {
            ImageSource::from_path(Path::new(p))
                .with_context(|| format!("reading {}", p.display()))
        })
        .collect()
}

fn parse_year_month(s: &str) -> Result<(i32, u32)> {
    let (y, m) = s
        .split_once('-')
        .with_context(|| format!("invalid month {:?} (expected YYYY-MM)", s))?;
    Ok((y.parse()?, m.parse()?))
}

/// Wait until the sync adapter has its first snapshot (or reports offline).
async fn wait_for_first_snapshot(planner: &Planner) -> Result<()> {
    let mut rx = planner.sync().watch_state();
    let state = rx
        .wait_for(|s| !s.loading)
        .await
        .context("sync adapter stopped before first snapshot")?;
    if !state.online {
        anyhow::bail!("store unreachable");
    }
    Ok(())
}

fn confirm_on_stdin(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
