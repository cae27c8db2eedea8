//! sosodesk - Main Entry Point
//!
//! Loads settings, wires the workbench and runs one command against the
//! backend.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sosodesk::{Backend, Workbench};
use sosodesk_application::{RunOutcome, SaveOutcome, StoreEvent};
use sosodesk_domain::ResponseSnapshot;
use sosodesk_infrastructure::{LocalCache, SettingsRepository};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sosodesk", about = "Headless workbench for a sosotest backend", version)]
struct Cli {
    /// Use the built-in demo backend instead of the network.
    #[arg(long)]
    offline: bool,

    /// Backend base URL, overriding the settings file.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Directory holding settings.json and local_cache.json.
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List catalog interfaces.
    List {
        /// Stop after this many pages.
        #[arg(long)]
        pages: Option<u32>,
    },
    /// List the environments an interface can run in.
    Envs {
        /// Interface id.
        id: i64,
    },
    /// Run an interface and stream the poll results.
    Run {
        /// Interface id.
        id: i64,
        /// Environment config key; the remembered or first selectable one
        /// otherwise.
        #[arg(long = "env", value_name = "KEY")]
        environment: Option<String>,
    },
    /// Change an interface's URL and save it.
    Save {
        /// Interface id.
        id: i64,
        /// New request URL.
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings_repo = cli
        .config_dir
        .as_ref()
        .map_or_else(SettingsRepository::new, SettingsRepository::in_dir);
    let mut settings = settings_repo.load().await.context("loading settings")?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }

    let mut cache = match &cli.config_dir {
        Some(dir) => LocalCache::open(dir.join("local_cache.json")).await.ok(),
        None => LocalCache::open_default().await.ok(),
    };
    if cache.is_none() {
        warn!("local cache unavailable, environment choices will not be remembered");
    }

    let backend = Backend::connect(&settings, cli.offline)?;
    let workbench = Workbench::new(settings, backend);
    if let Some(cache) = &cache {
        workbench.restore(cache);
    }
    let printer = tokio::spawn(print_events(workbench.store().subscribe()));

    let result = execute(&workbench, cli.command).await;

    if let Some(cache) = &mut cache {
        workbench.remember(cache);
        if let Err(error) = cache.flush().await {
            warn!(%error, "could not write the local cache");
        }
    }
    workbench.shutdown();
    drop(workbench);
    let _ = printer.await;
    result
}

async fn execute(workbench: &Workbench, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { pages } => {
            for row in workbench.load_catalog(pages).await?.iter() {
                println!("{:>6}  {:<7} {}  {}", row.id, row.method, row.url, row.title);
            }
        }
        Command::Envs { id } => {
            workbench.open(id).await?;
            workbench.store().resolve_active_environment().await;
            let resolver = workbench.store().environments();
            if let Some(error) = resolver.last_error() {
                return Err(error.into());
            }
            let selected = resolver.selected();
            for option in resolver.options() {
                let marker = if selected.as_deref() == Some(option.entry.config_key.as_str()) {
                    '*'
                } else {
                    ' '
                };
                let note = if option.disabled { " (not selectable)" } else { "" };
                println!(
                    "{marker} {:<16} {:<24} {}{note}",
                    option.entry.config_key, option.entry.label, option.entry.request_addr
                );
            }
        }
        Command::Run { id, environment } => {
            match run_until_interrupted(workbench, id, environment).await? {
                RunOutcome::Completed { converged, attempts } => {
                    let active = workbench.store().active_tab();
                    if let Some(snapshot) = active.and_then(|tab| tab.response) {
                        print_snapshot(&snapshot);
                    }
                    if !converged {
                        anyhow::bail!("no final result after {attempts} polls");
                    }
                }
                RunOutcome::Cancelled => eprintln!("run cancelled"),
                RunOutcome::Failed(message) => anyhow::bail!("run failed: {message}"),
                other => anyhow::bail!("run did not finish: {other:?}"),
            }
        }
        Command::Save { id, url } => match workbench.save_url(id, &url).await? {
            SaveOutcome::Saved => println!("saved interface {id}"),
            SaveOutcome::Failed(error) => return Err(error.into()),
            SaveOutcome::Skipped(reason) => anyhow::bail!("save skipped: {reason:?}"),
        },
    }
    Ok(())
}

/// Runs an interface; Ctrl-C cancels the debug job and waits for the run to
/// wind down instead of killing the process mid-poll.
async fn run_until_interrupted(
    workbench: &Workbench,
    id: i64,
    environment: Option<String>,
) -> anyhow::Result<RunOutcome> {
    let run = workbench.run(id, environment.as_deref());
    tokio::pin!(run);
    tokio::select! {
        outcome = &mut run => outcome,
        signal = tokio::signal::ctrl_c() => {
            if let Err(error) = signal {
                warn!(%error, "could not listen for Ctrl-C");
            } else {
                debug!("interrupted, cancelling the active run");
                workbench.store().cancel_active_request();
            }
            run.await
        }
    }
}

async fn print_events(mut events: UnboundedReceiver<StoreEvent>) {
    while let Some(event) = events.recv().await {
        if let StoreEvent::SnapshotReceived { tab_id, snapshot } = event
            && let Some(line) = snapshot.console.last()
        {
            eprintln!("{tab_id} {line}");
        }
    }
}

fn print_snapshot(snapshot: &ResponseSnapshot) {
    println!(
        "HTTP {} {}  {} ms  {}",
        snapshot.status,
        snapshot.status_text,
        snapshot.duration_ms,
        snapshot.size_display()
    );
    for header in &snapshot.headers {
        println!("{}: {}", header.name, header.value);
    }
    println!();
    println!("{}", snapshot.body);
}
