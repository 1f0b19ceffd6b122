//! skymirror - daemon mirroring a source list timeline to Bluesky
//!
//! Polls the source at a fixed interval, posts anything not seen before,
//! and terminates on its own after the configured wall-clock budget.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use libskymirror::config::Config;
use libskymirror::error::PlatformError;
use libskymirror::notify::Notifier;
use libskymirror::platforms::bluesky::BlueskyClient;
use libskymirror::platforms::Destination;
use libskymirror::source::SourceClient;
use libskymirror::{CycleReport, MirrorError, MirrorService, Result};

/// Timeout for every outbound request; a hanging call would otherwise
/// stall the whole loop.
const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "skymirror")]
#[command(version)]
#[command(about = "Mirror a source list timeline to a Bluesky account")]
#[command(long_about = "\
skymirror - mirror a source list timeline to a Bluesky account

DESCRIPTION:
    skymirror polls a source list-timeline endpoint at a fixed interval,
    deduplicates items it has already mirrored, formats each new item into
    a destination post (link facets, external link embed with thumbnail)
    and splits long text across threaded replies.

    On startup the currently visible timeline is loaded as the baseline:
    those items are marked seen and never posted. The loop terminates by
    itself after the configured wall-clock budget; run it under a process
    supervisor for continuous mirroring.

USAGE:
    # Run with the default config (~/.config/skymirror/config.toml)
    skymirror

    # Run one immediate cycle and exit (for testing)
    skymirror --once

    # Poll every minute instead of the configured interval
    skymirror --sleep-interval 60

CONFIGURATION:
    Config file: ~/.config/skymirror/config.toml (or $SKYMIRROR_CONFIG)

    [bluesky]
    handle = \"mirror.bsky.social\"
    app_password = \"...\"

    [source]
    api_key = \"...\"
    list_id = \"...\"

    [mirror]
    sleep_interval_secs = 300
    reboot_after_secs = 86400
    max_units_per_cycle = 30

EXIT CODES:
    0 - Clean termination after the cycle budget
    1 - Runtime error
    2 - Authentication error
")]
struct Cli {
    /// Path to the config file (overrides SKYMIRROR_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds between poll cycles (overrides config)
    #[arg(long, value_name = "SECONDS")]
    sleep_interval: Option<u64>,

    /// Run the baseline load plus one immediate cycle, then exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libskymirror::logging::init_default(cli.verbose);

    if let Err(error) = run(cli).await {
        eprintln!("Error: {}", error);
        std::process::exit(error.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let mut mirror = config.mirror.clone();
    if let Some(secs) = cli.sleep_interval {
        mirror.sleep_interval_secs = secs;
    }
    if mirror.sleep_interval_secs == 0 {
        return Err(MirrorError::InvalidInput(
            "sleep interval must be at least one second".to_string(),
        ));
    }

    let sleep_interval = mirror.sleep_interval_secs;
    let cycles = if cli.once { 1 } else { mirror.cycle_budget() };

    info!(sleep_interval, cycles, "skymirror starting");

    let notifier = config.mailer.clone().map(Notifier::new);
    if let Some(notifier) = &notifier {
        notifier.notify_started(&timestamp()).await?;
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| {
            MirrorError::Platform(PlatformError::Network(format!(
                "Failed to build HTTP client: {}",
                e
            )))
        })?;

    // The destination session is created once and held for the whole run;
    // logging in again every cycle trips the remote login rate limiter.
    let mut bluesky = BlueskyClient::new(http.clone(), &config.bluesky);
    bluesky.authenticate().await?;

    let source = SourceClient::new(http.clone(), &config.source);
    let mut service = MirrorService::new(bluesky, http, mirror.max_units_per_cycle);

    // Baseline load: everything currently visible counts as already
    // mirrored, so a restart does not replay the timeline.
    let baseline = source.fetch_timeline().await?;
    service.seed(&baseline);

    run_polling(&mut service, &source, sleep_interval, cycles, cli.once).await?;

    if let Some(notifier) = &notifier {
        notifier.notify_ended(&timestamp()).await?;
    }
    info!("skymirror stopped");

    Ok(())
}

/// The POLLING phase: fixed-count cycle loop with typed error handling.
///
/// Transient source/preview failures abandon the cycle and the loop moves
/// on to the next sleep; destination errors propagate and terminate the
/// run.
async fn run_polling(
    service: &mut MirrorService<BlueskyClient>,
    source: &SourceClient,
    sleep_interval: u64,
    cycles: u64,
    once: bool,
) -> Result<()> {
    for cycle in 1..=cycles {
        if !once {
            sleep(Duration::from_secs(sleep_interval)).await;
        }
        debug!(cycle, "checking for updates");

        match run_cycle(service, source).await {
            Ok(report) => log_report(cycle, &report),
            Err(error) if error.is_cycle_transient() => {
                warn!(cycle, error = %error, "cycle abandoned; continuing");
            }
            Err(error) => return Err(error),
        }
    }

    Ok(())
}

async fn run_cycle(
    service: &mut MirrorService<BlueskyClient>,
    source: &SourceClient,
) -> Result<CycleReport> {
    let items = source.fetch_timeline().await?;
    service.run_cycle(&items).await
}

fn log_report(cycle: u64, report: &CycleReport) {
    info!(
        cycle,
        new_items = report.new_items,
        posted = report.posted,
        skipped = report.skipped,
        posts_created = report.posts_created,
        units = report.units,
        "cycle complete"
    );
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
