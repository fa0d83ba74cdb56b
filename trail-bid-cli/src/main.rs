use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use trail_bid_config::{get_config, Config};
use trail_bid_engine::{
    assign_fairness_ranks, explain, AllocationReport, Allocator, DrawOrderStore, DrawSource, Event,
    ParticipantId,
};
use trail_bid_ingest::{generate, load_event, Distribution, Loaded};
use trail_bid_telemetry::setup_logging;

mod report;

/// Award capacity-limited trails to hashers according to their bids.
#[derive(Parser)]
#[command(name = "trail-bid", version, about, long_about = None)]
struct Cli {
    /// More log output, repeat for even more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RunOptions {
    /// Override the configured bid allowance
    #[arg(long)]
    bid_allowance: Option<u64>,

    /// Seed for a fresh fairness draw
    #[arg(long)]
    seed: Option<u64>,

    /// Discard the persisted fairness draw and draw again
    #[arg(long)]
    redraw: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve all bids and list the winners
    Run {
        event_directory: PathBuf,

        #[command(flatten)]
        options: RunOptions,

        /// Also list bid values and the ranked bids of every time slot
        #[arg(long)]
        detail: bool,
    },
    /// Resolve all bids and explain the outcome for one hasher
    Explain {
        event_directory: PathBuf,

        participant: u64,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Write synthetic hashers and bids for the calendar of an event
    Generate {
        event_directory: PathBuf,

        #[arg(long, default_value_t = 2000)]
        hashers: u64,

        #[arg(long, default_value_t = Distribution::Random)]
        distribution: Distribution,

        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured bid allowance
        #[arg(long)]
        bid_allowance: Option<u64>,
    },
}

fn config(
    event_directory: &Path,
    bid_allowance: Option<u64>,
    seed: Option<u64>,
) -> anyhow::Result<Config> {
    let mut config = get_config(event_directory)
        .with_context(|| format!("reading configuration for {}", event_directory.display()))?;
    if let Some(bid_allowance) = bid_allowance {
        config.bid_allowance = bid_allowance;
    }
    if seed.is_some() {
        config.draw_seed = seed;
    }
    Ok(config)
}

/// Loads the event, ranks the hashers and resolves every time slot.
fn resolve(
    event_directory: &Path,
    options: &RunOptions,
) -> anyhow::Result<(Event, AllocationReport)> {
    let config = config(event_directory, options.bid_allowance, options.seed)?;
    let Loaded { mut event, summary } = load_event(event_directory, &config)
        .with_context(|| format!("loading event from {}", event_directory.display()))?;
    if summary.skipped() > 0 {
        warn!(skipped = summary.skipped(), "some input rows were skipped");
    }
    if summary.advisories > 0 {
        warn!(
            advisories = summary.advisories,
            allowance = config.bid_allowance,
            "bid allowance exceeded"
        );
    }

    let store = DrawOrderStore::new(
        config.draw_order_path(event_directory),
        config.dataset.clone(),
    );
    if options.redraw {
        store.remove().context("discarding the fairness draw")?;
    }
    let source = match store.load().context("reading the fairness draw")? {
        Some(draw) => {
            if options.seed.is_some() {
                warn!(
                    "replaying the persisted fairness draw, --seed has no effect without --redraw"
                );
            }
            DrawSource::Replay(draw)
        }
        None => DrawSource::Fresh {
            seed: config.draw_seed,
        },
    };
    let assignment = assign_fairness_ranks(&mut event, source);
    if !assignment.summary.replayed {
        store.save(&assignment.draw).context("saving the fairness draw")?;
    }

    let report = Allocator::new(&mut event).resolve_all();
    info!(winners = report.winner_count(), losses = report.loss_count(), "allocation complete");
    Ok((event, report))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Run {
            event_directory,
            options,
            detail,
        } => {
            let (event, report) = resolve(&event_directory, &options)?;
            report::write_results(&mut out, &event, &report, detail)?;
        }
        Command::Explain {
            event_directory,
            participant,
            options,
        } => {
            let (event, _) = resolve(&event_directory, &options)?;
            let Some(explanation) = explain(&event, ParticipantId(participant)) else {
                bail!("unknown hasher {participant}");
            };
            report::write_explanation(&mut out, &explanation)?;
        }
        Command::Generate {
            event_directory,
            hashers,
            distribution,
            seed,
            bid_allowance,
        } => {
            let config = config(&event_directory, bid_allowance, None)?;
            let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let summary = generate(
                &event_directory,
                hashers,
                distribution,
                config.bid_allowance,
                &mut rng,
            )
            .with_context(|| format!("generating data in {}", event_directory.display()))?;
            writeln!(
                out,
                "{} hashers, {} bids over {} time slots",
                summary.hashers, summary.bids, summary.time_slots
            )?;
        }
    }
    out.flush()?;
    Ok(())
}
