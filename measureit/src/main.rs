//! Sweep execution engine CLI: wires configuration, logging, a demo
//! station, and a one-axis sweep through the full Runner/persistence/plot
//! stack.

mod station;

use clap::{Parser, Subcommand};
use measureit_common::config::{AppConfig, ConfigError};
use measureit_common::error::MeasureItError;
use measureit_common::logging;
use measureit_common::paths::PersistenceRoot;
use measureit_parameter::Parameter;
use measureit_persistence::JsonLinesStore;
use measureit_plot::PlotSink;
use measureit_queue::{QueueEntry, SweepQueue};
use measureit_runtime::{data_channel, registry, ManagedSweep};
use measureit_sweep::kinds::one_axis::OneAxisSweep;
use measureit_sweep::{FollowSet, SweepCore, Trajectory, TrajectoryMode};
use station::DemoStation;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Top-level error for the binary: every library error type converts here
/// so `main` can propagate with `?`.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sweep(#[from] MeasureItError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[command(name = "measureit", about = "Sweep execution engine for laboratory instruments")]
struct Cli {
    /// Override the persistence root (databases/, logs/, cfg/).
    #[arg(long)]
    home: Option<PathBuf>,

    /// Path to a TOML config file; defaults to `<persistence root>/cfg/measureit.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a demo one-axis sweep against a simulated instrument channel.
    Demo {
        /// Experiment name used to tag the persisted dataset.
        #[arg(long, default_value = "demo")]
        experiment: String,
        /// Trajectory start.
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        /// Trajectory stop.
        #[arg(long, default_value_t = 1.0)]
        stop: f64,
        /// Trajectory step.
        #[arg(long, default_value_t = 0.1)]
        step: f64,
    },
    /// Run two demo sweeps back to back through a queue, under separate
    /// experiment names set by a context switch.
    QueueDemo,
    /// Print the resolved persistence root and exit.
    ShowConfig,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let root = PersistenceRoot::resolve(cli.home.as_deref());

    let config_path = cli
        .config
        .unwrap_or_else(|| root.cfg_dir().unwrap_or_else(|_| root.root().to_path_buf()).join("measureit.toml"));
    let config = AppConfig::load(&config_path).unwrap_or_default();
    config.validate()?;

    let log_path = logging::init(&root, config.log_level)?;
    info!(log_path = %log_path.display(), "logging initialized");

    match cli.command {
        Command::ShowConfig => {
            println!("persistence root: {}", root.root().display());
            println!("log file: {}", log_path.display());
            Ok(())
        }
        Command::Demo { experiment, start, stop, step } => run_demo(&root, &experiment, start, stop, step),
        Command::QueueDemo => run_queue_demo(root),
    }
}

fn run_queue_demo(root: PersistenceRoot) -> Result<(), CliError> {
    let station = DemoStation::new();
    station.register("demo.gate_a", "V", 0.0);
    station.register("demo.gate_b", "V", 0.0);

    let core_a = demo_core(&station, "demo.gate_a", 0.0, 0.3, 0.1)?;
    let core_b = demo_core(&station, "demo.gate_b", 0.0, 0.2, 0.1)?;

    let mut queue = SweepQueue::new();
    queue.append(QueueEntry::ContextSwitch("cooldown".to_string()));
    queue.append(QueueEntry::Sweep { core: core_a, experiment: None });
    queue.append(QueueEntry::ContextSwitch("warmup".to_string()));
    queue.append(QueueEntry::Sweep { core: core_b, experiment: None });

    queue.start(root)?;
    for outcome in queue.join() {
        info!(experiment = %outcome.experiment, state = ?outcome.final_state, "queue entry finished");
        println!("{}: {:?}", outcome.experiment, outcome.final_state);
    }
    Ok(())
}

fn demo_core(station: &DemoStation, identity: &str, start: f64, stop: f64, step: f64) -> Result<SweepCore, CliError> {
    let param = station.resolve(identity).expect("just registered");
    let trajectory = Trajectory::new(start, stop, step, TrajectoryMode::OneShot)?;
    let kind = OneAxisSweep::new(param, trajectory, 0.0, false);
    Ok(SweepCore::new(Box::new(kind), FollowSet::new())?)
}

fn run_demo(root: &PersistenceRoot, experiment: &str, start: f64, stop: f64, step: f64) -> Result<(), CliError> {
    let station = DemoStation::new();
    station.register("demo.gate", "V", 0.0);
    let param = station.resolve("demo.gate").expect("just registered");
    let name = param.name().to_string();
    info!(parameter = %name, "resolved demo channel");

    let trajectory = Trajectory::new(start, stop, step, TrajectoryMode::OneShot)?;
    let kind = OneAxisSweep::new(param, trajectory, 0.0, false);
    let core = SweepCore::new(Box::new(kind), FollowSet::new())?;

    let mut managed = ManagedSweep::new(core);
    let metadata = managed.metadata().clone();
    let controlled_names = managed.controlled_names().to_vec();
    let followed_names = managed.followed_names().to_vec();

    let (plot_tx, plot_rx) = data_channel();
    let (store_tx, store_rx) = data_channel();
    registry::start(&mut managed, vec![plot_tx, store_tx])?;

    let runner_control = managed.control_handle().expect("sweep just started");
    let mut plot = PlotSink::spawn(plot_rx, runner_control, followed_names.len().max(1));

    let run_tag = format!("{}", managed.id().value());
    let mut store = JsonLinesStore::open(root, experiment, &run_tag)?;
    store.begin_measurement(&metadata, &controlled_names, &followed_names)?;
    for envelope in store_rx.iter() {
        if envelope.row.is_break {
            continue;
        }
        store.append(&envelope.row.setpoints, &envelope.row.followed)?;
    }

    let final_state = managed.join();
    store.finish(final_state)?;
    store.close()?;
    plot.join();
    registry::remove(managed.ancestry());

    info!(state = ?final_state, "demo sweep finished");
    println!("sweep finished: {final_state:?}");
    println!("dataset: {}", store.path().map(|p| p.display().to_string()).unwrap_or_default());
    Ok(())
}
