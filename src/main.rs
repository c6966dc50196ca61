use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use bagsync::cli::{Cli, Commands, DatasetArgs, resolve_config};
use bagsync::{
    DecoderRegistry, LogStore, PlaybackConfig, PlaybackOutcome, PlaybackScheduler, Player, RerunPublisher,
    RobotTimeline, TracingPublisher, groundtruth, info, load_dataset, rrd_writer,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load(config_file: Option<&Path>, dataset: &DatasetArgs, rate: Option<f64>) -> Result<(PlaybackConfig, Vec<RobotTimeline>)> {
    let config = resolve_config(config_file, dataset, rate)?;
    let timelines = load_dataset(&config, DecoderRegistry::builtin())
        .with_context(|| format!("failed to load dataset {}", config.dataset_dir.display()))?;
    Ok((config, timelines))
}

fn play(config: &PlaybackConfig, timelines: Vec<RobotTimeline>, rrd: Option<&Path>, json: bool, progress: bool) -> Result<()> {
    let rerun = rrd.map(RerunPublisher::save).transpose()?;
    let scheduler = PlaybackScheduler::new(timelines, (TracingPublisher, rerun));
    let mut player = Player::new(scheduler, config.rate)?.with_progress(progress);

    let stop = player.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("failed to install Ctrl-C handler")?;

    tracing::info!(
        "Starting playback of {} robots at {} Hz",
        config.robot_names.len(),
        config.rate
    );
    let summary = player.run()?;
    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        match summary.outcome {
            PlaybackOutcome::Completed => println!("Finished processing all messages: {} scans", summary.emitted),
            PlaybackOutcome::Cancelled => println!("Playback cancelled after {} scans", summary.emitted),
        }
    }
    Ok(())
}

fn inspect(bag: &Path) -> Result<()> {
    let store = LogStore::open(bag).with_context(|| format!("failed to open log {}", bag.display()))?;
    let topics = store.summary()?;
    store.close()?;
    print!("{}", info::render_topics(bag, &topics));
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config_file = cli.config.as_deref();
    match cli.command {
        Commands::Play { dataset, rate, rrd, json, no_progress } => {
            let (config, timelines) = load(config_file, &dataset, rate)?;
            play(&config, timelines, rrd.as_deref(), json, !(no_progress || json))
        }
        Commands::PlotTrajectories { dataset, out } => {
            let (_, timelines) = load(config_file, &dataset, None)?;
            rrd_writer::plot_trajectories(&timelines, &out)
        }
        Commands::PrintInfo { dataset } => {
            let (_, timelines) = load(config_file, &dataset, None)?;
            for timeline in &timelines {
                let stats = info::robot_stats(timeline)?;
                println!("{}", info::render(&stats));
            }
            Ok(())
        }
        Commands::WriteGroundtruth { dataset } => {
            let (config, timelines) = load(config_file, &dataset, None)?;
            groundtruth::write_groundtruth(&config.dataset_dir, &timelines)?;
            Ok(())
        }
        Commands::Inspect { bag } => inspect(&bag),
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
