//! Fixed-rate driver for the playback scheduler

use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::tick_interval;
use crate::error::Result;
use crate::publisher::Publisher;
use crate::readiness::ReadinessGate;
use crate::scheduler::{PlaybackScheduler, TickOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSummary {
    pub outcome: PlaybackOutcome,
    pub emitted: usize,
    pub waits: usize,
    pub last_clock_ns: Option<i64>,
}

/// Requests a running [`Player`] to stop before its next tick.
#[derive(Debug, Clone)]
pub struct StopHandle(Sender<()>);

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.0.try_send(());
    }
}

pub struct Player<P, G> {
    scheduler: PlaybackScheduler<P, G>,
    interval: Duration,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    progress: bool,
}

impl<P: Publisher, G: ReadinessGate> Player<P, G> {
    pub fn new(scheduler: PlaybackScheduler<P, G>, rate: f64) -> Result<Self> {
        let interval = tick_interval(rate)?;
        let (stop_tx, stop_rx) = flume::bounded(1);
        Ok(Self { scheduler, interval, stop_tx, stop_rx, progress: false })
    }

    /// Show an `indicatif` bar counting emitted scans.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop_tx.clone())
    }

    pub fn scheduler(&self) -> &PlaybackScheduler<P, G> {
        &self.scheduler
    }

    pub fn into_scheduler(self) -> PlaybackScheduler<P, G> {
        self.scheduler
    }

    /// Tick once per interval until playback is done or a stop is requested.
    pub fn run(&mut self) -> Result<PlaybackSummary> {
        let pb = if self.progress {
            let pb = ProgressBar::new(self.scheduler.total_scans() as u64);
            pb.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} scans [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut emitted = 0;
        let mut waits = 0;
        let outcome = loop {
            match self.stop_rx.recv_timeout(self.interval) {
                Ok(()) => {
                    tracing::info!("Playback stopped after {emitted} scans");
                    break PlaybackOutcome::Cancelled;
                }
                // the player holds a sender, so the channel never disconnects
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
            }

            match self.scheduler.tick() {
                Ok(TickOutcome::Emitted(e)) => {
                    emitted += 1;
                    pb.inc(1);
                    pb.set_message(e.robot);
                }
                Ok(TickOutcome::Waiting) => waits += 1,
                Ok(TickOutcome::Done) => break PlaybackOutcome::Completed,
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            }
        };
        pb.finish_and_clear();

        Ok(PlaybackSummary { outcome, emitted, waits, last_clock_ns: self.scheduler.watermark() })
    }
}
