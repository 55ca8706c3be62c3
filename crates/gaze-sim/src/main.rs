//! GazeSelect simulator - Main Entry Point
//!
//! A synthetic camera thread hands frames to the pipeline through a
//! latest-frame slot. The simulated user first follows the calibration
//! targets, then dwell-types a word on an on-screen keyboard.
//!
//! Usage: `gaze-sim [config.toml] [WORD]`

mod capture;
mod keyboard;

use anyhow::{bail, Context, Result};
use calibration::CalibrationEvent;
use frame_input::{CaptureConfig, Frame};
use gaze_pipeline::{FrameResult, GazePipeline, PipelineConfig, SelectionMode};
use ring_buffer::LatestSlot;
use selection::{SelectionEvent, SelectionLog, SelectionTarget};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, Interval};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const CALIBRATION_DEADLINE: Duration = Duration::from_secs(90);
const KEY_DEADLINE: Duration = Duration::from_secs(10);

/// Initialize tracing subscriber
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Consumer side of the capture handoff
struct Host {
    pipeline: GazePipeline,
    slot: Arc<LatestSlot<Frame>>,
    intent: watch::Sender<capture::GazeIntent>,
    ticker: Interval,
    epoch: Instant,
}

impl Host {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Wait for the next tick and process the newest frame, if any arrived
    async fn tick(&mut self) -> Result<Option<FrameResult>> {
        self.ticker.tick().await;
        match self.slot.take() {
            Some(frame) => Ok(Some(self.pipeline.process_frame(&frame)?)),
            None => Ok(None),
        }
    }

    fn look_at(&self, target: capture::GazeIntent) {
        // Receiver gone means capture already stopped
        let _ = self.intent.send(target);
    }

    async fn calibrate(&mut self) -> Result<()> {
        let viewport = self.pipeline.config().calibration.viewport;
        self.pipeline.start_calibration(self.now_ms());
        let deadline = Instant::now() + CALIBRATION_DEADLINE;

        while Instant::now() < deadline {
            if let Some((x, y)) = self.pipeline.calibration_target() {
                self.look_at((x / viewport.0, y / viewport.1));
            }
            let Some(result) = self.tick().await? else {
                continue;
            };
            for event in result.calibration_events {
                match event {
                    CalibrationEvent::PointStarted { index, target, .. } => {
                        info!("Calibration point {} at ({:.2}, {:.2})", index, target.x, target.y)
                    }
                    CalibrationEvent::ValidationStarted { point_count, .. } => {
                        info!("Accuracy test over {} points", point_count)
                    }
                    CalibrationEvent::Finished { outcome, .. } => {
                        if !outcome.success {
                            bail!(
                                "calibration failed: {}",
                                outcome.failure.unwrap_or_else(|| "unknown".into())
                            );
                        }
                        info!(
                            "Calibrated: overall {:.2} (h {:.2}, v {:.2}), recalibrate: {}",
                            outcome.accuracy.overall,
                            outcome.accuracy.horizontal,
                            outcome.accuracy.vertical,
                            outcome.recalibration_recommended
                        );
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        self.pipeline.cancel_calibration();
        bail!("calibration did not finish within {:?}", CALIBRATION_DEADLINE)
    }

    /// Dwell on each key of `word`; returns what was typed
    async fn type_word(&mut self, word: &str, log: &Arc<Mutex<SelectionLog>>) -> Result<String> {
        let viewport = self.pipeline.config().calibration.viewport;
        self.pipeline.set_mode(SelectionMode::Dwell);
        self.pipeline.set_targets(keyboard::layout(viewport))?;

        for key in word.chars() {
            let center = keyboard::key_center(key).with_context(|| format!("no key for {:?}", key))?;
            self.look_at(center);
            let deadline = Instant::now() + KEY_DEADLINE;
            let expected = SelectionTarget::Target(key.to_string());

            let mut committed = false;
            while !committed && Instant::now() < deadline {
                if let Some(result) = self.tick().await? {
                    committed = result.selection_events.iter().any(|e| {
                        matches!(e, SelectionEvent::Selected { target, .. } if *target == expected)
                    });
                }
            }
            if !committed {
                warn!("Key {:?} not selected within {:?}", key, KEY_DEADLINE);
            }
        }

        let typed = log
            .lock()
            .map_err(|_| anyhow::anyhow!("selection log poisoned"))?
            .selections
            .iter()
            .filter_map(|s| match s {
                SelectionTarget::Target(id) => Some(id.replace('_', " ")),
                SelectionTarget::Zone(_) => None,
            })
            .collect();
        Ok(typed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("=== GazeSelect simulator v{} ===", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let word = args.next().unwrap_or_else(|| "GAZE".to_string()).to_uppercase();

    let config = PipelineConfig::load(config_path.as_deref()).context("loading pipeline configuration")?;
    let mut pipeline = GazePipeline::new(config).context("building gaze pipeline")?;
    let log = Arc::new(Mutex::new(SelectionLog::default()));
    pipeline.set_sink(Box::new(Arc::clone(&log)));

    let capture_config = CaptureConfig::default();
    let slot = Arc::new(LatestSlot::new());
    let running = Arc::new(AtomicBool::new(true));
    let (intent_tx, intent_rx) = watch::channel((0.5, 0.5));
    let epoch = Instant::now();

    let producer = tokio::task::spawn_blocking({
        let slot = Arc::clone(&slot);
        let running = Arc::clone(&running);
        let config = capture_config.clone();
        move || capture::run(config, slot, intent_rx, running, epoch)
    });

    let mut host = Host {
        pipeline,
        slot,
        intent: intent_tx,
        ticker: interval(Duration::from_millis(capture_config.frame_interval_ms())),
        epoch,
    };

    let session: Result<String> = async {
        host.calibrate().await?;
        host.type_word(&word, &log).await
    }
    .await;

    running.store(false, Ordering::Relaxed);
    producer.await.context("capture thread panicked")?;

    let typed = session?;
    info!(
        "Typed {:?} (asked for {:?}) in {} frames",
        typed,
        word,
        host.pipeline.frames_processed()
    );
    Ok(())
}
