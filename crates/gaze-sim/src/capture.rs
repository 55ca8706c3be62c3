//! Synthetic camera thread

use frame_input::synthetic::FaceScene;
use frame_input::{CaptureConfig, Frame};
use ring_buffer::LatestSlot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::info;

/// Where the simulated user is looking, normalized screen coordinates
pub type GazeIntent = (f64, f64);

/// Render frames of a face looking at the current intent until `running` clears.
///
/// Runs on a blocking thread; frames are stamped with milliseconds since `epoch`.
pub fn run(
    config: CaptureConfig,
    slot: Arc<LatestSlot<Frame>>,
    intent: watch::Receiver<GazeIntent>,
    running: Arc<AtomicBool>,
    epoch: Instant,
) {
    let interval = Duration::from_millis(config.frame_interval_ms());
    info!(
        "Synthetic capture started ({}x{} @ {} fps)",
        config.width, config.height, config.fps
    );

    while running.load(Ordering::Relaxed) {
        let (sx, sy) = *intent.borrow();
        let now = epoch.elapsed().as_millis() as u64;
        // Small fixational drift
        let drift = 0.01 * (now as f64 / 170.0).sin();
        let scene = FaceScene::new(config.width, config.height).with_gaze((sx - 0.5) * 2.0 + drift, (sy - 0.5) * 2.0);
        slot.publish(scene.render(now));
        std::thread::sleep(interval);
    }

    let stats = slot.stats();
    info!(
        "Synthetic capture stopped: {} frames published, {} dropped",
        stats.published, stats.dropped
    );
}
