//! Press-and-hold countdown driver
//!
//! One task per press. Each frame is a request/response over the UI channel:
//! the task posts `CountdownFrame` and waits for the paint to complete before
//! sleeping for the next frame. Frames stop once the press is over, then a
//! zero-fraction frame is drawn and the indicator is hidden.

use std::time::{Duration, Instant};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::constants::countdown;

use super::backend::PaneId;
use super::commands::{CommandSender, UiCommand};
use super::drag::countdown_fraction;

/// Owned by the pane; dropping it ends the countdown
#[derive(Debug)]
pub struct CountdownHandle {
    generation: u64,
    active: watch::Sender<bool>,
}

impl CountdownHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stop(&self) {
        self.active.send_replace(false);
    }
}

pub fn start(
    commands: CommandSender,
    pane: PaneId,
    generation: u64,
    started: Instant,
    delay: Duration,
) -> (CountdownHandle, JoinHandle<()>) {
    let (active, watcher) = watch::channel(true);
    let task = tokio::spawn(run(commands, pane, generation, started, delay, watcher));
    (CountdownHandle { generation, active }, task)
}

async fn frame(commands: &CommandSender, pane: PaneId, generation: u64, fraction: f64) -> bool {
    let (done, painted) = oneshot::channel();
    let sent = commands.send(UiCommand::CountdownFrame {
        pane,
        generation,
        fraction,
        done,
    });
    if sent.is_err() {
        return false;
    }
    // A dropped token means the frame was discarded; keep going
    let _ = painted.await;
    true
}

async fn run(
    commands: CommandSender,
    pane: PaneId,
    generation: u64,
    started: Instant,
    delay: Duration,
    watcher: watch::Receiver<bool>,
) {
    let interval = Duration::from_millis(countdown::FRAME_INTERVAL_MS);

    while *watcher.borrow() && watcher.has_changed().is_ok() {
        let fraction = countdown_fraction(started.elapsed(), delay);
        if !frame(&commands, pane, generation, fraction).await {
            return;
        }
        tokio::time::sleep(interval).await;
    }

    debug!(pane = pane.0, generation, "Countdown finished");
    if frame(&commands, pane, generation, 0.0).await {
        let _ = commands.send(UiCommand::HideCountdown { pane, generation });
    }
}
