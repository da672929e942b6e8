//! Requests marshaled onto the UI thread
//!
//! The monitor thread, the countdown tasks and the tray never touch panes
//! directly; they post a [`UiCommand`] and return. The channel is FIFO, so the
//! per-tick order (borders, creations, teardowns) is preserved.

use tokio::sync::{mpsc, oneshot};

use crate::config::RuleHandle;

use super::backend::{PaneId, WindowId};
use super::border::BorderMode;

#[derive(Debug)]
pub enum UiCommand {
    /// Build a pane for a freshly matched window
    CreatePane {
        pane: PaneId,
        window: WindowId,
        title: String,
        rule: RuleHandle,
    },
    SetBorder {
        pane: PaneId,
        mode: BorderMode,
    },
    DestroyPane {
        pane: PaneId,
    },
    /// Redraw the press-and-hold indicator; `done` fires once painted
    CountdownFrame {
        pane: PaneId,
        generation: u64,
        fraction: f64,
        done: oneshot::Sender<()>,
    },
    HideCountdown {
        pane: PaneId,
        generation: u64,
    },
    /// Activate the pane's target window (tray entry)
    Activate {
        pane: PaneId,
    },
    /// Show a status message to the user
    Report(String),
    ToggleVisibility,
    Save,
    Backup,
    Exit,
}

pub type CommandSender = mpsc::UnboundedSender<UiCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<UiCommand>;

pub fn channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}
