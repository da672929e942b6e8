//! System tray icon: per-pane entries and global actions
//!
//! The tray runs on its own thread with a current-thread runtime. Menu
//! actions are posted to the UI thread as [`UiCommand`]s; the pane host
//! updates the menu through [`TrayMenu`].

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use ksni::TrayMethods;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::constants::tray;
use crate::daemon::backend::{PaneId, PaneMenu};
use crate::daemon::commands::{CommandSender, UiCommand};

#[derive(Debug)]
pub struct TrayState {
    pub entries: Vec<(PaneId, String)>,
    pub visible: bool,
    pub status: String,
}

impl Default for TrayState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            visible: true,
            status: String::new(),
        }
    }
}

type SharedState = Arc<Mutex<TrayState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, TrayState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// System tray icon integration handling menu events
pub struct AppTray {
    state: SharedState,
    commands: CommandSender,
}

impl AppTray {
    fn post(&self, command: UiCommand) {
        if self.commands.send(command).is_err() {
            warn!("UI thread is gone, tray action dropped");
        }
    }
}

impl ksni::Tray for AppTray {
    fn id(&self) -> String {
        tray::ID.into()
    }

    fn icon_name(&self) -> String {
        tray::ICON_NAME.into()
    }

    fn title(&self) -> String {
        tray::TITLE.into()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        let state = lock(&self.state);
        ksni::ToolTip {
            title: tray::TITLE.into(),
            description: state.status.clone(),
            ..Default::default()
        }
    }

    fn menu(&self) -> Vec<ksni::MenuItem<Self>> {
        use ksni::menu::*;

        let (visible, entries) = {
            let state = lock(&self.state);
            (state.visible, state.entries.clone())
        };

        let mut items: Vec<MenuItem<Self>> = vec![
            StandardItem {
                label: "Exit".into(),
                activate: Box::new(|this: &mut AppTray| this.post(UiCommand::Exit)),
                ..Default::default()
            }
            .into(),
            MenuItem::Separator,
            StandardItem {
                label: "Backup Configuration".into(),
                activate: Box::new(|this: &mut AppTray| this.post(UiCommand::Backup)),
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: "Save Configuration".into(),
                activate: Box::new(|this: &mut AppTray| this.post(UiCommand::Save)),
                ..Default::default()
            }
            .into(),
            CheckmarkItem {
                label: "Show Panes".into(),
                checked: visible,
                activate: Box::new(|this: &mut AppTray| {
                    {
                        let mut state = lock(&this.state);
                        state.visible = !state.visible;
                    }
                    this.post(UiCommand::ToggleVisibility);
                }),
                ..Default::default()
            }
            .into(),
        ];

        if !entries.is_empty() {
            items.push(MenuItem::Separator);
        }
        items.extend(entries.into_iter().map(|(pane, label)| {
            StandardItem {
                label,
                activate: Box::new(move |this: &mut AppTray| this.post(UiCommand::Activate { pane })),
                ..Default::default()
            }
            .into()
        }));
        items
    }
}

/// [`PaneMenu`] backed by the tray; changes are pushed to the tray thread
#[derive(Clone)]
pub struct TrayMenu {
    state: SharedState,
    update: Arc<Notify>,
}

impl TrayMenu {
    fn changed(&self) {
        self.update.notify_one();
    }
}

impl PaneMenu for TrayMenu {
    fn add_entry(&mut self, pane: PaneId, label: &str) {
        lock(&self.state).entries.push((pane, label.to_string()));
        self.changed();
    }

    fn remove_entry(&mut self, pane: PaneId) {
        lock(&self.state).entries.retain(|(entry, _)| *entry != pane);
        self.changed();
    }

    fn report(&mut self, message: &str) {
        info!(status = %message, "Status");
        lock(&self.state).status = message.to_string();
        self.changed();
    }
}

/// Owns the tray thread; dropping it does not stop the thread, call [`TrayHandle::shutdown`]
pub struct TrayHandle {
    shutdown: Arc<Notify>,
    thread: JoinHandle<()>,
}

impl TrayHandle {
    pub fn shutdown(self) {
        self.shutdown.notify_one();
        if self.thread.join().is_err() {
            error!("Tray thread panicked");
        }
    }
}

pub fn spawn_tray(commands: CommandSender) -> (TrayMenu, TrayHandle) {
    let state: SharedState = Arc::new(Mutex::new(TrayState::default()));
    let update = Arc::new(Notify::new());
    let shutdown = Arc::new(Notify::new());

    let menu = TrayMenu {
        state: Arc::clone(&state),
        update: Arc::clone(&update),
    };

    let shutdown_clone = Arc::clone(&shutdown);
    let thread = std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Failed to build Tokio runtime for tray");
                return;
            }
        };

        runtime.block_on(async move {
            let tray = AppTray { state, commands };
            match tray.spawn().await {
                Ok(handle) => {
                    info!("Tray icon created via ksni/D-Bus");
                    loop {
                        tokio::select! {
                            _ = shutdown_clone.notified() => {
                                handle.shutdown().await;
                                break;
                            }
                            _ = update.notified() => {
                                // Makes the host re-read the menu
                                handle.update(|_| {}).await;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(error = ?e, "Failed to create tray icon (D-Bus unavailable?)");
                    shutdown_clone.notified().await;
                }
            }
        });
    });

    (menu, TrayHandle { shutdown, thread })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::commands;
    use ksni::Tray;

    fn menu_and_state() -> (TrayMenu, SharedState) {
        let state: SharedState = Arc::new(Mutex::new(TrayState::default()));
        let menu = TrayMenu {
            state: Arc::clone(&state),
            update: Arc::new(Notify::new()),
        };
        (menu, state)
    }

    #[test]
    fn test_entries_follow_pane_lifecycle() {
        let (mut menu, state) = menu_and_state();
        menu.add_entry(PaneId(1), "Notepad");
        menu.add_entry(PaneId(2), "Terminal");
        menu.remove_entry(PaneId(1));
        assert_eq!(lock(&state).entries, vec![(PaneId(2), "Terminal".to_string())]);
    }

    #[test]
    fn test_report_sets_tooltip() {
        let (mut menu, state) = menu_and_state();
        menu.report("Configuration saved");
        let (tx, _rx) = commands::channel();
        let tray = AppTray { state, commands: tx };
        assert_eq!(tray.tool_tip().description, "Configuration saved");
    }

    #[test]
    fn test_menu_lists_panes_after_actions() {
        let (mut menu, state) = menu_and_state();
        let (tx, _rx) = commands::channel();
        let tray = AppTray { state, commands: tx };
        assert_eq!(tray.menu().len(), 5);

        menu.add_entry(PaneId(4), "Notepad");
        assert_eq!(tray.menu().len(), 7);
    }

    #[test]
    fn test_pane_entry_posts_activate() {
        let (mut menu, state) = menu_and_state();
        menu.add_entry(PaneId(4), "Notepad");
        let (tx, mut rx) = commands::channel();
        let mut tray = AppTray { state, commands: tx };

        let items = tray.menu();
        let Some(ksni::MenuItem::Standard(entry)) = items.last() else {
            panic!("expected a pane entry");
        };
        (entry.activate)(&mut tray);
        assert!(matches!(rx.try_recv(), Ok(UiCommand::Activate { pane: PaneId(4) })));
    }
}
