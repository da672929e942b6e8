//! Pane engine: window monitor, pane host and the UI event loop

pub mod backend;
pub mod border;
pub mod commands;
mod countdown;
mod dispatcher;
pub mod drag;
mod handlers;
pub mod host;
pub mod matcher;
pub mod monitor;
mod pane;
pub mod session;
pub mod snapping;

use std::ops::ControlFlow;
use std::os::fd::AsRawFd;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::unix::AsyncFd;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use x11rb::connection::Connection;

use crate::tray::TrayMenu;
use crate::x11::{X11Desktop, X11Panes};

use commands::{CommandReceiver, CommandSender, UiCommand};
use dispatcher::{EventContext, handle_event};
use host::PaneHost;
use monitor::Monitor;
use session::Session;

pub type UiHost = PaneHost<X11Panes, TrayMenu>;

/// Runs the window monitor on its own thread and connection
pub fn spawn_monitor(session: Arc<Session>, commands: CommandSender) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Failed to build Tokio runtime for monitor");
                return;
            }
        };

        let desktop = match X11Desktop::connect() {
            Ok(desktop) => desktop,
            Err(e) => {
                error!(error = format!("{:#}", e), "Window monitor could not start");
                session.request_shutdown();
                let _ = commands.send(UiCommand::Exit);
                return;
            }
        };

        let monitor = Monitor::new(desktop, session, commands).with_own_pid(std::process::id());
        runtime.block_on(monitor.run());
    })
}

/// UI thread main loop: X11 events, marshaled commands and termination signals
pub async fn run(session: Arc<Session>, menu: TrayMenu, commands: CommandSender, mut rx: CommandReceiver) -> Result<()> {
    let backend = X11Panes::connect().context("Failed to initialize X11")?;
    let mut host = PaneHost::new(backend, menu, Arc::clone(&session), commands);

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    // Wrap X11 connection in AsyncFd to wake up exactly when X11 has data
    let x11_fd = AsyncFd::new(host.backend_mut().connection().stream().as_raw_fd())
        .context("Failed to create AsyncFd for X11 connection")?;

    info!("Pane host running");
    loop {
        // Drain all pending X11 events without blocking
        while let Some(event) = host
            .backend_mut()
            .connection()
            .poll_for_event()
            .context("Failed to poll for X11 event")?
        {
            let mut ctx = EventContext { host: &mut host };
            let _ = handle_event(&mut ctx, event)
                .inspect_err(|err| error!(error = ?err, "Event handling error"));
        }
        let _ = host.backend_mut().connection().flush();

        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else {
                    info!("Command channel closed");
                    break;
                };
                if host.handle(command) == ControlFlow::Break(()) {
                    break;
                }
            }
            ready = x11_fd.readable() => {
                let mut guard = ready.context("Failed to wait for X11 connection")?;
                guard.clear_ready();
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down");
                host.exit();
                break;
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down");
                host.exit();
                break;
            }
        }
    }

    let _ = host.backend_mut().connection().flush();
    Ok(())
}
