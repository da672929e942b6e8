//! Window enumeration for the monitor thread

use anyhow::{Context, Result};

use crate::common::types::Rect;
use crate::daemon::backend::{WindowId, WindowSystem};

use super::{X11Context, query};

/// Read-only view of the desktop over a dedicated connection
pub struct X11Desktop {
    ctx: X11Context,
}

impl X11Desktop {
    pub fn connect() -> Result<Self> {
        let ctx = X11Context::connect().context("Failed to open monitor connection")?;
        Ok(Self { ctx })
    }
}

impl WindowSystem for X11Desktop {
    fn top_level_windows(&self) -> Result<Vec<WindowId>> {
        query::get_client_list(&self.ctx.conn, self.ctx.root, &self.ctx.atoms)
    }

    fn window_title(&self, window: WindowId) -> Result<Option<String>> {
        query::window_title(&self.ctx.conn, window, &self.ctx.atoms)
    }

    fn owning_pid(&self, window: WindowId) -> Result<Option<u32>> {
        query::owning_pid(&self.ctx.conn, window, &self.ctx.atoms)
    }

    fn foreground_window(&self) -> Result<Option<WindowId>> {
        query::get_active_window(&self.ctx.conn, self.ctx.root, &self.ctx.atoms)
    }

    fn is_iconic(&self, window: WindowId) -> Result<bool> {
        query::is_window_minimized(&self.ctx.conn, window, &self.ctx.atoms)
    }

    fn window_bounds(&self, window: WindowId) -> Result<Option<Rect>> {
        query::window_bounds(&self.ctx.conn, self.ctx.root, window)
    }
}
