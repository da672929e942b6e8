//! Connection context and cached X11 state

use anyhow::{Context, Result};
use tracing::info;
use x11rb::connection::Connection;
use x11rb::protocol::composite::{ConnectionExt as CompositeExt, Redirect};
use x11rb::protocol::damage::ConnectionExt as DamageExt;
use x11rb::protocol::render::{ConnectionExt as RenderExt, Fixed, Pictformat};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::{fixed_point, x11};

/// One connection with the screen facts and atoms every request needs
pub struct X11Context {
    pub conn: RustConnection,
    pub root: Window,
    pub root_depth: u8,
    pub root_visual: Visualid,
    pub root_size: (u16, u16),
    pub atoms: CachedAtoms,
}

impl X11Context {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)
            .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;

        let screen = &conn.setup().roots[screen_num];
        let (root, root_depth, root_visual) = (screen.root, screen.root_depth, screen.root_visual);
        let root_size = (screen.width_in_pixels, screen.height_in_pixels);
        info!(
            screen = screen_num,
            width = root_size.0,
            height = root_size.1,
            "Connected to X11 server"
        );

        let atoms = CachedAtoms::new(&conn).context("Failed to cache X11 atoms at startup")?;

        Ok(Self {
            conn,
            root,
            root_depth,
            root_visual,
            root_size,
            atoms,
        })
    }

    /// Prepare the connection for live thumbnails: Composite keeps off-screen
    /// contents of top-level windows, Damage reports their changes
    pub fn enable_compositing(&self) -> Result<()> {
        self.conn
            .composite_query_version(0, 4)
            .context("Failed to query COMPOSITE extension version")?
            .reply()
            .context("COMPOSITE extension is not available")?;
        self.conn
            .composite_redirect_subwindows(self.root, Redirect::AUTOMATIC)
            .context("Failed to redirect top-level windows")?;
        self.conn
            .damage_query_version(1, 1)
            .context("Failed to query DAMAGE extension version")?
            .reply()
            .context("DAMAGE extension is not available")?;
        self.conn
            .flush()
            .context("Failed to flush X11 connection after compositing setup")?;
        info!("Composite and Damage extensions ready");
        Ok(())
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .context(format!("Failed to intern {} atom", name))?
        .reply()
        .context(format!("Failed to get reply for {} atom", name))?
        .atom)
}

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub wm_name: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub net_wm_pid: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_window_opacity: Atom,
    pub wm_class: Atom,
    pub net_active_window: Atom,
    pub wm_state: Atom,
    pub net_client_list: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            wm_name: intern(conn, "WM_NAME")?,
            net_wm_name: intern(conn, "_NET_WM_NAME")?,
            utf8_string: intern(conn, "UTF8_STRING")?,
            net_wm_pid: intern(conn, "_NET_WM_PID")?,
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_hidden: intern(conn, "_NET_WM_STATE_HIDDEN")?,
            net_wm_state_above: intern(conn, "_NET_WM_STATE_ABOVE")?,
            net_wm_window_opacity: intern(conn, "_NET_WM_WINDOW_OPACITY")?,
            wm_class: intern(conn, "WM_CLASS")?,
            net_active_window: intern(conn, "_NET_ACTIVE_WINDOW")?,
            wm_state: intern(conn, "WM_STATE")?,
            net_client_list: intern(conn, "_NET_CLIENT_LIST")?,
        })
    }
}

/// Pre-cached picture formats to avoid repeated expensive queries
#[derive(Debug)]
pub struct CachedFormats {
    pub rgb: Pictformat,
    pub argb: Pictformat,
}

impl CachedFormats {
    pub fn new(ctx: &X11Context) -> Result<Self> {
        let formats_reply = ctx
            .conn
            .render_query_pict_formats()
            .context("Failed to query RENDER picture formats")?
            .reply()
            .context("Failed to get RENDER formats reply")?;

        let rgb = formats_reply
            .formats
            .iter()
            .find(|f| f.depth == ctx.root_depth && f.direct.alpha_mask == 0)
            .ok_or_else(|| anyhow::anyhow!("No RGB format found for depth {}", ctx.root_depth))?
            .id;

        let argb = formats_reply
            .formats
            .iter()
            .find(|f| f.depth == x11::ARGB_DEPTH && f.direct.alpha_mask != 0)
            .ok_or_else(|| anyhow::anyhow!("No ARGB format found for depth {}", x11::ARGB_DEPTH))?
            .id;

        Ok(Self { rgb, argb })
    }

    /// Format for a drawable of the given depth
    pub fn for_depth(&self, depth: u8) -> Pictformat {
        if depth == x11::ARGB_DEPTH {
            self.argb
        } else {
            self.rgb
        }
    }
}

/// Convert floating point to X11 fixed-point format
pub fn to_fixed(v: f32) -> Fixed {
    (v * fixed_point::MULTIPLIER).round() as Fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(1.0), 65536);
        assert_eq!(to_fixed(0.5), 32768);
        assert_eq!(to_fixed(2.0), 131072);
    }
}
