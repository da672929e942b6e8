//! X11 window state queries

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::cookie::Cookie;
use x11rb::errors::ReplyError;
use x11rb::protocol::ErrorKind;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use super::CachedAtoms;
use crate::common::types::{Rect, saturate_u16};
use crate::constants::x11;

/// Reply of a per-window request, `None` when the window is already gone
fn window_reply<R>(cookie: Cookie<'_, RustConnection, R>, window: Window, what: &str) -> Result<Option<R>>
where
    R: x11rb::x11_utils::TryParse,
{
    match cookie.reply() {
        Ok(reply) => Ok(Some(reply)),
        Err(ReplyError::X11Error(err))
            if matches!(err.error_kind, ErrorKind::Window | ErrorKind::Drawable) =>
        {
            debug!(window = window, "Window destroyed before {} reply", what);
            Ok(None)
        }
        Err(err) => Err(err).context(format!("Failed to get {} reply for window {}", what, window)),
    }
}

fn text_property(
    conn: &RustConnection,
    window: Window,
    property: Atom,
    type_: impl Into<Atom>,
    what: &str,
) -> Result<Option<String>> {
    let cookie = conn
        .get_property(false, window, property, type_, 0, 1024)
        .context(format!("Failed to query {} property for window {}", what, window))?;
    Ok(window_reply(cookie, window, what)?
        .filter(|prop| !prop.value.is_empty())
        .map(|prop| String::from_utf8_lossy(&prop.value).into_owned()))
}

/// Title of a window: `_NET_WM_NAME` when set, `WM_NAME` otherwise
pub fn window_title(conn: &RustConnection, window: Window, atoms: &CachedAtoms) -> Result<Option<String>> {
    if let Some(title) = text_property(conn, window, atoms.net_wm_name, atoms.utf8_string, "_NET_WM_NAME")? {
        return Ok(Some(title));
    }
    text_property(conn, window, atoms.wm_name, AtomEnum::STRING, "WM_NAME")
}

/// Process id advertised through `_NET_WM_PID`
pub fn owning_pid(conn: &RustConnection, window: Window, atoms: &CachedAtoms) -> Result<Option<u32>> {
    let cookie = conn
        .get_property(false, window, atoms.net_wm_pid, AtomEnum::CARDINAL, 0, 1)
        .context(format!("Failed to query _NET_WM_PID for window {}", window))?;
    Ok(window_reply(cookie, window, "_NET_WM_PID")?.and_then(|prop| prop.value32()?.next()))
}

/// Check whether the given window is currently minimized/iconified
pub fn is_window_minimized(conn: &RustConnection, window: Window, atoms: &CachedAtoms) -> Result<bool> {
    let net_state_cookie = conn
        .get_property(false, window, atoms.net_wm_state, AtomEnum::ATOM, 0, 1024)
        .context(format!("Failed to query _NET_WM_STATE for window {}", window))?;
    match window_reply(net_state_cookie, window, "_NET_WM_STATE")? {
        Some(reply) => {
            if let Some(mut values) = reply.value32()
                && values.any(|state| state == atoms.net_wm_state_hidden)
            {
                return Ok(true);
            }
        }
        None => return Ok(false),
    }

    // ICCCM WM_STATE for window managers without EWMH hidden state
    let wm_state_cookie = conn
        .get_property(false, window, atoms.wm_state, atoms.wm_state, 0, 2)
        .context(format!("Failed to query WM_STATE for window {}", window))?;
    Ok(window_reply(wm_state_cookie, window, "WM_STATE")?
        .and_then(|reply| reply.value32()?.next())
        .is_some_and(|state| state == x11::ICONIC_STATE))
}

/// Get the currently focused window ID, if any
pub fn get_active_window(conn: &RustConnection, root: Window, atoms: &CachedAtoms) -> Result<Option<Window>> {
    let active_window_prop = conn
        .get_property(false, root, atoms.net_active_window, AtomEnum::WINDOW, 0, 1)
        .context("Failed to query _NET_ACTIVE_WINDOW property")?
        .reply()
        .context("Failed to get reply for _NET_ACTIVE_WINDOW query")?;

    Ok(active_window_prop
        .value32()
        .and_then(|mut values| values.next())
        .filter(|window| *window != x11rb::NONE))
}

/// Get the list of client windows from _NET_CLIENT_LIST property on root window
pub fn get_client_list(conn: &RustConnection, root: Window, atoms: &CachedAtoms) -> Result<Vec<Window>> {
    let prop = conn
        .get_property(false, root, atoms.net_client_list, AtomEnum::WINDOW, 0, u32::MAX)
        .context("Failed to query _NET_CLIENT_LIST property")?
        .reply()
        .context("Failed to get window list from X11 server")?;

    let windows: Vec<Window> = prop
        .value32()
        .ok_or_else(|| anyhow::anyhow!("Invalid return from _NET_CLIENT_LIST"))?
        .collect();

    Ok(windows)
}

/// Bounds of a window in root coordinates
pub fn window_bounds(conn: &RustConnection, root: Window, window: Window) -> Result<Option<Rect>> {
    let geometry = conn
        .get_geometry(window)
        .context(format!("Failed to send geometry query for window {}", window))?;
    let Some(geometry) = window_reply(geometry, window, "geometry")? else {
        return Ok(None);
    };

    let translated = conn
        .translate_coordinates(window, root, 0, 0)
        .context(format!("Failed to translate coordinates of window {}", window))?;
    let Some(translated) = window_reply(translated, window, "translate_coordinates")? else {
        return Ok(None);
    };

    Ok(Some(Rect::new(
        translated.dst_x as i32,
        translated.dst_y as i32,
        geometry.width as u32,
        geometry.height as u32,
    )))
}

/// Frame window the window manager reparented `window` into, if any
pub fn frame_window(conn: &RustConnection, root: Window, window: Window) -> Result<Option<Window>> {
    let tree = conn
        .query_tree(window)
        .context(format!("Failed to send query_tree for window {}", window))?;
    Ok(window_reply(tree, window, "query_tree")?
        .map(|reply| reply.parent)
        .filter(|parent| *parent != root && *parent != x11rb::NONE))
}

/// Size and depth of a drawable, `None` once it is gone
pub fn drawable_size(conn: &RustConnection, window: Window) -> Result<Option<(u16, u16, u8)>> {
    let geometry = conn
        .get_geometry(window)
        .context(format!("Failed to send geometry query for window {}", window))?;
    Ok(window_reply(geometry, window, "geometry")?.map(|g| (g.width, g.height, g.depth)))
}

/// Clamp a configured size into what X11 requests accept
pub fn request_size(width: u32, height: u32) -> (u16, u16) {
    (saturate_u16(width), saturate_u16(height))
}
