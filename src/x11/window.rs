//! Requests to the window manager about client windows
//!
//! Both operations are EWMH client messages sent to the root window, so the
//! window manager applies focus and state policy itself.

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;

use super::CachedAtoms;

/// A 32-bit EWMH request about `window`
fn wm_request(window: Window, message_type: Atom, data: [u32; 5]) -> ClientMessageEvent {
    ClientMessageEvent {
        response_type: CLIENT_MESSAGE_EVENT,
        format: 32,
        sequence: 0,
        window,
        type_: message_type,
        data: ClientMessageData::from(data),
    }
}

fn send_wm_request(conn: &RustConnection, root: Window, request: ClientMessageEvent) -> Result<()> {
    let window = request.window;
    conn.send_event(
        false,
        root,
        EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
        request,
    )
    .context(format!("Failed to send client message for window {}", window))?;
    Ok(())
}

/// Raise `window` and ask the window manager to focus it
pub fn activate_window(conn: &RustConnection, root: Window, atoms: &CachedAtoms, window: Window) -> Result<()> {
    conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
        .context(format!("Failed to raise window {}", window))?;
    send_wm_request(
        conn,
        root,
        wm_request(
            window,
            atoms.net_active_window,
            [x11::ACTIVE_WINDOW_SOURCE_PAGER, x11rb::CURRENT_TIME, 0, 0, 0],
        ),
    )?;
    conn.flush().context("Failed to flush after activating window")?;
    Ok(())
}

/// Un-minimize `window`: drop `_NET_WM_STATE_HIDDEN`, then map it
pub fn restore_window(conn: &RustConnection, root: Window, atoms: &CachedAtoms, window: Window) -> Result<()> {
    send_wm_request(
        conn,
        root,
        wm_request(
            window,
            atoms.net_wm_state,
            [
                x11::NET_WM_STATE_REMOVE,
                atoms.net_wm_state_hidden,
                0,
                x11::ACTIVE_WINDOW_SOURCE_PAGER,
                0,
            ],
        ),
    )?;
    // ICCCM: mapping an iconic client asks the window manager to normalize it
    conn.map_window(window)
        .context(format!("Failed to map window {}", window))?;
    conn.flush().context("Failed to flush after restoring window")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wm_request_is_32_bit_message() {
        let request = wm_request(0x400001, 300, [2, 0, 0, 0, 0]);
        assert_eq!(request.response_type, CLIENT_MESSAGE_EVENT);
        assert_eq!(request.format, 32);
        assert_eq!(request.window, 0x400001);
        assert_eq!(request.type_, 300);
        assert_eq!(request.data.as_data32(), [2, 0, 0, 0, 0]);
    }
}
