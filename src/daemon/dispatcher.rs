//! X11 event processing for the pane host
//!
//! Dispatcher that routes events from the UI connection to specialized handlers.

use anyhow::Result;
use x11rb::protocol::Event;

use super::UiHost;
use super::handlers;

/// Context bundle for event handlers
pub struct EventContext<'a> {
    pub host: &'a mut UiHost,
}

pub fn handle_event(ctx: &mut EventContext, event: Event) -> Result<()> {
    match event {
        Event::DamageNotify(event) => handlers::window::handle_damage_notify(ctx, event),
        Event::Expose(event) => handlers::window::handle_expose(ctx, event),
        Event::ButtonPress(event) => handlers::input::handle_button_press(ctx, event),
        Event::ButtonRelease(event) => handlers::input::handle_button_release(ctx, event),
        Event::MotionNotify(event) => handlers::input::handle_motion_notify(ctx, event),
        Event::EnterNotify(event) => handlers::input::handle_enter_notify(ctx, event),
        Event::LeaveNotify(event) => handlers::input::handle_leave_notify(ctx, event),
        Event::Error(err) => {
            tracing::debug!(error = ?err, "X11 error event");
            Ok(())
        }
        _ => Ok(()),
    }
}
