use anyhow::{Context, Result};
use tracing::trace;
use x11rb::protocol::xproto::ExposeEvent;

use super::super::dispatcher::EventContext;

/// Handle DamageNotify events - redraw the thumbnail mirroring the source
pub fn handle_damage_notify(
    ctx: &mut EventContext,
    event: x11rb::protocol::damage::NotifyEvent,
) -> Result<()> {
    trace!(damage = event.damage, "DamageNotify received");
    ctx.host
        .backend_mut()
        .refresh_damage(event.damage)
        .context(format!(
            "Failed to update thumbnail for damage event (damage={})",
            event.damage
        ))
}

/// Handle Expose events - repaint border and thumbnail once per burst
#[tracing::instrument(skip(ctx), fields(window = event.window))]
pub fn handle_expose(ctx: &mut EventContext, event: ExposeEvent) -> Result<()> {
    if event.count == 0 {
        ctx.host.repaint(event.window);
    }
    Ok(())
}
