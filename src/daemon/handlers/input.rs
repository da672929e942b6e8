use std::time::Instant;

use anyhow::Result;
use tracing::{debug, trace};
use x11rb::protocol::xproto::*;

use super::super::dispatcher::EventContext;
use crate::common::types::Position;
use crate::constants::mouse;

fn cursor(root_x: i16, root_y: i16) -> Position {
    Position::new(root_x as i32, root_y as i32)
}

/// Handle ButtonPress events - arm a click or drag on a pane
#[tracing::instrument(skip(ctx), fields(window = event.event))]
pub fn handle_button_press(ctx: &mut EventContext, event: ButtonPressEvent) -> Result<()> {
    debug!(
        x = event.root_x,
        y = event.root_y,
        detail = event.detail,
        "ButtonPress received"
    );
    if event.detail != mouse::BUTTON_LEFT {
        return Ok(());
    }
    ctx.host
        .pointer_pressed(event.event, cursor(event.root_x, event.root_y), Instant::now());
    Ok(())
}

/// Handle ButtonRelease events - activate on click, persist after a drag
#[tracing::instrument(skip(ctx), fields(window = event.event))]
pub fn handle_button_release(ctx: &mut EventContext, event: ButtonReleaseEvent) -> Result<()> {
    debug!(
        x = event.root_x,
        y = event.root_y,
        detail = event.detail,
        "ButtonRelease received"
    );
    if event.detail != mouse::BUTTON_LEFT {
        return Ok(());
    }
    ctx.host.pointer_released(event.event);
    Ok(())
}

/// Handle MotionNotify events - move a held pane with snapping
#[tracing::instrument(skip(ctx), fields(window = event.event))]
pub fn handle_motion_notify(ctx: &mut EventContext, event: MotionNotifyEvent) -> Result<()> {
    trace!(x = event.root_x, y = event.root_y, "MotionNotify received");
    if !event.state.contains(KeyButMask::BUTTON1) {
        return Ok(());
    }
    ctx.host
        .pointer_moved(event.event, cursor(event.root_x, event.root_y), Instant::now());
    Ok(())
}

pub fn handle_enter_notify(ctx: &mut EventContext, event: EnterNotifyEvent) -> Result<()> {
    ctx.host.hover(event.event, true);
    Ok(())
}

pub fn handle_leave_notify(ctx: &mut EventContext, event: LeaveNotifyEvent) -> Result<()> {
    // Grab and ungrab crossings are not pointer movement
    if event.mode != NotifyMode::NORMAL {
        return Ok(());
    }
    ctx.host.hover(event.event, false);
    Ok(())
}
