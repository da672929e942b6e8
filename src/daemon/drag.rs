//! Press-and-hold drag gesture
//!
//! A pane only moves once the primary button has been held still for the move
//! delay. Any pointer deviation before that cancels the pending move and the
//! gesture ends as a click.

use std::time::{Duration, Instant};

use crate::common::types::Position;

/// Outcome of releasing the primary button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// No movement engaged: activate the target window
    Click,
    /// The pane was moved: persist its new position
    Moved,
}

#[derive(Debug, Default)]
pub struct DragState {
    pressed: bool,
    /// Cursor minus pane origin at press time
    offset: Position,
    /// Cleared when the pointer deviates before the delay elapsed
    pending_since: Option<Instant>,
    moving: bool,
}

impl DragState {
    pub fn press(&mut self, cursor: Position, origin: Position, now: Instant) {
        self.pressed = true;
        self.offset = cursor.offset_from(origin);
        self.pending_since = Some(now);
        self.moving = false;
    }

    /// Returns the unsnapped pane origin once movement is engaged
    pub fn motion(
        &mut self,
        cursor: Position,
        origin: Position,
        now: Instant,
        delay: Duration,
    ) -> Option<Position> {
        if !self.pressed {
            return None;
        }

        let elapsed = self
            .pending_since
            .is_some_and(|since| now.saturating_duration_since(since) >= delay);

        if !(self.moving || elapsed) {
            if cursor.offset_from(origin) != self.offset {
                self.pending_since = None;
            }
            return None;
        }

        self.moving = true;
        Some(cursor.translate(-self.offset.x, -self.offset.y))
    }

    pub fn release(&mut self) -> Release {
        let outcome = if self.moving {
            Release::Moved
        } else {
            Release::Click
        };
        *self = Self::default();
        outcome
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Press time while a move is pending or in progress
    pub fn pending_since(&self) -> Option<Instant> {
        self.pending_since
    }
}

/// Fill fraction of the countdown indicator
pub fn countdown_fraction(elapsed: Duration, delay: Duration) -> f64 {
    if delay.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / delay.as_secs_f64()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn test_no_engagement_before_delay() {
        let start = Instant::now();
        let mut drag = DragState::default();
        drag.press(Position::new(150, 150), Position::new(100, 100), start);

        let moved = drag.motion(
            Position::new(152, 150),
            Position::new(100, 100),
            start + Duration::from_millis(100),
            DELAY,
        );
        assert_eq!(moved, None);
        assert!(drag.pending_since().is_none());

        // Pending move was cancelled, so even a late motion does not engage
        let late = drag.motion(
            Position::new(160, 160),
            Position::new(100, 100),
            start + Duration::from_secs(2),
            DELAY,
        );
        assert_eq!(late, None);
        assert_eq!(drag.release(), Release::Click);
    }

    #[test]
    fn test_still_pointer_keeps_pending() {
        let start = Instant::now();
        let mut drag = DragState::default();
        drag.press(Position::new(150, 150), Position::new(100, 100), start);

        let moved = drag.motion(
            Position::new(150, 150),
            Position::new(100, 100),
            start + Duration::from_millis(100),
            DELAY,
        );
        assert_eq!(moved, None);
        assert_eq!(drag.pending_since(), Some(start));
    }

    #[test]
    fn test_engages_after_delay_regardless_of_offset() {
        let start = Instant::now();
        let mut drag = DragState::default();
        drag.press(Position::new(150, 150), Position::new(100, 100), start);

        let moved = drag.motion(
            Position::new(300, 220),
            Position::new(100, 100),
            start + DELAY,
            DELAY,
        );
        assert_eq!(moved, Some(Position::new(250, 170)));
        assert!(drag.is_moving());

        // Latched: further motion moves immediately
        let next = drag.motion(
            Position::new(310, 220),
            Position::new(250, 170),
            start + DELAY,
            DELAY,
        );
        assert_eq!(next, Some(Position::new(260, 170)));
        assert_eq!(drag.release(), Release::Moved);
        assert!(!drag.is_pressed());
    }

    #[test]
    fn test_motion_without_press_is_ignored() {
        let mut drag = DragState::default();
        let now = Instant::now();
        assert_eq!(
            drag.motion(Position::new(1, 1), Position::new(0, 0), now, Duration::ZERO),
            None
        );
    }

    #[test]
    fn test_countdown_fraction_is_clamped() {
        assert_eq!(countdown_fraction(Duration::ZERO, DELAY), 0.0);
        assert_eq!(countdown_fraction(Duration::from_millis(250), DELAY), 0.5);
        assert_eq!(countdown_fraction(Duration::from_secs(3), DELAY), 1.0);
        assert_eq!(countdown_fraction(Duration::from_millis(1), Duration::ZERO), 1.0);
    }
}
