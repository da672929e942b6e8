//! Pane edge snapping
//!
//! Magnetizes a dragged pane to the edges of its screen, then to the other
//! open panes. All rectangles are outer pane bounds in root coordinates.

use crate::common::types::{Position, Rect};

/// Edges of `dragged` within the snap distance of `reference`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Magnetized {
    left: bool,
    right: bool,
    top: bool,
    bottom: bool,
}

/// Left/right and top/bottom are each exclusive; left and top win ties.
///
/// `left_ref` is compared with the dragged left edge, `right_ref` with the
/// dragged right edge, and likewise for the vertical pair.
fn magnetized(
    dragged: &Rect,
    left_ref: i32,
    right_ref: i32,
    top_ref: i32,
    bottom_ref: i32,
    distance: i32,
) -> Magnetized {
    let near = |a: i32, b: i32| (i64::from(a) - i64::from(b)).abs() <= i64::from(distance);

    let left = near(left_ref, dragged.left());
    let right = !left && near(right_ref, dragged.right());
    let top = near(top_ref, dragged.top());
    let bottom = !top && near(bottom_ref, dragged.bottom());

    Magnetized {
        left,
        right,
        top,
        bottom,
    }
}

fn width(rect: &Rect) -> i32 {
    i32::try_from(rect.width).unwrap_or(i32::MAX)
}

fn height(rect: &Rect) -> i32 {
    i32::try_from(rect.height).unwrap_or(i32::MAX)
}

/// Snap `candidate` to `screen`, then to each of `others` in order.
///
/// Against a pane, abutting edges are checked on the candidate position. A
/// horizontal snap is followed by a top/bottom alignment on the updated
/// position, then the vertical snap and its left/right alignment run the same
/// way. When several panes qualify the last one wins.
pub fn magnetize(candidate: Rect, screen: Option<Rect>, others: &[Rect], distance: i32) -> Position {
    let mut rect = candidate;
    let (w, h) = (width(&rect), height(&rect));

    if let Some(screen) = screen {
        let edges = magnetized(
            &rect,
            screen.left(),
            screen.right(),
            screen.top(),
            screen.bottom(),
            distance,
        );
        if edges.left {
            rect.x = screen.left();
        } else if edges.right {
            rect.x = screen.right() - w;
        }
        if edges.top {
            rect.y = screen.top();
        } else if edges.bottom {
            rect.y = screen.bottom() - h;
        }
    }

    for other in others {
        let abutting = magnetized(
            &rect,
            other.right(),
            other.left(),
            other.bottom(),
            other.top(),
            distance,
        );

        if abutting.left || abutting.right {
            rect.x = if abutting.left {
                other.right()
            } else {
                other.left() - w
            };
            let aligned = magnetized(
                &rect,
                other.left(),
                other.right(),
                other.top(),
                other.bottom(),
                distance,
            );
            if aligned.top {
                rect.y = other.top();
            } else if aligned.bottom {
                rect.y = other.bottom() - h;
            }
        }

        if abutting.top || abutting.bottom {
            rect.y = if abutting.top {
                other.bottom()
            } else {
                other.top() - h
            };
            let aligned = magnetized(
                &rect,
                other.left(),
                other.right(),
                other.top(),
                other.bottom(),
                distance,
            );
            if aligned.left {
                rect.x = other.left();
            } else if aligned.right {
                rect.x = other.right() - w;
            }
        }
    }

    rect.origin()
}
