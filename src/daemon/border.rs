//! Border mode state machine

use crate::common::color::Argb;
use crate::config::BorderColors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    Active,
    Inactive,
    Minimized,
}

impl BorderMode {
    /// Foreground wins over iconic
    pub fn from_status(is_foreground: bool, is_iconic: bool) -> Self {
        if is_foreground {
            BorderMode::Active
        } else if is_iconic {
            BorderMode::Minimized
        } else {
            BorderMode::Inactive
        }
    }

    pub fn color(self, colors: &BorderColors) -> Argb {
        match self {
            BorderMode::Active => colors.active,
            BorderMode::Inactive => colors.inactive,
            BorderMode::Minimized => colors.minimized,
        }
    }
}

/// Current mode of one pane's border; panes start `Inactive`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderState {
    mode: BorderMode,
}

impl Default for BorderState {
    fn default() -> Self {
        Self {
            mode: BorderMode::Inactive,
        }
    }
}

impl BorderState {
    pub fn mode(&self) -> BorderMode {
        self.mode
    }

    /// Returns true when the mode changed and the border needs a repaint
    pub fn transition(&mut self, next: BorderMode) -> bool {
        if self.mode == next {
            return false;
        }
        self.mode = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_status() {
        assert_eq!(BorderMode::from_status(true, false), BorderMode::Active);
        assert_eq!(BorderMode::from_status(true, true), BorderMode::Active);
        assert_eq!(BorderMode::from_status(false, true), BorderMode::Minimized);
        assert_eq!(BorderMode::from_status(false, false), BorderMode::Inactive);
    }

    #[test]
    fn test_transition_only_reports_changes() {
        let mut state = BorderState::default();
        assert_eq!(state.mode(), BorderMode::Inactive);
        assert!(!state.transition(BorderMode::Inactive));
        assert!(state.transition(BorderMode::Active));
        assert!(!state.transition(BorderMode::Active));
        assert!(state.transition(BorderMode::Minimized));
        assert_eq!(state.mode(), BorderMode::Minimized);
    }

    #[test]
    fn test_mode_color() {
        let colors = BorderColors {
            active: Argb::new(255, 0, 255, 0),
            inactive: Argb::new(10, 0, 0, 0),
            minimized: Argb::new(255, 255, 0, 0),
        };
        assert_eq!(BorderMode::Active.color(&colors), colors.active);
        assert_eq!(BorderMode::Inactive.color(&colors), colors.inactive);
        assert_eq!(BorderMode::Minimized.color(&colors), colors.minimized);
    }
}
