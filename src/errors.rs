//! Engine error kinds
//!
//! Collaborator plumbing uses `anyhow`; the failures the engine reacts to
//! differently are typed here so callers can match on them.

use std::path::PathBuf;

use x11rb::protocol::xproto::Window;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A rule's title does not compile as a regular expression.
    #[error("Rule '{title}' has an invalid title pattern: {source}")]
    ConfigurationRule {
        title: String,
        #[source]
        source: regex::Error,
    },

    /// Enumerating top-level windows kept failing within one tick.
    #[error("Window enumeration failed after {attempts} attempt(s): {reason}")]
    EnumerationTransient { attempts: usize, reason: String },

    /// The compositor refused to mirror a window into a pane.
    #[error("Failed to register thumbnail for window {window}: {reason}")]
    CompositorRegistration { window: Window, reason: String },

    /// Writing the configuration document failed.
    #[error("Failed to persist configuration to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
