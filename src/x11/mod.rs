//! X11 collaborators
//!
//! The monitor thread reads the desktop through [`X11Desktop`]; the UI thread
//! owns pane windows and thumbnails through [`X11Panes`]. Each side has its
//! own connection.

mod backend;
mod compositor;
mod context;
mod desktop;
mod font;
pub mod query;
mod surface;
mod title;
mod window;

pub use backend::X11Panes;
pub use context::{CachedAtoms, CachedFormats, X11Context, to_fixed};
pub use desktop::X11Desktop;
