//! TrueType title text: fontconfig discovery and fontdue rasterization

mod discovery;
mod rendering;

pub use rendering::{RenderedText, TitleFont};
