//! Title font lookup via fontconfig

use std::ffi::CString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fontconfig::{Fontconfig, Pattern};
use tracing::{debug, info};

/// Font file fontconfig picked for a family request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontMatch {
    /// Family actually matched, which may be a substitute
    pub family: String,
    pub path: PathBuf,
}

impl FontMatch {
    pub fn is_family(&self, requested: &str) -> bool {
        self.family.eq_ignore_ascii_case(requested)
    }
}

/// Best file for `family`, as fontconfig resolves it
fn match_family(fc: &Fontconfig, family: &str) -> Result<FontMatch> {
    let name = CString::new(family).with_context(|| format!("Invalid font family: {}", family))?;
    let mut pattern = Pattern::new(fc);
    pattern.add_string(fontconfig::FC_FAMILY, &name);
    let matched = pattern.font_match();

    let found = matched
        .get_string(fontconfig::FC_FAMILY)
        .unwrap_or_default()
        .to_string();
    let path = matched
        .filename()
        .map(PathBuf::from)
        .with_context(|| format!("No font file found for '{}'", family))?;
    if !path.exists() {
        anyhow::bail!("Font file '{}' for '{}' does not exist", path.display(), family);
    }

    debug!(requested = family, family = %found, path = %path.display(), "Resolved font via fontconfig");
    Ok(FontMatch { family: found, path })
}

/// First installed candidate family, else whatever serves `fallback`
pub fn select_font(candidates: &[&str], fallback: &str) -> Result<FontMatch> {
    let fc = Fontconfig::new().context("Failed to initialize fontconfig")?;

    for candidate in candidates {
        // fontconfig always answers; a different family means the candidate is missing
        match match_family(&fc, candidate) {
            Ok(found) if found.is_family(candidate) => {
                info!(font = candidate, path = %found.path.display(), "Selected title font");
                return Ok(found);
            }
            Ok(found) => debug!(requested = candidate, substitute = %found.family, "Font not installed"),
            Err(e) => debug!(requested = candidate, error = %e, "Font lookup failed"),
        }
    }

    let found = match_family(&fc, fallback)
        .with_context(|| format!("No TrueType font found. Tried {:?} and '{}'", candidates, fallback))?;
    info!(font = %found.family, path = %found.path.display(), "Selected fallback title font");
    Ok(found)
}
