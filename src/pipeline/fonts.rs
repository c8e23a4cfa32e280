//! CJK font selection.
//!
//! With [`FontSelection::Auto`] fontconfig is asked which Japanese-capable
//! families are installed (`fc-list :lang=ja family`) and the best preset is
//! picked: Noto CJK over IPA over the DejaVu fallback. Detection is only
//! attempted for engines that load system fonts; pdflatex never gets font
//! variables.

use crate::config::{Engine, FontPreset, FontSelection, FC_LIST};
use crate::pipeline::invocation::Invocation;
use crate::pipeline::runner::ProcessRunner;
use tracing::{debug, info, warn};

/// Pick a preset from an `fc-list :lang=ja` listing.
///
/// Returns `None` when the listing names no font at all.
pub fn classify_font_list(listing: &str) -> Option<FontPreset> {
    if listing.trim().is_empty() {
        None
    } else if listing.contains("Noto") {
        Some(FontPreset::NotoCjk)
    } else if listing.contains("IPA") {
        Some(FontPreset::Ipa)
    } else {
        Some(FontPreset::Fallback)
    }
}

/// Ask fontconfig for installed Japanese fonts.
///
/// `None` means fontconfig is unavailable or lists no Japanese font.
pub async fn detect_fonts<R: ProcessRunner>(runner: &R) -> Option<FontPreset> {
    let invocation = Invocation::new(FC_LIST, [":lang=ja", "family"]);
    match runner.run(&invocation).await {
        Ok(outcome) if outcome.success() => {
            let preset = classify_font_list(&outcome.stdout);
            debug!("fontconfig Japanese fonts → {preset:?}");
            preset
        }
        Ok(outcome) => {
            debug!("fc-list exited with {:?}", outcome.exit);
            None
        }
        Err(e) => {
            debug!("fc-list unavailable: {e}");
            None
        }
    }
}

/// Resolve the preset to inject for `engine`.
pub async fn resolve_fonts<R: ProcessRunner>(
    selection: FontSelection,
    engine: Engine,
    runner: &R,
) -> Option<FontPreset> {
    if !engine.supports_system_fonts() {
        debug!("{engine} does not load system fonts; skipping CJK font variables");
        return None;
    }
    match selection {
        FontSelection::Disabled => None,
        FontSelection::Preset(p) => Some(p),
        FontSelection::Auto => match detect_fonts(runner).await {
            Some(p) => {
                info!("Using {p} fonts for Japanese text");
                Some(p)
            }
            None => {
                warn!(
                    "No Japanese fonts detected; falling back to {}. \
                     Install fonts-noto-cjk for proper rendering.",
                    FontPreset::Fallback
                );
                Some(FontPreset::Fallback)
            }
        },
    }
}
