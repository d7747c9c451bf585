//! The published view of a streaming session.

use serde::{Deserialize, Serialize};

use crate::section::Section;

/// What the rendering layer observes after each publish.
///
/// `sections` is populated only after finalization; `partial_sections` only
/// while streaming. `revision` increases by one per publish so a render loop
/// can skip redraws when nothing was published since the last frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSnapshot {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub partial_sections: Vec<Section>,
    /// Heuristic completion estimate, 0–100. UX feedback only.
    pub progress: u8,
    /// Degraded-state flag: repeated decode failures were observed. The
    /// renderer may surface it, but content keeps flowing regardless.
    pub has_error: bool,
    /// Publish counter, strictly increasing within one session.
    pub revision: u64,
}

impl StreamSnapshot {
    /// The sections a renderer should draw right now: final ones once
    /// streaming ended, partial ones before that.
    pub fn visible_sections(&self) -> &[Section] {
        if self.sections.is_empty() {
            &self.partial_sections
        } else {
            &self.sections
        }
    }
}
