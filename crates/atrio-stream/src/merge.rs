//! Merges freshly built sections into the running section list.
//!
//! Merge rules per kind:
//! - content-only (intro/tip/follow-up): last write wins, replaced in place;
//! - list kinds (shops/restaurants/events): new items appended, items whose
//!   `name` already exists are dropped (the existing item wins), so a list
//!   never shrinks and never flickers;
//! - structured kinds (parking/opening hours): replaced wholesale. The wire
//!   always re-sends the complete block, so sub-list merging buys nothing.
//!
//! Sections untouched by an update keep their position and are not rebuilt.

use atrio_types::Section;

/// Merges `incoming` into `existing` according to the per-kind rules.
/// First appearance of a kind appends at the end, preserving arrival order.
pub fn merge_sections(existing: &mut Vec<Section>, incoming: Vec<Section>) {
    for section in incoming {
        match existing.iter_mut().find(|s| s.kind == section.kind) {
            None => existing.push(section),
            Some(slot) => {
                if section.kind.is_list() {
                    merge_items(slot, section);
                } else {
                    // Content and structured kinds: newest value replaces.
                    *slot = section;
                }
            }
        }
    }
}

fn merge_items(slot: &mut Section, incoming: Section) {
    let current = slot.items.get_or_insert_with(Vec::new);
    for item in incoming.items.unwrap_or_default() {
        if !current.iter().any(|existing| existing.name == item.name) {
            current.push(item);
        }
    }
    slot.is_partial = incoming.is_partial;
}
