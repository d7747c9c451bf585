//! Decoder for the tagged-chunk wire format (Format A).
//!
//! The answer service concatenates elements of the form:
//!
//! ```text
//! <chunk type="intro">Welcome!</chunk>
//! <chunk type="shop">NAME: Foo
//! CATEGORY: Shoes</chunk>
//! ```
//!
//! A chunk becomes eligible only once its closing tag has arrived; a trailing
//! still-open chunk is left alone until more text lands. The full matched
//! substring of every eligible chunk is remembered in the caller's seen-set,
//! which makes rescanning the whole buffer from index 0 on every tick safe
//! and cheap.

use std::collections::HashSet;

use atrio_types::{
    OpeningHoursInfo, ParkingFee, ParkingInfo, RegularHours, SectionItem, SpecialHours,
};

const CHUNK_OPEN: &str = "<chunk type=\"";
const CHUNK_CLOSE: &str = "</chunk>";

/// One complete chunk element extracted from the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    /// The raw `type` attribute value, untrimmed of case.
    pub tag: String,
    /// The element body with surrounding whitespace removed.
    pub body: String,
}

/// Extracts chunks not seen before, in buffer order.
///
/// Every complete element is inserted into `seen` (keyed by its full matched
/// substring) whether or not its type is recognized downstream, so repeated
/// full-buffer rescans never reprocess it. Incomplete trailing elements are
/// not touched at all.
pub fn decode_new_chunks(buffer: &str, seen: &mut HashSet<String>) -> Vec<ChunkRecord> {
    let mut records = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = buffer[cursor..].find(CHUNK_OPEN) {
        let open_start = cursor + rel;
        let tag_start = open_start + CHUNK_OPEN.len();

        // The attribute value must be closed, and the open tag terminated.
        let Some(quote_rel) = buffer[tag_start..].find('"') else {
            break;
        };
        let tag_end = tag_start + quote_rel;
        let Some(gt_rel) = buffer[tag_end..].find('>') else {
            break;
        };
        let body_start = tag_end + gt_rel + 1;

        // No closing tag yet: the element is still streaming in.
        let Some(close_rel) = buffer[body_start..].find(CHUNK_CLOSE) else {
            break;
        };
        let body_end = body_start + close_rel;
        let element_end = body_end + CHUNK_CLOSE.len();

        let element = &buffer[open_start..element_end];
        if seen.insert(element.to_string()) {
            records.push(ChunkRecord {
                tag: buffer[tag_start..tag_end].trim().to_string(),
                body: buffer[body_start..body_end].trim().to_string(),
            });
        }
        cursor = element_end;
    }

    records
}

/// Decodes a `KEY: value`-per-line body into a list item.
///
/// Keys are matched case-insensitively; unknown keys are ignored; `logo` and
/// `image` both land in `image_url`. Returns `None` when no usable `name`
/// line is present: an item without its identity key is dropped entirely.
pub fn decode_item_body(body: &str) -> Option<SectionItem> {
    let mut item = SectionItem::default();

    for line in body.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "name" => item.name = value.to_string(),
            "category" => item.category = Some(value.to_string()),
            "floor" => item.floor = Some(value.to_string()),
            "logo" | "image" => item.image_url = Some(value.to_string()),
            "description" => item.description = Some(value.to_string()),
            "opening" => item.opening = Some(value.to_string()),
            "date" => item.date = Some(value.to_string()),
            _ => {}
        }
    }

    if item.name.is_empty() { None } else { Some(item) }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ParkingList {
    None,
    Fees,
    Notes,
}

/// Decodes a parking body using the header+list mini-grammar:
///
/// ```text
/// FEES:
/// - DURATION: 1 hour | PRICE: 2.50 €
/// NOTES:
/// - First 30 minutes free
/// ```
pub fn decode_parking_body(body: &str) -> ParkingInfo {
    let mut info = ParkingInfo::default();
    let mut active = ParkingList::None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let upper = line.to_ascii_uppercase();
        if upper.starts_with("FEES:") {
            active = ParkingList::Fees;
            continue;
        }
        if upper.starts_with("NOTES:") {
            active = ParkingList::Notes;
            continue;
        }
        let Some(entry) = line.strip_prefix('-') else {
            continue;
        };
        let entry = entry.trim();
        match active {
            ParkingList::Fees => {
                let mut fee = ParkingFee::default();
                for field in entry.split('|') {
                    let Some((key, value)) = field.split_once(':') else {
                        continue;
                    };
                    match key.trim().to_ascii_lowercase().as_str() {
                        "duration" => fee.duration = value.trim().to_string(),
                        "price" => fee.price = value.trim().to_string(),
                        _ => {}
                    }
                }
                if !fee.duration.is_empty() || !fee.price.is_empty() {
                    info.fees.push(fee);
                }
            }
            ParkingList::Notes => {
                if !entry.is_empty() {
                    info.notes.push(entry.to_string());
                }
            }
            ParkingList::None => {}
        }
    }

    info
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HoursList {
    None,
    Regular,
    Special,
}

/// Decodes an opening-hours body:
///
/// ```text
/// REGULAR:
/// - DAY: Mon-Sat | HOURS: 10:00-20:00
/// SPECIAL:
/// - DATE: 2025-12-24 | HOURS: 10:00-14:00 | NOTE: Christmas Eve
/// ```
pub fn decode_hours_body(body: &str) -> OpeningHoursInfo {
    let mut info = OpeningHoursInfo::default();
    let mut active = HoursList::None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let upper = line.to_ascii_uppercase();
        if upper.starts_with("REGULAR:") {
            active = HoursList::Regular;
            continue;
        }
        if upper.starts_with("SPECIAL:") {
            active = HoursList::Special;
            continue;
        }
        let Some(entry) = line.strip_prefix('-') else {
            continue;
        };

        let mut day = String::new();
        let mut date = String::new();
        let mut hours = String::new();
        let mut note = None;
        for field in entry.split('|') {
            let Some((key, value)) = field.split_once(':') else {
                continue;
            };
            // HOURS values contain colons themselves ("10:00-20:00"), which
            // is why only the first colon splits key from value.
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "day" => day = value.to_string(),
                "date" => date = value.to_string(),
                "hours" => hours = value.to_string(),
                "note" => note = Some(value.to_string()),
                _ => {}
            }
        }

        match active {
            HoursList::Regular => {
                if !day.is_empty() || !hours.is_empty() {
                    info.regular.push(RegularHours {
                        day,
                        hours,
                    });
                }
            }
            HoursList::Special => {
                if !date.is_empty() || !hours.is_empty() {
                    info.special.push(SpecialHours {
                        date,
                        hours,
                        note,
                    });
                }
            }
            HoursList::None => {}
        }
    }

    info
}
