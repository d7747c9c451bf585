//! Builds canonical [`Section`]s from decoded records.
//!
//! One builder serves both wire formats: a [`ChunkRecord`] maps to at most
//! one section, a repaired JSON object maps to zero or one section per known
//! top-level key. Field-level problems (a shop without a name, a fee row of
//! the wrong shape) drop that field, never the whole record.

use atrio_types::{
    OpeningHoursInfo, ParkingFee, ParkingInfo, RegularHours, Section, SectionData, SectionItem,
    SectionKind, SpecialHours,
};
use serde_json::Value;

use crate::chunk::{ChunkRecord, decode_hours_body, decode_item_body, decode_parking_body};
use crate::failure::StreamFailure;

/// Builds a section from one complete chunk element.
///
/// Fails with [`StreamFailure::Decode`] for unknown tags and with
/// [`StreamFailure::Build`] for recognized tags whose body yields nothing;
/// both are counted by the session, neither aborts the turn.
pub fn build_from_chunk(record: &ChunkRecord) -> Result<Section, StreamFailure> {
    match record.tag.as_str() {
        "intro" => Ok(Section::content(
            SectionKind::Intro,
            normalize_breaks(&record.body),
        )),
        "tip" => Ok(Section::content(SectionKind::Tip, record.body.clone())),
        "followUp" | "followup" | "follow_up" => {
            Ok(Section::content(SectionKind::FollowUp, record.body.clone()))
        }
        "shop" => item_section(SectionKind::Shops, record),
        "restaurant" => item_section(SectionKind::Restaurants, record),
        "event" => item_section(SectionKind::Events, record),
        "parking" => {
            let info = decode_parking_body(&record.body);
            if info.is_empty() {
                Err(StreamFailure::Build("parking body had no rows".to_string()))
            } else {
                Ok(Section::structured(
                    SectionKind::Parking,
                    SectionData::Parking(info),
                ))
            }
        }
        "openingHours" | "openinghours" | "opening_hours" | "hours" => {
            let info = decode_hours_body(&record.body);
            if info.is_empty() {
                Err(StreamFailure::Build("hours body had no rows".to_string()))
            } else {
                Ok(Section::structured(
                    SectionKind::OpeningHours,
                    SectionData::OpeningHours(info),
                ))
            }
        }
        other => Err(StreamFailure::Decode(format!("unknown chunk type {other:?}"))),
    }
}

fn item_section(kind: SectionKind, record: &ChunkRecord) -> Result<Section, StreamFailure> {
    match decode_item_body(&record.body) {
        Some(item) => Ok(Section::list(kind, vec![item])),
        None => Err(StreamFailure::Build(format!(
            "{} chunk without a name",
            record.tag
        ))),
    }
}

/// The JSON keys the builder understands, in display order.
const JSON_KEYS: &[(&str, SectionKind)] = &[
    ("intro", SectionKind::Intro),
    ("shops", SectionKind::Shops),
    ("restaurants", SectionKind::Restaurants),
    ("events", SectionKind::Events),
    ("parking", SectionKind::Parking),
    ("openingHours", SectionKind::OpeningHours),
    ("tip", SectionKind::Tip),
    ("followUp", SectionKind::FollowUp),
];

/// Builds sections from a repaired JSON object, one per known key present.
/// Unknown keys and malformed values are skipped silently.
pub fn build_from_json(value: &Value) -> Vec<Section> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };

    let mut sections = Vec::new();
    for &(key, kind) in JSON_KEYS {
        let Some(field) = object.get(key) else {
            continue;
        };
        let built = match kind {
            SectionKind::Intro => field
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .map(|s| Section::content(kind, normalize_breaks(s))),
            SectionKind::Tip | SectionKind::FollowUp => field
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .map(|s| Section::content(kind, s.to_string())),
            SectionKind::Shops | SectionKind::Restaurants | SectionKind::Events => {
                let items = items_from_json(field);
                if items.is_empty() {
                    None
                } else {
                    Some(Section::list(kind, items))
                }
            }
            SectionKind::Parking => {
                let info = parking_from_json(field);
                if info.is_empty() {
                    None
                } else {
                    Some(Section::structured(kind, SectionData::Parking(info)))
                }
            }
            SectionKind::OpeningHours => {
                let info = hours_from_json(field);
                if info.is_empty() {
                    None
                } else {
                    Some(Section::structured(kind, SectionData::OpeningHours(info)))
                }
            }
        };
        if let Some(section) = built {
            sections.push(section);
        }
    }
    sections
}

/// Plucks items from a JSON array, renaming `logo` → `image_url` and
/// dropping entries without a usable `name`.
fn items_from_json(field: &Value) -> Vec<SectionItem> {
    let Some(entries) = field.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = string_field(entry, &["name"])?;
            Some(SectionItem {
                name,
                category: string_field(entry, &["category"]),
                floor: string_field(entry, &["floor"]),
                image_url: string_field(entry, &["imageUrl", "logo", "image"]),
                description: string_field(entry, &["description"]),
                opening: string_field(entry, &["opening"]),
                date: string_field(entry, &["date"]),
            })
        })
        .collect()
}

fn parking_from_json(field: &Value) -> ParkingInfo {
    let mut info = ParkingInfo::default();
    if let Some(fees) = field.get("fees").and_then(Value::as_array) {
        for fee in fees {
            let duration = string_field(fee, &["duration"]).unwrap_or_default();
            let price = string_field(fee, &["price"]).unwrap_or_default();
            if !duration.is_empty() || !price.is_empty() {
                info.fees.push(ParkingFee { duration, price });
            }
        }
    }
    if let Some(notes) = field.get("notes").and_then(Value::as_array) {
        for note in notes {
            if let Some(text) = note.as_str()
                && !text.trim().is_empty()
            {
                info.notes.push(text.trim().to_string());
            }
        }
    }
    info
}

fn hours_from_json(field: &Value) -> OpeningHoursInfo {
    let mut info = OpeningHoursInfo::default();
    if let Some(regular) = field.get("regular").and_then(Value::as_array) {
        for row in regular {
            let day = string_field(row, &["day"]).unwrap_or_default();
            let hours = string_field(row, &["hours"]).unwrap_or_default();
            if !day.is_empty() || !hours.is_empty() {
                info.regular.push(RegularHours { day, hours });
            }
        }
    }
    if let Some(special) = field.get("special").and_then(Value::as_array) {
        for row in special {
            let date = string_field(row, &["date"]).unwrap_or_default();
            let hours = string_field(row, &["hours"]).unwrap_or_default();
            if !date.is_empty() || !hours.is_empty() {
                info.special.push(SpecialHours {
                    date,
                    hours,
                    note: string_field(row, &["note"]),
                });
            }
        }
    }
    info
}

/// First non-empty string among the given keys of a JSON object.
fn string_field(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| entry.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Normalizes line endings and collapses runs of blank lines so intro text
/// renders with explicit, predictable breaks.
pub fn normalize_breaks(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n").replace('\r', "\n");
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out.trim().to_string()
}
