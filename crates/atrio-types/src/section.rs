//! Section types for the parsed concierge answer.
//!
//! A streamed answer is decoded into an ordered list of [`Section`]s. Each
//! section is one renderable unit: an intro paragraph, a list of shops, the
//! parking fee table, and so on. The types here are the contract between the
//! parsing core and the rendering layer; they are serializable so snapshots
//! can be dumped as fixtures or sent across a webview boundary.

use serde::{Deserialize, Serialize};

/// The kind of a parsed section.
///
/// Content-only kinds (`Intro`, `Tip`, `FollowUp`) carry `content`; list
/// kinds (`Shops`, `Restaurants`, `Events`) carry `items`; `Parking` and
/// `OpeningHours` carry structured `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Intro,
    Shops,
    Restaurants,
    Events,
    Parking,
    OpeningHours,
    Tip,
    FollowUp,
}

impl SectionKind {
    /// Whether sections of this kind accumulate list items.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            SectionKind::Shops | SectionKind::Restaurants | SectionKind::Events
        )
    }

    /// Whether sections of this kind carry structured data.
    pub fn is_structured(self) -> bool {
        matches!(self, SectionKind::Parking | SectionKind::OpeningHours)
    }

    /// Default display title for this kind.
    ///
    /// The intro has no heading; everything else gets a stable label the
    /// renderer can show while items are still trickling in.
    pub fn default_title(self) -> &'static str {
        match self {
            SectionKind::Intro => "",
            SectionKind::Shops => "Shops",
            SectionKind::Restaurants => "Restaurants",
            SectionKind::Events => "Events",
            SectionKind::Parking => "Parking",
            SectionKind::OpeningHours => "Opening hours",
            SectionKind::Tip => "Tip",
            SectionKind::FollowUp => "You could also ask",
        }
    }
}

/// One entry of a list section (a shop, restaurant, or event).
///
/// `name` is the identity key: two items are duplicates iff their names are
/// exactly equal. All other fields are optional display data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl SectionItem {
    /// Creates an item with only the identity key set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One parking fee row (`duration` label and `price` label).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingFee {
    pub duration: String,
    pub price: String,
}

/// Parking information: fee table plus free-form notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingInfo {
    #[serde(default)]
    pub fees: Vec<ParkingFee>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ParkingInfo {
    pub fn is_empty(&self) -> bool {
        self.fees.is_empty() && self.notes.is_empty()
    }
}

/// Regular weekly opening hours for one day (or day range).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularHours {
    pub day: String,
    pub hours: String,
}

/// A dated exception to the regular hours (holidays, late shopping).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialHours {
    pub date: String,
    pub hours: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Opening hours: the weekly schedule plus dated exceptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHoursInfo {
    #[serde(default)]
    pub regular: Vec<RegularHours>,
    #[serde(default)]
    pub special: Vec<SpecialHours>,
}

impl OpeningHoursInfo {
    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.special.is_empty()
    }
}

/// Structured payload for non-list, non-content sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SectionData {
    Parking(ParkingInfo),
    OpeningHours(OpeningHoursInfo),
}

/// A typed unit of the parsed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SectionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SectionData>,
    /// True while the section was built from an incomplete buffer and may
    /// still be replaced or extended before finalization.
    #[serde(default)]
    pub is_partial: bool,
}

impl Section {
    /// Creates a content-only section (intro, tip, follow-up).
    pub fn content(kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            title: kind.default_title().to_string(),
            content: Some(content.into()),
            items: None,
            data: None,
            is_partial: false,
        }
    }

    /// Creates a list section (shops, restaurants, events).
    pub fn list(kind: SectionKind, items: Vec<SectionItem>) -> Self {
        Self {
            kind,
            title: kind.default_title().to_string(),
            content: None,
            items: Some(items),
            data: None,
            is_partial: false,
        }
    }

    /// Creates a structured section (parking, opening hours).
    pub fn structured(kind: SectionKind, data: SectionData) -> Self {
        Self {
            kind,
            title: kind.default_title().to_string(),
            content: None,
            items: None,
            data: Some(data),
            is_partial: false,
        }
    }

    /// Marks the section as built from an incomplete buffer.
    pub fn partial(mut self) -> Self {
        self.is_partial = true;
        self
    }

    /// Number of list items, zero for non-list sections.
    pub fn item_count(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }
}
