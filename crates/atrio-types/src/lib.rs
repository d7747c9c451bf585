//! Shared data model for the atrio streaming core (sections, items, snapshots).

pub mod section;
pub mod snapshot;

pub use section::{
    OpeningHoursInfo, ParkingFee, ParkingInfo, RegularHours, Section, SectionData, SectionItem,
    SectionKind, SpecialHours,
};
pub use snapshot::StreamSnapshot;
