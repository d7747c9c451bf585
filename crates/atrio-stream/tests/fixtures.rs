//! Shared helpers for the streaming integration tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use atrio_stream::{SessionConfig, StreamingSession};
use atrio_types::StreamSnapshot;

/// A full chunk-format answer: intro, two shops, a restaurant, parking,
/// opening hours, tip and follow-up.
pub const CHUNK_ANSWER: &str = concat!(
    "<chunk type=\"intro\">Welcome to Atrio! Here is what I found.</chunk>",
    "<chunk type=\"shop\">NAME: Solemate\nCATEGORY: Shoes\nFLOOR: 1\nLOGO: /img/solemate.png</chunk>",
    "<chunk type=\"shop\">NAME: Paperchase\nCATEGORY: Stationery\nFLOOR: 2</chunk>",
    "<chunk type=\"restaurant\">NAME: Green Bowl\nCATEGORY: Salads\nOPENING: 11:00-21:00</chunk>",
    "<chunk type=\"parking\">FEES:\n- DURATION: 1 hour | PRICE: 2.50 €\n- DURATION: 3 hours | PRICE: 6.00 €\nNOTES:\n- First 30 minutes free</chunk>",
    "<chunk type=\"openingHours\">REGULAR:\n- DAY: Mon-Sat | HOURS: 10:00-20:00\nSPECIAL:\n- DATE: 2025-12-24 | HOURS: 10:00-14:00 | NOTE: Christmas Eve</chunk>",
    "<chunk type=\"tip\">Weekday mornings are the quietest.</chunk>",
    "<chunk type=\"followUp\">Want directions to any of these?</chunk>",
);

/// The same answer in the JSON wire format.
pub const JSON_ANSWER: &str = r#"{
  "intro": "Welcome to Atrio! Here is what I found.",
  "shops": [
    {"name": "Solemate", "category": "Shoes", "floor": "1", "logo": "/img/solemate.png"},
    {"name": "Paperchase", "category": "Stationery", "floor": "2"}
  ],
  "restaurants": [
    {"name": "Green Bowl", "category": "Salads", "opening": "11:00-21:00"}
  ],
  "parking": {
    "fees": [
      {"duration": "1 hour", "price": "2.50 €"},
      {"duration": "3 hours", "price": "6.00 €"}
    ],
    "notes": ["First 30 minutes free"]
  },
  "openingHours": {
    "regular": [{"day": "Mon-Sat", "hours": "10:00-20:00"}],
    "special": [{"date": "2025-12-24", "hours": "10:00-14:00", "note": "Christmas Eve"}]
  },
  "tip": "Weekday mornings are the quietest.",
  "followUp": "Want directions to any of these?"
}"#;

/// Drives a session as a transport would: delivers the text in fragments of
/// `fragment_len` bytes, polling past the debounce after each delivery, and
/// collects every published snapshot.
pub fn stream_in_fragments(
    session: &mut StreamingSession,
    text: &str,
    fragment_len: usize,
) -> Vec<StreamSnapshot> {
    let mut published = Vec::new();
    let mut now = Instant::now();
    let step = Duration::from_millis(200);

    let bytes = text.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        // Keep fragment boundaries on char boundaries.
        let mut end = (start + fragment_len).min(bytes.len());
        while end < bytes.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        session.push(&text[start..end], now);
        now += step;
        if let Some(snapshot) = session.poll(now) {
            published.push(snapshot);
        }
        start = end;
    }
    published
}

/// A session with default tunables.
pub fn default_session() -> StreamingSession {
    StreamingSession::new(SessionConfig::default())
}
