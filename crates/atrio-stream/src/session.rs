//! Per-turn streaming session: state machine and pacing.
//!
//! One `StreamingSession` exclusively owns all state for one in-flight
//! answer: the raw buffer, the seen-chunk set, partial and final sections,
//! progress, and error accounting. Nothing is shared across turns; the
//! session is created when an answer starts streaming and discarded when the
//! turn completes or is cancelled.
//!
//! The session is synchronous and clock-free: the host event loop calls
//! [`StreamingSession::push`] for every fragment and [`StreamingSession::poll`]
//! on its ticks, passing `now` explicitly. Debouncing and publish rate
//! limiting are plain `Instant` deadlines compared against that `now`; at
//! most one pending decode deadline exists, and re-arming replaces it.

use std::collections::HashSet;
use std::time::Instant;

use atrio_types::{Section, SectionKind, StreamSnapshot};
use tracing::debug;

use crate::builder::{build_from_chunk, build_from_json, normalize_breaks};
use crate::chunk::decode_new_chunks;
use crate::config::SessionConfig;
use crate::failure::StreamFailure;
use crate::merge::merge_sections;
use crate::progress;
use crate::repair::repair_json;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, no fragment received yet.
    Idle,
    /// Fragments arriving; partial sections are being published.
    Streaming,
    /// The one-time terminal full-buffer pass is running.
    Finalizing,
    /// Finalized or cancelled; the session is inert.
    Done,
}

/// Which wire format the buffer appears to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    /// Concatenated `<chunk …>` elements.
    Chunks,
    /// One top-level JSON object (possibly fenced).
    Json,
    /// Not enough text to tell yet.
    Undetermined,
}

fn detect_format(buffer: &str) -> WireFormat {
    let trimmed = buffer.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with("```") {
        WireFormat::Json
    } else if trimmed.contains("<chunk") {
        WireFormat::Chunks
    } else {
        WireFormat::Undetermined
    }
}

/// Incremental parser state for one streamed answer.
pub struct StreamingSession {
    config: SessionConfig,
    phase: Phase,
    raw_buffer: String,
    processed_chunk_keys: HashSet<String>,
    partial_sections: Vec<Section>,
    final_sections: Vec<Section>,
    progress: u8,
    error_count: u32,
    has_error: bool,
    revision: u64,
    /// Deadline for the next decode pass; re-armed (replaced) on every push.
    decode_deadline: Option<Instant>,
    /// When the last snapshot was published, for the rate limit.
    last_publish: Option<Instant>,
    /// A decode pass ran but the publish gate was closed at the time.
    publish_pending: bool,
    /// Cached result of `finish` for idempotent repeat calls.
    final_snapshot: Option<StreamSnapshot>,
}

impl StreamingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            raw_buffer: String::new(),
            processed_chunk_keys: HashSet::new(),
            partial_sections: Vec::new(),
            final_sections: Vec::new(),
            progress: 0,
            error_count: 0,
            has_error: false,
            revision: 0,
            decode_deadline: None,
            last_publish: None,
            publish_pending: false,
            final_snapshot: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Current view of the session without publishing.
    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            sections: self.final_sections.clone(),
            partial_sections: self.partial_sections.clone(),
            progress: self.progress,
            has_error: self.has_error,
            revision: self.revision,
        }
    }

    /// Appends one fragment and (re-)arms the decode debounce deadline.
    /// Ignored once finalization has begun.
    pub fn push(&mut self, fragment: &str, now: Instant) {
        if matches!(self.phase, Phase::Finalizing | Phase::Done) {
            return;
        }
        self.phase = Phase::Streaming;
        self.raw_buffer.push_str(fragment);
        self.decode_deadline = Some(now + self.config.debounce());
    }

    /// Replaces the buffer with a full accumulated copy from the transport.
    ///
    /// For transports that re-deliver the whole text instead of deltas. The
    /// buffer is monotone by contract, so a shorter (replayed) copy is
    /// ignored rather than allowed to rewind state.
    pub fn sync_buffer(&mut self, full: &str, now: Instant) {
        if matches!(self.phase, Phase::Finalizing | Phase::Done) {
            return;
        }
        if full.len() <= self.raw_buffer.len() {
            return;
        }
        self.phase = Phase::Streaming;
        self.raw_buffer.clear();
        self.raw_buffer.push_str(full);
        self.decode_deadline = Some(now + self.config.debounce());
    }

    /// Runs due work and returns a snapshot if one was published.
    ///
    /// Decoding runs once the debounce deadline has passed; the result is
    /// published subject to the independent publish rate limit. A decode
    /// whose publish was gated is published by a later poll.
    pub fn poll(&mut self, now: Instant) -> Option<StreamSnapshot> {
        if self.phase != Phase::Streaming {
            return None;
        }

        if let Some(deadline) = self.decode_deadline
            && now >= deadline
        {
            self.decode_deadline = None;
            self.process_streaming();
            self.publish_pending = true;
        }

        if self.publish_pending {
            let gate_open = self
                .last_publish
                .is_none_or(|last| now.duration_since(last) >= self.config.publish_interval());
            if gate_open {
                self.publish_pending = false;
                self.last_publish = Some(now);
                self.revision += 1;
                return Some(self.snapshot());
            }
        }
        None
    }

    /// Finalizes the session: one full pass over the entire buffer, ignoring
    /// prior partial state, then `progress = 100` and phase `Done`.
    ///
    /// Idempotent: repeat calls return the same snapshot.
    pub fn finish(&mut self) -> StreamSnapshot {
        if self.phase == Phase::Done {
            return self
                .final_snapshot
                .clone()
                .unwrap_or_else(|| self.snapshot());
        }
        self.phase = Phase::Finalizing;
        self.decode_deadline = None;
        self.publish_pending = false;

        let span = tracing::debug_span!("finalize", buffer_len = self.raw_buffer.len());
        let _guard = span.enter();

        let mut sections = self.full_pass();

        if sections.is_empty() {
            let trimmed = self.raw_buffer.trim();
            if trimmed.len() >= self.config.fallback_min_len {
                debug!("no sections recovered, falling back to raw text");
                sections.push(Section::content(SectionKind::Intro, normalize_breaks(trimmed)));
            }
        }

        self.final_sections = sections;
        self.partial_sections.clear();
        self.progress = 100;
        self.phase = Phase::Done;
        self.revision += 1;

        let snapshot = self.snapshot();
        self.final_snapshot = Some(snapshot.clone());
        snapshot
    }

    /// Discards pending work so no later poll can mutate or publish.
    /// The session parks in `Done` without producing final sections.
    pub fn cancel(&mut self) {
        self.decode_deadline = None;
        self.publish_pending = false;
        self.phase = Phase::Done;
    }

    /// One incremental decode→build→merge→progress pass while streaming.
    fn process_streaming(&mut self) {
        match detect_format(&self.raw_buffer) {
            WireFormat::Chunks => {
                let records =
                    decode_new_chunks(&self.raw_buffer, &mut self.processed_chunk_keys);
                for record in records {
                    match build_from_chunk(&record) {
                        Ok(section) => {
                            merge_sections(&mut self.partial_sections, vec![section.partial()]);
                            self.error_count = 0;
                        }
                        Err(failure) => self.record_failure(&failure),
                    }
                }
            }
            WireFormat::Json => {
                // A repair miss means "nothing new to show yet", which by
                // contract not an error, so the count is left alone.
                if let Some(repaired) = repair_json(&self.raw_buffer) {
                    let built = build_from_json(&repaired.value);
                    if built.is_empty() {
                        self.record_failure(&StreamFailure::Parse(
                            "recovered object had no known fields".to_string(),
                        ));
                    } else {
                        let built = built.into_iter().map(Section::partial).collect();
                        merge_sections(&mut self.partial_sections, built);
                        self.error_count = 0;
                    }
                }
            }
            WireFormat::Undetermined => {}
        }

        self.progress = self.progress.max(progress::estimate(
            self.raw_buffer.len(),
            self.partial_sections.len(),
            &self.config,
        ));
    }

    /// The finalization pass: decodes the whole buffer from scratch.
    fn full_pass(&mut self) -> Vec<Section> {
        let mut sections = Vec::new();
        match detect_format(&self.raw_buffer) {
            WireFormat::Chunks => {
                // Fresh seen-set: the terminal pass must not depend on what
                // the incremental passes happened to see.
                let mut seen = HashSet::new();
                for record in decode_new_chunks(&self.raw_buffer, &mut seen) {
                    match build_from_chunk(&record) {
                        Ok(section) => {
                            merge_sections(&mut sections, vec![section]);
                            self.error_count = 0;
                        }
                        Err(failure) => self.record_failure(&failure),
                    }
                }
            }
            WireFormat::Json => {
                if let Some(repaired) = repair_json(&self.raw_buffer) {
                    let built = build_from_json(&repaired.value);
                    if built.is_empty() {
                        self.record_failure(&StreamFailure::Parse(
                            "recovered object had no known fields".to_string(),
                        ));
                    } else {
                        // Repaired (incomplete) data keeps its partial flag
                        // even in the final list; a strict parse is complete.
                        let built = if repaired.is_partial() {
                            built.into_iter().map(Section::partial).collect()
                        } else {
                            built
                        };
                        merge_sections(&mut sections, built);
                        self.error_count = 0;
                    }
                }
            }
            WireFormat::Undetermined => {}
        }
        sections
    }

    fn record_failure(&mut self, failure: &StreamFailure) {
        self.error_count += 1;
        debug!(%failure, count = self.error_count, "decode attempt failed");
        if self.error_count > self.config.error_threshold {
            self.has_error = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn session() -> StreamingSession {
        StreamingSession::new(SessionConfig::default())
    }

    /// Polls past both the debounce window and the publish gate.
    fn settle(session: &mut StreamingSession, from: Instant) -> Option<StreamSnapshot> {
        session.poll(from + Duration::from_millis(500))
    }

    #[test]
    fn test_chunk_stream_end_to_end() {
        let t0 = Instant::now();
        let mut session = session();
        session.push(r#"<chunk type="intro">Hello</chunk>"#, t0);
        let snapshot = settle(&mut session, t0).expect("published");
        assert_eq!(snapshot.partial_sections.len(), 1);
        assert_eq!(snapshot.partial_sections[0].kind, SectionKind::Intro);
        assert!(snapshot.partial_sections[0].is_partial);
        assert!(snapshot.sections.is_empty());

        session.push(
            "<chunk type=\"shop\">NAME: Foo\nCATEGORY: Shoes</chunk>",
            t0 + Duration::from_millis(600),
        );
        let snapshot = session
            .poll(t0 + Duration::from_millis(1200))
            .expect("published");
        assert_eq!(snapshot.partial_sections.len(), 2);

        let final_snapshot = session.finish();
        assert_eq!(final_snapshot.progress, 100);
        assert!(!final_snapshot.has_error);
        assert!(final_snapshot.partial_sections.is_empty());
        assert_eq!(final_snapshot.sections.len(), 2);
        assert_eq!(final_snapshot.sections[0].kind, SectionKind::Intro);
        assert_eq!(final_snapshot.sections[0].content.as_deref(), Some("Hello"));
        assert_eq!(final_snapshot.sections[1].kind, SectionKind::Shops);
        let items = final_snapshot.sections[1].items.as_ref().expect("items");
        assert_eq!(items[0].name, "Foo");
        assert_eq!(items[0].category.as_deref(), Some("Shoes"));
    }

    #[test]
    fn test_truncated_json_publishes_nothing_then_intro() {
        let t0 = Instant::now();
        let mut session = session();
        session.push(r#"{"intro": "Welcome to"#, t0);
        let snapshot = settle(&mut session, t0).expect("published");
        // The half-received string value must not appear.
        assert!(snapshot.partial_sections.is_empty());
        assert!(!snapshot.has_error);

        let t1 = t0 + Duration::from_millis(600);
        session.push(r#" the mall"}"#, t1);
        let snapshot = settle(&mut session, t1).expect("published");
        assert_eq!(snapshot.partial_sections.len(), 1);
        assert_eq!(
            snapshot.partial_sections[0].content.as_deref(),
            Some("Welcome to the mall")
        );
        assert!(snapshot.partial_sections[0].is_partial);
    }

    #[test]
    fn test_debounce_coalesces_ticks() {
        let t0 = Instant::now();
        let mut session = session();
        session.push(r#"<chunk type="intro">He"#, t0);
        // Deadline is t0+50ms; nothing is due yet.
        assert!(session.poll(t0 + Duration::from_millis(10)).is_none());

        // A second push within the window re-arms the deadline.
        session.push("llo</chunk>", t0 + Duration::from_millis(20));
        assert!(session.poll(t0 + Duration::from_millis(60)).is_none());

        let snapshot = session
            .poll(t0 + Duration::from_millis(80))
            .expect("published after debounce");
        assert_eq!(snapshot.partial_sections.len(), 1);
    }

    #[test]
    fn test_publish_rate_limit_independent_of_debounce() {
        let t0 = Instant::now();
        let mut session = session();
        session.push(r#"<chunk type="intro">Hello</chunk>"#, t0);
        let first = session.poll(t0 + Duration::from_millis(50)).expect("first");

        // Decode due again shortly after; gate still closed.
        session.push(
            r#"<chunk type="tip">Go early</chunk>"#,
            t0 + Duration::from_millis(60),
        );
        assert!(session.poll(t0 + Duration::from_millis(120)).is_none());

        // Gate opens; the pending decode result is published.
        let second = session
            .poll(t0 + Duration::from_millis(160))
            .expect("pending publish");
        assert_eq!(second.revision, first.revision + 1);
        assert_eq!(second.partial_sections.len(), 2);
    }

    #[test]
    fn test_progress_monotonic_and_100_after_finish() {
        let t0 = Instant::now();
        let mut session = session();
        let mut last_progress = 0;
        for i in 0..20 {
            let now = t0 + Duration::from_millis(200 * (i + 1));
            session.push(&format!("<chunk type=\"tip\">tip {i}</chunk>"), now);
            if let Some(snapshot) = session.poll(now + Duration::from_millis(150)) {
                assert!(snapshot.progress >= last_progress, "progress went backwards");
                assert!(snapshot.progress < 100);
                last_progress = snapshot.progress;
            }
        }
        assert_eq!(session.finish().progress, 100);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let t0 = Instant::now();
        let mut session = session();
        session.push(r#"<chunk type="intro">Hello</chunk>"#, t0);
        let first = session.finish();
        let second = session.finish();
        assert_eq!(first, second);
    }

    #[test]
    fn test_finalization_deterministic_across_sessions() {
        let buffer = concat!(
            r#"<chunk type="intro">Hi</chunk>"#,
            "<chunk type=\"shop\">NAME: Foo</chunk>",
            "<chunk type=\"shop\">NAME: Bar</chunk>",
        );
        let t0 = Instant::now();

        // One session saw the buffer incrementally, the other all at once;
        // the terminal pass must not depend on that history.
        let mut incremental = session();
        for fragment in [&buffer[..30], &buffer[30..]] {
            incremental.push(fragment, t0);
            let _ = settle(&mut incremental, t0);
        }
        let mut oneshot = session();
        oneshot.push(buffer, t0);

        assert_eq!(incremental.finish().sections, oneshot.finish().sections);
    }

    #[test]
    fn test_raw_text_fallback() {
        let t0 = Instant::now();
        let mut session = session();
        session.push("Just plain prose, matching neither format.\nSecond line.", t0);
        let snapshot = session.finish();
        assert_eq!(snapshot.sections.len(), 1);
        assert_eq!(snapshot.sections[0].kind, SectionKind::Intro);
        let content = snapshot.sections[0].content.as_deref().expect("content");
        assert!(content.contains("plain prose"));
        assert!(content.contains('\n'));
    }

    #[test]
    fn test_short_unmatched_buffer_finalizes_empty() {
        let t0 = Instant::now();
        let mut session = session();
        session.push("hm", t0);
        assert!(session.finish().sections.is_empty());
    }

    #[test]
    fn test_fallback_min_len_one_surfaces_tiny_buffers() {
        let t0 = Instant::now();
        let mut session = StreamingSession::new(SessionConfig {
            fallback_min_len: 1,
            ..SessionConfig::default()
        });
        session.push("hm", t0);
        let snapshot = session.finish();
        assert_eq!(snapshot.sections.len(), 1);
        assert_eq!(snapshot.sections[0].content.as_deref(), Some("hm"));
    }

    #[test]
    fn test_error_flag_after_repeated_bad_chunks() {
        let t0 = Instant::now();
        let mut session = session();
        for i in 0..7u64 {
            let now = t0 + Duration::from_millis(500 * (i + 1));
            session.push(&format!("<chunk type=\"bogus{i}\">x</chunk>"), now);
            let _ = session.poll(now + Duration::from_millis(200));
        }
        assert!(session.has_error());
        // Degraded, not dead: a good chunk still lands and resets the count.
        let now = t0 + Duration::from_secs(10);
        session.push(r#"<chunk type="intro">still here</chunk>"#, now);
        let snapshot = session
            .poll(now + Duration::from_millis(200))
            .expect("published");
        assert_eq!(snapshot.partial_sections.len(), 1);
    }

    #[test]
    fn test_cancel_parks_session() {
        let t0 = Instant::now();
        let mut session = session();
        session.push(r#"<chunk type="intro">Hello</chunk>"#, t0);
        session.cancel();
        assert_eq!(session.phase(), Phase::Done);
        // A stale tick after cancellation neither mutates nor publishes.
        assert!(session.poll(t0 + Duration::from_secs(1)).is_none());
        session.push("more", t0 + Duration::from_secs(1));
        assert!(session.poll(t0 + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_sync_buffer_ignores_regression() {
        let t0 = Instant::now();
        let mut session = session();
        session.sync_buffer(r#"<chunk type="intro">Hello</chunk>"#, t0);
        let len_snapshot = settle(&mut session, t0).expect("published");
        assert_eq!(len_snapshot.partial_sections.len(), 1);

        // A replayed shorter copy is ignored outright.
        session.sync_buffer("<chunk", t0 + Duration::from_secs(1));
        assert!(session.poll(t0 + Duration::from_secs(2)).is_none());
        assert_eq!(session.snapshot().partial_sections.len(), 1);
    }

    #[test]
    fn test_json_items_accumulate_without_duplicates() {
        let t0 = Instant::now();
        let mut session = session();
        session.push(r#"{"shops": [{"name": "A"}, {"name": "B"}"#, t0);
        let snapshot = settle(&mut session, t0).expect("published");
        // Both complete entries recovered from the truncated array.
        assert_eq!(snapshot.partial_sections[0].item_count(), 2);

        let t1 = t0 + Duration::from_millis(600);
        session.push(r#", {"name": "C"}]}"#, t1);
        let snapshot = settle(&mut session, t1).expect("published");
        // Rescan rebuilt [A, B, C]; merging with [A, B] dedups to three.
        let items = snapshot.partial_sections[0].items.as_ref().expect("items");
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
