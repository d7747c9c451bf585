//! Streaming answer parser for the atrio concierge surface.
//!
//! Turns a growing, possibly-truncated answer buffer (tagged-chunk or JSON
//! wire format) into a stable list of typed [`atrio_types::Section`]s,
//! updated on every fragment and finalized once the stream ends. The core is
//! synchronous and transport-free: the host delivers buffer growth via
//! [`StreamingSession::push`] and drives time by calling
//! [`StreamingSession::poll`] from its event loop.

pub mod builder;
pub mod chunk;
pub mod config;
pub mod failure;
pub mod merge;
pub mod progress;
pub mod repair;
pub mod session;

pub use config::SessionConfig;
pub use failure::StreamFailure;
pub use session::{Phase, StreamingSession};
