//! Non-fatal failure taxonomy for error accounting.
//!
//! Nothing in this crate propagates these as `Err` to the caller: a failure
//! means one chunk or one field is skipped, the session counts it, and
//! processing continues. The session flips its degraded-state flag once
//! consecutive failures exceed the configured threshold.

use thiserror::Error;

/// Why one decode/build attempt produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFailure {
    /// Malformed or unrecognized chunk element (bad tag, unknown type).
    #[error("undecodable chunk: {0}")]
    Decode(String),

    /// The buffer looked like JSON but no usable object could be recovered.
    #[error("unrecoverable json: {0}")]
    Parse(String),

    /// A record decoded fine but built no section (e.g. item without a name).
    #[error("record built no section: {0}")]
    Build(String),
}
