//! Two-part engine timestamps and the transcode duration calculation.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// A point in time as the transcoding engine reports it: whole seconds
/// plus a nanosecond remainder.
///
/// The two-part form is kept all the way through the arithmetic. A single
/// `f64` timestamp would silently lose sub-second precision once the
/// second count grows large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeOffset {
    /// Whole seconds. Some protobuf JSON serializers encode int64 as a
    /// string, so both forms are accepted.
    #[serde(default, deserialize_with = "de_i64_lenient")]
    pub seconds: i64,
    /// Nanosecond remainder
    #[serde(default)]
    pub nanos: i32,
}

impl TimeOffset {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Total nanoseconds relative to the engine's epoch.
    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND + self.nanos as i128
    }
}

/// Errors from the transcode duration calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationError {
    /// End timestamp precedes the start timestamp (engine clock or
    /// ordering defect)
    EndBeforeStart,
}

impl fmt::Display for DurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationError::EndBeforeStart => {
                write!(f, "end timestamp precedes start timestamp")
            }
        }
    }
}

impl std::error::Error for DurationError {}

/// Elapsed seconds between two engine-reported timestamps.
///
/// The subtraction happens in integer nanoseconds; only the final result
/// is converted to `f64`, so the sub-second component stays exact.
/// `end == start` yields `0.0`. `end` before `start` is an error, never a
/// negative duration.
pub fn transcode_duration(start: TimeOffset, end: TimeOffset) -> Result<f64, DurationError> {
    let delta = end.as_nanos() - start.as_nanos();
    if delta < 0 {
        return Err(DurationError::EndBeforeStart);
    }
    Ok(delta as f64 / NANOS_PER_SECOND as f64)
}

fn de_i64_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
