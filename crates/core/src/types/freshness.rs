//! Freshness timestamps used for image cache-busting.

use core::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Epoch-millisecond marker for the last known change of a resource.
///
/// Appended to resource URLs as `?v=<millis>` so that a client cache treats
/// the URL as new content whenever the marker moves forward.
///
/// ## Examples
///
/// ```
/// use kicks_core::Freshness;
///
/// let older = Freshness::from_millis(1_700_000_000_000);
/// let newer = Freshness::from_millis(1_700_000_000_500);
/// assert_eq!(older.max(newer), newer);
/// assert_eq!(newer.to_string(), "1700000000500");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Freshness(i64);

impl Freshness {
    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Wrap a raw epoch-millisecond value.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Get the underlying epoch-millisecond value.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Freshness {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl From<Freshness> for i64 {
    fn from(value: Freshness) -> Self {
        value.0
    }
}
