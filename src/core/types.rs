/*!
 * Core Types
 * Common types used across the finalization subsystems
 */

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Process ID type
pub type Pid = u32;

/// Exit priority (higher runs earlier at shutdown)
pub type Priority = i32;

/// Registration sequence number
pub type Sequence = u64;

/// Positional callback arguments
pub type Args = Vec<serde_json::Value>;

/// Keyword callback arguments
pub type Kwargs = serde_json::Map<String, serde_json::Value>;

/// Finalizer registry key: `(priority, sequence)`
///
/// Ordered with an absent priority below every present one, then by
/// sequence. Sequences are unique so keys are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FinalizerKey {
    pub priority: Option<Priority>,
    pub sequence: Sequence,
}

impl FinalizerKey {
    #[inline]
    pub const fn new(priority: Option<Priority>, sequence: Sequence) -> Self {
        Self { priority, sequence }
    }

    /// Whether a batch run with the given minimum selects this key
    #[inline]
    pub fn selected_by(&self, min_priority: Option<Priority>) -> bool {
        match (self.priority, min_priority) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(p), Some(min)) => p >= min,
        }
    }
}

impl Ord for FinalizerKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for FinalizerKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FinalizerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.priority {
            Some(p) => write!(f, "({}, {})", p, self.sequence),
            None => write!(f, "(none, {})", self.sequence),
        }
    }
}

/// After-fork registry key: `(sequence, owner identity, callback identity)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AfterForkKey {
    pub sequence: Sequence,
    pub owner: usize,
    pub callback: usize,
}
