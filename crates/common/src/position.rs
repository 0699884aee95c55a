//! Global log positions
//!
//! A position identifies one write-once slot in the shared log. Positions
//! are totally ordered and handed out by the sequencer; no two appends ever
//! succeed at the same position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A globally ordered slot identifier in the shared log.
///
/// Issued positions start at 1. `Position::ZERO` is never issued and serves
/// as the cursor origin for readers that have observed nothing yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub u64);

impl Position {
    /// The cursor origin; strictly below every issued position.
    pub const ZERO: Position = Position(0);

    /// The position immediately after this one.
    pub fn next(&self) -> Position {
        Position(self.0 + 1)
    }

    /// The position immediately before this one, saturating at zero.
    pub fn prev(&self) -> Position {
        Position(self.0.saturating_sub(1))
    }

    /// Whether this is the cursor origin rather than an issued position.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Position {
    fn from(raw: u64) -> Self {
        Position(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Position::ZERO < Position(1));
        assert!(Position(1) < Position(2));
        assert_eq!(Position(7), Position(7));
    }

    #[test]
    fn test_next_prev() {
        assert_eq!(Position(3).next(), Position(4));
        assert_eq!(Position(3).prev(), Position(2));
        assert_eq!(Position::ZERO.prev(), Position::ZERO);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Position(42)).unwrap();
        assert_eq!(json, "42");
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Position(42));
    }
}
