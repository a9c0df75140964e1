//! Source line tracking for annotation placement.
//!
//! Every directive the engine commits is keyed by a source line. Regions and
//! loops are mapped to the half-open range of lines they cover, which is what
//! the downstream rewriter uses to open and close committed blocks.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A half-open range of source lines `[start, end)`.
///
/// `end` is the first line after the covered code, which is where a closing
/// marker for a committed region is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    /// First covered line (1-indexed)
    pub start: u32,
    /// One past the last covered line
    pub end: u32,
}

impl LineRange {
    /// Create a new line range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Check if `other` lies entirely within this range.
    ///
    /// The closing line of `other` may coincide with ours.
    pub fn contains(&self, other: &LineRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_display() {
        assert_eq!(format!("{}", LineRange::new(4, 9)), "4..9");
    }

    #[test]
    fn test_range_contains() {
        let outer = LineRange::new(10, 30);
        assert!(outer.contains(&LineRange::new(12, 20)));
        assert!(outer.contains(&LineRange::new(10, 30)));
        assert!(!outer.contains(&LineRange::new(9, 20)));
        assert!(!outer.contains(&LineRange::new(12, 31)));
    }
}
