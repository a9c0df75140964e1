//! Line-keyed directive store.

use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt;

/// Directive text accumulated per source line.
///
/// Each entry is a sequence of directives, each terminated by a line break.
/// Adding text that is already present at a line is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationMap {
    lines: BTreeMap<u32, String>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `directive` to `line` unless that text is already there.
    ///
    /// Returns whether the map changed.
    pub fn add(&mut self, line: u32, directive: &str) -> bool {
        if directive.is_empty() {
            return false;
        }
        let text = if directive.ends_with('\n') {
            directive.to_string()
        } else {
            format!("{}\n", directive)
        };
        let entry = self.lines.entry(line).or_default();
        if entry.contains(text.as_str()) {
            return false;
        }
        entry.push_str(&text);
        true
    }

    /// Add every directive of `other`, keeping the deduplication rule.
    ///
    /// Accumulated entries are split back into single directives so that a
    /// directive already present here is not repeated.
    pub fn merge(&mut self, other: &AnnotationMap) {
        for (line, text) in other.iter() {
            for directive in text.split_inclusive('\n') {
                self.add(line, directive);
            }
        }
    }

    /// Text accumulated at a line.
    pub fn get(&self, line: u32) -> Option<&str> {
        self.lines.get(&line).map(String::as_str)
    }

    /// Entries in ascending line order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.lines.iter().map(|(l, t)| (*l, t.as_str()))
    }

    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for AnnotationMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, text) in self.iter() {
            writeln!(f, "{}:", line)?;
            for directive in text.lines() {
                writeln!(f, "    {}", directive)?;
            }
        }
        Ok(())
    }
}
