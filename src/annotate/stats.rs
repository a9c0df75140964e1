//! Compilation-unit statistics.

use serde::{Serialize, Deserialize};
use std::fmt;

/// Counters the engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Loops discovered in function bodies
    Loops,
    /// Loops whose side effects are fully known
    AnalyzableLoops,
    /// Loops that received a directive
    AnnotatedLoops,
    /// Value-producing calls inside analyzable loops
    SafeLoopCalls,
}

/// Sink for counter increments, injected into the engine.
pub trait StatsAccumulator {
    fn bump(&mut self, counter: Counter, by: u64);
}

/// Counters for a whole compilation unit. They only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub loops: u64,
    pub analyzable_loops: u64,
    pub annotated_loops: u64,
    pub safe_loop_calls: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Loops => self.loops,
            Counter::AnalyzableLoops => self.analyzable_loops,
            Counter::AnnotatedLoops => self.annotated_loops,
            Counter::SafeLoopCalls => self.safe_loop_calls,
        }
    }
}

impl StatsAccumulator for Statistics {
    fn bump(&mut self, counter: Counter, by: u64) {
        let slot = match counter {
            Counter::Loops => &mut self.loops,
            Counter::AnalyzableLoops => &mut self.analyzable_loops,
            Counter::AnnotatedLoops => &mut self.annotated_loops,
            Counter::SafeLoopCalls => &mut self.safe_loop_calls,
        };
        *slot = slot.saturating_add(by);
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} Number of loops", self.loops)?;
        writeln!(f, "{:>8} Number of analyzable loops", self.analyzable_loops)?;
        writeln!(f, "{:>8} Number of annotated loops", self.annotated_loops)?;
        writeln!(f, "{:>8} Number of safe call instructions inside loops", self.safe_loop_calls)
    }
}
