//! Per-function engine state and the steps shared by both walkers.

use super::routines::{discover_routines, RoutineSet};
use super::stats::{Counter, StatsAccumulator};
use crate::analysis::{is_loop_parallel, Collaborators};
use crate::codegen::AnnotationMap;
use crate::ir::{BlockId, Function, LoopId, Module, RegionId};
use crate::AnnotateConfig;
use log::trace;

/// Walks one function's region tree and collects its directives.
///
/// A fresh engine is built for every function: the annotation map and the
/// computation counter start empty. The routine set and the statistics are
/// borrowed from the unit driver and only ever grow.
pub struct AnnotationEngine<'a> {
    pub(super) config: &'a AnnotateConfig,
    pub(super) module: &'a Module,
    pub(super) function: &'a Function,
    pub(super) facts: &'a mut dyn Collaborators,
    stats: &'a mut dyn StatsAccumulator,
    routines: &'a mut RoutineSet,
    pub(super) annotations: AnnotationMap,
    computations: u32,
}

impl<'a> AnnotationEngine<'a> {
    pub fn new(
        config: &'a AnnotateConfig,
        module: &'a Module,
        function: &'a Function,
        facts: &'a mut dyn Collaborators,
        stats: &'a mut dyn StatsAccumulator,
        routines: &'a mut RoutineSet,
    ) -> Self {
        Self {
            config,
            module,
            function,
            facts,
            stats,
            routines,
            annotations: AnnotationMap::new(),
            computations: 0,
        }
    }

    /// Classify the tree under `root` in the configured mode.
    pub fn run(mut self, root: RegionId) -> AnnotationMap {
        if self.config.memory_coalescing {
            self.descend_coalescing(root);
        } else {
            self.descend(root);
        }
        self.annotations
    }

    pub fn annotations(&self) -> &AnnotationMap {
        &self.annotations
    }

    /// Next computation name in this function: `AI1`, `AI2`, ...
    pub(super) fn fresh_computation_name(&mut self) -> String {
        self.computations += 1;
        format!("AI{}", self.computations)
    }

    pub(super) fn bump(&mut self, counter: Counter, by: u64) {
        if by > 0 {
            self.stats.bump(counter, by);
        }
    }

    /// Count a loop and all its sub-loops as analyzable.
    pub(super) fn mark_analyzable(&mut self, lp: LoopId) {
        let nest = self.function.loops().nest(lp).len() as u64;
        self.bump(Counter::AnalyzableLoops, nest);
    }

    /// Count a loop and all its sub-loops as annotated.
    pub(super) fn mark_annotated(&mut self, lp: LoopId) {
        let nest = self.function.loops().nest(lp).len() as u64;
        self.bump(Counter::AnnotatedLoops, nest);
    }

    /// Stamp a parallel-loop directive on `lp` and on its sub-loops. A loop
    /// that is not parallel stops the descent below it.
    ///
    /// Returns the number of loops stamped.
    pub(super) fn denote_loop_parallel(&mut self, lp: LoopId, condition: &str) -> u64 {
        let function = self.function;
        let directive = self.config.family.parallel_loop(condition);
        let mut stamped = 0;
        let mut pending = vec![lp];
        while let Some(current) = pending.pop() {
            if !is_loop_parallel(function, current, self.config) {
                continue;
            }
            let Some(line) = function.loops().get(current).start_line else {
                trace!("{}: {} has no header line", function.name(), current);
                continue;
            };
            self.bump(Counter::AnnotatedLoops, 1);
            self.annotations.add(line, &directive);
            stamped += 1;
            pending.extend(function.loops().sub_loops(current).iter().rev().copied());
        }
        stamped
    }

    /// Register every function called from `blocks` as a device routine.
    pub(super) fn register_routines(&mut self, blocks: &[BlockId]) {
        let function = self.function;
        for call in function.calls_in(blocks) {
            let Some(callee) = call.callee.as_deref() else {
                continue;
            };
            if !self.routines.contains(callee) {
                discover_routines(self.module, self.config.family, self.routines, callee);
            }
        }
    }

    /// Pre-order walk of the tree under `root`. `visit` classifies one
    /// region and returns whether its children are walked next.
    ///
    /// Pending regions live on an explicit stack, so tree depth is bounded
    /// only by memory.
    pub(super) fn walk(&mut self, root: RegionId, visit: fn(&mut Self, RegionId) -> bool) {
        let function = self.function;
        let regions = function.regions();
        let mut pending = vec![root];
        while let Some(region) = pending.pop() {
            if visit(self, region) {
                pending.extend(regions.children(region).iter().rev().copied());
            }
        }
    }
}
