//! Compilation-unit driver.
//!
//! Runs the engine over every function of a module, one at a time, and owns
//! the state that outlives a single function: the routine set and the
//! statistics.

use super::engine::AnnotationEngine;
use super::routines::RoutineSet;
use super::stats::{Counter, Statistics, StatsAccumulator};
use crate::analysis::{has_any_loop_parallel_marked, is_loop_analyzable, Collaborators};
use crate::codegen::AnnotationMap;
use crate::ir::{Function, Module};
use crate::AnnotateConfig;
use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;

/// Directives produced for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionAnnotations {
    pub function: String,
    pub annotations: AnnotationMap,
}

/// Everything produced for a compilation unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnitReport {
    /// Functions that received at least one directive, in module order
    pub functions: Vec<FunctionAnnotations>,
    /// Directives requested through an external line list
    #[serde(skip_serializing_if = "AnnotationMap::is_empty")]
    pub external: AnnotationMap,
    /// Functions to compile for the device
    pub routines: RoutineSet,
    pub statistics: Statistics,
}

impl UnitReport {
    pub fn annotations_for(&self, function: &str) -> Option<&AnnotationMap> {
        self.functions
            .iter()
            .find(|f| f.function == function)
            .map(|f| &f.annotations)
    }

    /// All directives of the unit in one map, as the line rewriter consumes
    /// them for a single source file.
    pub fn merged(&self) -> AnnotationMap {
        let mut merged = self.external.clone();
        for f in &self.functions {
            merged.merge(&f.annotations);
        }
        merged
    }
}

/// Annotates the functions of one module.
pub struct Annotator<'a> {
    config: &'a AnnotateConfig,
    module: &'a Module,
    statistics: Statistics,
    routines: RoutineSet,
}

impl<'a> Annotator<'a> {
    pub fn new(config: &'a AnnotateConfig, module: &'a Module) -> Self {
        Self {
            config,
            module,
            statistics: Statistics::new(),
            routines: RoutineSet::new(),
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn routines(&self) -> &RoutineSet {
        &self.routines
    }

    /// Annotate a single function with fresh per-function state.
    pub fn annotate_function(
        &mut self,
        function: &Function,
        facts: &mut dyn Collaborators,
    ) -> AnnotationMap {
        if function.is_declaration() {
            return AnnotationMap::new();
        }
        self.count_loops(function, &*facts);

        let regions = function.regions();
        let top = function
            .blocks()
            .first()
            .and_then(|entry| regions.outermost_from(entry.id))
            .unwrap_or_else(|| regions.top());

        if !self.config.memory_coalescing
            && self.config.emit_parallel
            && !has_any_loop_parallel_marked(function, top)
        {
            debug!("{}: no parallel loops, skipping", function.name());
            return AnnotationMap::new();
        }

        let engine = AnnotationEngine::new(
            self.config,
            self.module,
            function,
            facts,
            &mut self.statistics,
            &mut self.routines,
        );
        let annotations = engine.run(top);
        info!("{}: {} annotated lines", function.name(), annotations.len());
        annotations
    }

    /// Count the loops of `function` and the value-producing calls inside
    /// its outermost analyzable loops.
    fn count_loops(&mut self, function: &Function, facts: &dyn Collaborators) {
        let mut seen = HashSet::new();
        for block in function.blocks() {
            if let Some(lp) = function.loop_for(block.id) {
                if seen.insert(lp) {
                    self.statistics.bump(Counter::Loops, 1);
                }
            }
        }

        for &root in function.loops().roots() {
            if !is_loop_analyzable(function, root, facts) {
                continue;
            }
            let calls = function
                .calls_in(&function.loops().get(root).blocks)
                .filter(|call| call.has_result)
                .count();
            self.statistics.bump(Counter::SafeLoopCalls, calls as u64);
        }
    }

    /// Annotate every function of the module in order.
    pub fn annotate_module(mut self, facts: &mut dyn Collaborators) -> UnitReport {
        let module = self.module;
        let mut functions = Vec::new();
        for function in module.functions() {
            let annotations = self.annotate_function(function, facts);
            if !annotations.is_empty() {
                functions.push(FunctionAnnotations {
                    function: function.name().to_string(),
                    annotations,
                });
            }
        }
        info!(
            "Annotated {} of {} functions, {} device routines",
            functions.len(),
            module.len(),
            self.routines.len()
        );
        UnitReport {
            functions,
            external: AnnotationMap::new(),
            routines: self.routines,
            statistics: self.statistics,
        }
    }
}
