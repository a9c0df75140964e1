//! Loop-granular walk.
//!
//! Each region is mapped to the loop owning its entry block. The first
//! eligible loop on a path is extracted as one computation and the walk
//! stops there; ineligible regions pass the walk on to their children.

use super::engine::AnnotationEngine;
use crate::analysis::{is_loop_analyzable, is_loop_parallel, ExtractRequest};
use crate::ir::RegionId;
use log::{debug, trace};

impl AnnotationEngine<'_> {
    /// Classify `region` and, unless it is committed or abandoned, its
    /// descendants in tree order.
    pub fn descend(&mut self, region: RegionId) {
        self.walk(region, Self::classify_loop_region);
    }

    /// Returns whether the walk continues into the children of `region`.
    fn classify_loop_region(&mut self, region: RegionId) -> bool {
        let function = self.function;
        let Some(lp) = function.owner_loop(region) else {
            trace!("{}: {} is not inside a loop", function.name(), region);
            return true;
        };

        if self.config.emit_parallel && !is_loop_parallel(function, lp, self.config) {
            trace!("{}: {} owned by sequential {}", function.name(), region, lp);
            return true;
        }

        if !is_loop_analyzable(function, lp, &*self.facts)
            || !self.facts.is_safely_nested(function, region)
        {
            trace!("{}: {} not analyzable", function.name(), lp);
            return true;
        }

        self.mark_analyzable(lp);

        let node = function.loops().get(lp);
        let Some(start_line) = node.start_line else {
            debug!("{}: {} has no source line, skipping", function.name(), lp);
            return false;
        };

        let computation = self.fresh_computation_name();
        let request = ExtractRequest {
            function,
            computation: &computation,
            start_line,
            family: self.config.family,
        };
        let Some(extraction) = self.facts.extract_loop(&request, lp) else {
            debug!("{}: could not extract {} as {}", function.name(), lp, computation);
            return false;
        };

        self.register_routines(&node.blocks);
        self.annotations.merge(&extraction.comments);
        if self.config.emit_parallel {
            self.denote_loop_parallel(lp, &extraction.test);
        } else {
            self.mark_annotated(lp);
        }
        debug!("{}: {} at line {} extracted as {}", function.name(), lp, start_line, computation);
        false
    }
}
