//! Region-granular walk for offload kernels.
//!
//! A committed region becomes one computation: its data directives are
//! merged, its outermost loops get kernel directives and the block is closed
//! after the region's last line. A region that cannot be analyzed as a whole
//! gets one retry through its reduced form before the walk moves to its
//! children.

use super::engine::AnnotationEngine;
use super::stats::Counter;
use crate::analysis::{is_loop_parallel_marked, is_region_safe_for_coalescing, ExtractRequest};
use crate::codegen::CLOSING_MARKER;
use crate::ir::{LoopId, RegionId};
use crate::utils::location::LineRange;
use log::{debug, trace};
use std::collections::HashSet;

impl AnnotationEngine<'_> {
    /// Classify `region` for coalescing and, unless it is committed, its
    /// descendants in tree order.
    pub fn descend_coalescing(&mut self, region: RegionId) {
        self.walk(region, Self::classify_coalescing_region);
    }

    /// Returns whether the walk continues into the children of `region`.
    fn classify_coalescing_region(&mut self, region: RegionId) -> bool {
        let function = self.function;
        let lines = self.facts.start_end_lines(function, region);

        if !is_region_safe_for_coalescing(function, region, self.config)
            || !self.facts.is_safely_nested(function, region)
        {
            trace!("{}: {} unsafe for coalescing", function.name(), region);
            return true;
        }

        let Some(lines) = lines else {
            trace!("{}: {} has no source lines", function.name(), region);
            return true;
        };

        let complete = self.facts.has_complete_side_effect_info(function, region)
            && self.facts.is_safe(function, region);
        if complete {
            self.write_computation(region, lines);
            return false;
        }

        if self.try_reduced_region(region) {
            return false;
        }
        trace!("{}: {} incomplete, descending", function.name(), region);
        true
    }

    /// Commit the reduced form of `region` if the reconstructor can build a
    /// safe one. Returns whether a commit was attempted.
    fn try_reduced_region(&mut self, region: RegionId) -> bool {
        let function = self.function;
        self.facts.analyze_reduced_region(function, region);
        let Some(reduced) = self.facts.reduced_region_of(function, region) else {
            return false;
        };
        if !self.facts.is_safe(function, reduced)
            || !self.facts.has_complete_side_effect_info(function, reduced)
        {
            return false;
        }
        let Some(lines) = self.facts.start_end_lines(function, reduced) else {
            return false;
        };
        debug!("{}: {} reduced to {} at {}", function.name(), region, reduced, lines);
        self.write_computation(reduced, lines);
        true
    }

    /// Extract `region` as one computation spanning `lines`.
    ///
    /// Returns whether the extraction succeeded.
    pub(super) fn write_computation(&mut self, region: RegionId, lines: LineRange) -> bool {
        let function = self.function;
        let computation = self.fresh_computation_name();
        let request = ExtractRequest {
            function,
            computation: &computation,
            start_line: lines.start,
            family: self.config.family,
        };
        let Some(extraction) = self.facts.extract_region(&request, region) else {
            debug!("{}: could not extract {} as {}", function.name(), region, computation);
            return false;
        };

        self.register_routines(&function.regions().get(region).blocks);
        self.annotations.merge(&extraction.comments);
        self.annotate_kernels(region, &computation, extraction.restrict);
        self.annotations.add(lines.end, CLOSING_MARKER);
        debug!("{}: {} at {} extracted as {}", function.name(), region, lines, computation);
        true
    }

    /// Put a kernels directive on each outermost loop whose header lies in
    /// `region`. Returns false only when the region is unsafe to coalesce.
    pub(super) fn annotate_kernels(&mut self, region: RegionId, computation: &str, restrict: bool) -> bool {
        let function = self.function;
        if !is_region_safe_for_coalescing(function, region, self.config) {
            return false;
        }
        let regions = function.regions();
        let loops = function.loops();
        let mut covered: HashSet<LoopId> = HashSet::new();

        for &block in &regions.get(region).blocks {
            let Some(innermost) = function.loop_for(block) else {
                continue;
            };
            if covered.contains(&innermost) {
                continue;
            }
            let mut outermost = None;
            let mut cursor = Some(innermost);
            while let Some(lp) = cursor {
                let node = loops.get(lp);
                if regions.contains_block(region, node.header) {
                    outermost = Some(lp);
                }
                cursor = node.parent;
            }
            let Some(outermost) = outermost else {
                continue;
            };
            if !covered.insert(outermost) {
                continue;
            }
            covered.extend(loops.nest(outermost));
            self.mark_analyzable(outermost);
            self.write_kernels(outermost, computation, restrict);
        }
        true
    }

    /// Kernels directive for one outermost loop of a committed region, plus
    /// parallel-loop directives when those are emitted.
    pub(super) fn write_kernels(&mut self, lp: LoopId, computation: &str, restrict: bool) {
        let function = self.function;
        let Some(line) = function.loops().get(lp).start_line else {
            trace!("{}: {} has no header line", function.name(), lp);
            return;
        };
        let kernels = self.config.family.kernels(restrict.then_some(computation));

        if !self.config.emit_parallel {
            if let Some(text) = kernels {
                self.annotations.add(line, &text);
                self.bump(Counter::AnnotatedLoops, 1);
            }
            return;
        }

        if !is_loop_parallel_marked(function, lp) {
            return;
        }
        let has_kernels = match kernels {
            Some(text) => self.annotations.add(line, &text),
            None => false,
        };
        let stamped = self.denote_loop_parallel(lp, "");
        if stamped == 0 && has_kernels {
            self.bump(Counter::AnnotatedLoops, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::{ExtractionFact, StaticFacts};
    use crate::annotate::{AnnotationEngine, RoutineSet, Statistics};
    use crate::codegen::{AnnotationMap, DirectiveFamily};
    use crate::ir::{Function, FunctionBuilder, Module, RegionId};
    use crate::utils::location::LineRange;
    use crate::AnnotateConfig;
    use std::collections::BTreeMap;

    fn coalescing() -> AnnotateConfig {
        AnnotateConfig { memory_coalescing: true, ..Default::default() }
    }

    fn run(module: &Module, name: &str, facts: &mut StaticFacts, config: &AnnotateConfig) -> (AnnotationMap, Statistics) {
        let function = module.function(name).unwrap();
        let mut stats = Statistics::new();
        let mut routines = RoutineSet::new();
        let engine = AnnotationEngine::new(config, module, function, facts, &mut stats, &mut routines);
        (engine.run(function.regions().top()), stats)
    }

    fn data_region(line: u32, restrict: bool) -> ExtractionFact {
        ExtractionFact {
            comments: BTreeMap::from([(line, "#pragma acc data pcopy(v[0:n])\n{\n".to_string())]),
            restrict,
            test: String::new(),
        }
    }

    struct Fixture {
        function: Function,
        top: RegionId,
        body: RegionId,
        reduced: RegionId,
    }

    /// entry(8) -> loop(header 10, body 11, latch 12) -> exit(20)
    /// `body` is the loop region, `reduced` a detached copy of it.
    fn fixture() -> Fixture {
        let mut b = FunctionBuilder::new("f");
        let entry = b.block(&[8]);
        let head = b.block(&[10]);
        let body = b.block(&[11]);
        let latch = b.block(&[12]);
        let exit = b.block(&[20]);
        b.mark_parallel(latch);
        b.add_loop(None, head, Some(latch), &[head, body, latch], Some(10));
        let top = b.add_region(None, None, &[entry, head, body, latch, exit]);
        let loop_region = b.add_region(Some(top), Some(entry), &[head, body, latch]);
        let reduced = b.add_detached_region(Some(entry), &[head, body, latch]);
        Fixture { function: b.build().unwrap(), top, body: loop_region, reduced }
    }

    #[test]
    fn test_region_committed_with_kernels_and_closing_marker() {
        let fx = fixture();
        let module = Module::new(vec![fx.function]).unwrap();
        let mut facts = StaticFacts::new();
        facts.function_mut("f").region_extractions.insert(fx.top, data_region(9, true));

        let (annotations, stats) = run(&module, "f", &mut facts, &coalescing());
        assert_eq!(annotations.get(9), Some("#pragma acc data pcopy(v[0:n])\n{\n"));
        assert_eq!(annotations.get(10), Some("#pragma acc kernels if(!RST_AI1)\n"));
        assert_eq!(annotations.get(21), Some("}\n"));
        assert_eq!(stats.analyzable_loops, 1);
        assert_eq!(stats.annotated_loops, 1);
    }

    #[test]
    fn test_reduced_region_bounds_used() {
        let fx = fixture();
        let module = Module::new(vec![fx.function]).unwrap();
        let mut facts = StaticFacts::new();
        let f = facts.function_mut("f");
        f.incomplete_side_effects.insert(fx.top);
        f.incomplete_side_effects.insert(fx.body);
        f.scope_lines.insert(fx.body, LineRange::new(9, 16));
        f.scope_lines.insert(fx.reduced, LineRange::new(10, 13));
        f.reduced_regions.insert(fx.body, fx.reduced);
        f.region_extractions.insert(fx.reduced, data_region(10, false));

        let (annotations, _) = run(&module, "f", &mut facts, &coalescing());
        assert_eq!(annotations.get(13), Some("}\n"));
        assert_eq!(annotations.get(16), None);
        assert_eq!(
            annotations.get(10),
            Some("#pragma acc data pcopy(v[0:n])\n{\n#pragma acc kernels\n")
        );
    }

    #[test]
    fn test_unsafe_reduction_falls_back_to_children() {
        let fx = fixture();
        let module = Module::new(vec![fx.function]).unwrap();
        let mut facts = StaticFacts::new();
        let f = facts.function_mut("f");
        f.incomplete_side_effects.insert(fx.top);
        f.reduced_regions.insert(fx.top, fx.reduced);
        f.unsafe_reductions.insert(fx.reduced);
        f.region_extractions.insert(fx.body, data_region(10, false));

        let (annotations, _) = run(&module, "f", &mut facts, &coalescing());
        assert_eq!(annotations.get(13), Some("}\n"));
        assert_eq!(annotations.get(21), None);
    }

    #[test]
    fn test_unsafe_scope_commits_child_instead() {
        let fx = fixture();
        let module = Module::new(vec![fx.function]).unwrap();
        let mut facts = StaticFacts::new();
        let f = facts.function_mut("f");
        f.unsafe_scopes.insert(fx.top);
        f.region_extractions.insert(fx.top, data_region(9, false));
        f.region_extractions.insert(fx.body, data_region(10, false));

        let (annotations, stats) = run(&module, "f", &mut facts, &coalescing());
        assert_eq!(annotations.get(9), None);
        assert_eq!(annotations.get(21), None);
        assert_eq!(
            annotations.get(10),
            Some("#pragma acc data pcopy(v[0:n])\n{\n#pragma acc kernels\n")
        );
        assert_eq!(annotations.get(13), Some("}\n"));
        assert_eq!(stats.annotated_loops, 1);
    }

    #[test]
    fn test_failed_reduced_extraction_is_terminal() {
        let fx = fixture();
        let module = Module::new(vec![fx.function]).unwrap();
        let mut facts = StaticFacts::new();
        let f = facts.function_mut("f");
        f.incomplete_side_effects.insert(fx.top);
        f.reduced_regions.insert(fx.top, fx.reduced);
        f.region_extractions.insert(fx.body, data_region(10, false));

        let (annotations, stats) = run(&module, "f", &mut facts, &coalescing());
        assert!(annotations.is_empty());
        assert_eq!(stats.annotated_loops, 0);
        assert!(facts.function("f").unwrap().is_analyzed(fx.reduced));
    }

    #[test]
    fn test_failed_extraction_leaves_no_marker() {
        let fx = fixture();
        let module = Module::new(vec![fx.function]).unwrap();
        let mut facts = StaticFacts::new();

        let (annotations, stats) = run(&module, "f", &mut facts, &coalescing());
        assert!(annotations.is_empty());
        assert_eq!(stats.annotated_loops, 0);
    }

    #[test]
    fn test_sibling_loops_evaluated_separately() {
        // Two sibling loops, only the second parallel-marked.
        let mut b = FunctionBuilder::new("g");
        let entry = b.block(&[1]);
        let a_head = b.block(&[2]);
        let a_latch = b.block(&[3]);
        let b_head = b.block(&[5]);
        let b_latch = b.block(&[6]);
        let exit = b.block(&[8]);
        b.mark_parallel(b_latch);
        b.add_loop(None, a_head, Some(a_latch), &[a_head, a_latch], Some(2));
        b.add_loop(None, b_head, Some(b_latch), &[b_head, b_latch], Some(5));
        let top = b.add_region(None, None, &[entry, a_head, a_latch, b_head, b_latch, exit]);
        let ra = b.add_region(Some(top), Some(entry), &[a_head, a_latch]);
        let rb = b.add_region(Some(top), Some(a_latch), &[b_head, b_latch]);
        let module = Module::new(vec![b.build().unwrap()]).unwrap();

        let mut facts = StaticFacts::new();
        let g = facts.function_mut("g");
        g.region_extractions.insert(top, data_region(1, false));
        g.region_extractions.insert(ra, data_region(2, false));
        g.region_extractions.insert(rb, data_region(5, false));
        let config = AnnotateConfig { emit_parallel: true, ..coalescing() };

        let (annotations, stats) = run(&module, "g", &mut facts, &config);
        assert_eq!(annotations.get(1), None);
        assert_eq!(annotations.get(2), None);
        assert_eq!(
            annotations.get(5),
            Some("#pragma acc data pcopy(v[0:n])\n{\n#pragma acc kernels\n#pragma acc loop independent\n")
        );
        assert_eq!(annotations.get(7), Some("}\n"));
        assert_eq!(stats.annotated_loops, 1);
    }

    #[test]
    fn test_openmp_family_has_no_kernels() {
        let fx = fixture();
        let module = Module::new(vec![fx.function]).unwrap();
        let mut facts = StaticFacts::new();
        facts.function_mut("f").region_extractions.insert(fx.top, data_region(9, false));
        let config = AnnotateConfig {
            emit_parallel: true,
            family: DirectiveFamily::OpenMpGpu,
            ..coalescing()
        };

        let (annotations, stats) = run(&module, "f", &mut facts, &config);
        assert_eq!(annotations.get(10), Some("#pragma omp parallel for\n"));
        assert_eq!(annotations.get(21), Some("}\n"));
        assert_eq!(stats.annotated_loops, 1);
    }
}
