//! Eligibility predicates over loops and regions.
//!
//! All predicates are pure: they read metadata from the program model and
//! facts from the side-effect analysis, and never fail. A malformed loop
//! simply answers "no".

use super::SideEffectAnalysis;
use crate::ir::{Function, LoopId, RegionId};
use crate::AnnotateConfig;
use std::collections::HashSet;

/// The loop's exit edge carries the parallel tag, regardless of divergence.
pub fn is_loop_parallel_marked(function: &Function, lp: LoopId) -> bool {
    match function.loops().get(lp).latch {
        Some(latch) => function.block(latch).tags.parallel,
        None => false,
    }
}

/// The loop is parallel and, when divergent loops are discarded, not divergent.
pub fn is_loop_parallel(function: &Function, lp: LoopId, config: &AnnotateConfig) -> bool {
    let Some(latch) = function.loops().get(lp).latch else {
        return false;
    };
    let tags = function.block(latch).tags;
    if !tags.parallel {
        return false;
    }
    !(config.discard_divergent && tags.divergent)
}

/// Every region touched by the loop has complete side-effect information.
pub fn is_loop_analyzable<S>(function: &Function, lp: LoopId, side_effects: &S) -> bool
where
    S: SideEffectAnalysis + ?Sized,
{
    let node = function.loops().get(lp);
    std::iter::once(node.header)
        .chain(node.blocks.iter().copied())
        .all(|block| match function.region_for(block) {
            Some(region) => side_effects.has_complete_side_effect_info(function, region),
            None => false,
        })
}

/// Whether the loops of a region may share one data-movement directive.
///
/// Without parallel emission coalescing is safe a priori; with it, every
/// loop inside the region must be parallel. A region without loops is
/// vacuously safe.
pub fn is_region_safe_for_coalescing(
    function: &Function,
    region: RegionId,
    config: &AnnotateConfig,
) -> bool {
    let regions = function.regions();
    if regions.get(region).entering.is_none() && !regions.is_top_level(region) {
        return false;
    }
    if !config.emit_parallel {
        return true;
    }
    let mut checked = HashSet::new();
    for block in &regions.get(region).blocks {
        let Some(lp) = function.loop_for(*block) else {
            continue;
        };
        if checked.insert(lp) && !is_loop_parallel(function, lp, config) {
            return false;
        }
    }
    true
}

/// Any block of the region ends in a parallel-tagged terminator.
pub fn has_any_loop_parallel_marked(function: &Function, region: RegionId) -> bool {
    function
        .regions()
        .get(region)
        .blocks
        .iter()
        .any(|b| function.block(*b).tags.parallel)
}
