//! Analysis facts consumed by the annotation engine.
//!
//! The engine depends on four upstream collaborators, each behind a trait:
//! - side-effect summaries per region ([`SideEffectAnalysis`])
//! - reduced-region reconstruction ([`RegionReconstructor`])
//! - source scope resolution ([`ScopeResolver`])
//! - computation extraction ([`ComputationExtractor`])
//!
//! The eligibility predicates in [`predicates`] combine those facts with the
//! metadata attached to the program model.

pub mod predicates;
pub mod scope;
pub mod facts;

pub use predicates::{
    has_any_loop_parallel_marked, is_loop_analyzable, is_loop_parallel,
    is_loop_parallel_marked, is_region_safe_for_coalescing,
};
pub use scope::DebugLineScopes;
pub use facts::{ExtractionFact, FunctionFacts, StaticFacts};

use crate::codegen::{AnnotationMap, DirectiveFamily};
use crate::ir::{Function, LoopId, RegionId};
use crate::utils::location::LineRange;

/// Per-region summary of which memory a region may touch.
pub trait SideEffectAnalysis {
    /// Whether every access of the region could be bounded.
    fn has_complete_side_effect_info(&self, function: &Function, region: RegionId) -> bool;

    /// Compute side-effect information for the reduced form of `region`,
    /// making it queryable afterwards.
    fn analyze_reduced_region(&mut self, function: &Function, region: RegionId);
}

/// Builds a smaller, analyzable region out of one that is not.
pub trait RegionReconstructor {
    fn reduced_region_of(&self, function: &Function, region: RegionId) -> Option<RegionId>;

    fn is_safe(&self, function: &Function, region: RegionId) -> bool;
}

/// Maps regions to the source scopes that enclose them.
pub trait ScopeResolver {
    /// Lines a region spans, end exclusive.
    fn start_end_lines(&self, function: &Function, region: RegionId) -> Option<LineRange>;

    /// Whether the region's loops nest cleanly inside source scopes.
    fn is_safely_nested(&self, function: &Function, region: RegionId) -> bool;
}

/// Input handed to the computation extractor for one commit attempt.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    pub function: &'a Function,
    /// Fresh name of the computation (`AI<n>`)
    pub computation: &'a str,
    /// Line at which the computation starts
    pub start_line: u32,
    pub family: DirectiveFamily,
}

/// Successful extraction of a loop or region into a computation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Declarations and data directives to insert
    pub comments: AnnotationMap,
    /// A runtime pointer-overlap test guards the computation
    pub restrict: bool,
    /// Guard clause appended to parallel-loop directives
    pub test: String,
}

/// Rewrites a loop or region into a computation unit and produces the
/// text to insert around it. `None` means the code could not be extracted.
pub trait ComputationExtractor {
    fn extract_loop(&mut self, request: &ExtractRequest<'_>, lp: LoopId) -> Option<Extraction>;

    fn extract_region(&mut self, request: &ExtractRequest<'_>, region: RegionId) -> Option<Extraction>;
}

/// Everything the engine needs from upstream, as one object.
pub trait Collaborators:
    SideEffectAnalysis + RegionReconstructor + ScopeResolver + ComputationExtractor
{
}

impl<T> Collaborators for T where
    T: SideEffectAnalysis + RegionReconstructor + ScopeResolver + ComputationExtractor + ?Sized
{
}
