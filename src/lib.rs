//! # autopar - Parallel Directive Annotation Engine
//!
//! Decides which loops and regions of a compiled program can carry
//! parallel-loop or offload directives, and produces the directive text to
//! insert in front of each source line:
//! - parallel-loop marking for loops whose iterations are independent
//! - offload kernels for whole regions whose memory footprint is known
//! - device routine discovery over the static call graph
//!
//! ## Architecture
//!
//! ```text
//! Program model + analysis facts → Region walk → AnnotationMap → Line rewriter
//! ```
//!
//! The engine never fails on analysis outcomes: an ineligible loop or
//! region only narrows the walk. Errors are limited to malformed input.
//!
//! ## Example
//!
//! ```rust,ignore
//! use autopar::prelude::*;
//!
//! let (module, mut facts) = autopar::load_input(&json)?;
//! let config = AnnotateConfig { emit_parallel: true, ..Default::default() };
//! let report = autopar::annotate(&module, &mut facts, &config)?;
//! print!("{}", report.merged());
//! ```

#![warn(clippy::all)]

pub mod ir;
pub mod analysis;
pub mod codegen;
pub mod annotate;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::ir::{
        BlockId, Function, FunctionBuilder, LoopId, Module, ModuleIr, RegionId,
    };
    pub use crate::analysis::{
        Collaborators, ComputationExtractor, RegionReconstructor, ScopeResolver,
        SideEffectAnalysis, StaticFacts,
    };
    pub use crate::codegen::{AnnotationMap, DirectiveFamily};
    pub use crate::annotate::{Annotator, RoutineSet, Statistics, UnitReport};
    pub use crate::utils::errors::*;
    pub use crate::AnnotateConfig;
}

use analysis::{Collaborators, StaticFacts};
use annotate::{Annotator, UnitReport};
use anyhow::{Context, Result};
use codegen::DirectiveFamily;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use utils::errors::AnnotateResult;

/// Configuration for the annotation engine.
#[derive(Debug, Clone, Default)]
pub struct AnnotateConfig {
    /// Emit parallel-loop directives and require loops to be marked parallel
    pub emit_parallel: bool,
    /// Directive family to emit
    pub family: DirectiveFamily,
    /// Line list that replaces the analysis entirely
    pub parallel_file: Option<PathBuf>,
    /// Treat divergent loops as not parallel
    pub discard_divergent: bool,
    /// Annotate whole regions as offload kernels instead of single loops
    pub memory_coalescing: bool,
}

/// On-disk input: the program model and the facts about it.
#[derive(Debug, Deserialize)]
pub struct AnalysisInput {
    pub module: ir::ModuleIr,
    #[serde(default)]
    pub facts: StaticFacts,
}

impl AnalysisInput {
    /// Parse a JSON document and validate its program model.
    pub fn from_json(json: &str) -> AnnotateResult<(ir::Module, StaticFacts)> {
        let input: AnalysisInput = serde_json::from_str(json)?;
        let module = ir::Module::from_ir(input.module)?;
        Ok((module, input.facts))
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse and validate a JSON input document.
pub fn load_input(json: &str) -> Result<(ir::Module, StaticFacts)> {
    AnalysisInput::from_json(json).context("Invalid input document")
}

/// Read, parse and validate a JSON input file.
pub fn load_input_file(path: &Path) -> Result<(ir::Module, StaticFacts)> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {:?}", path))?;
    load_input(&json)
}

/// Annotate a compilation unit.
///
/// With a parallel line list configured the analysis is bypassed and only
/// the listed lines are annotated.
pub fn annotate(
    module: &ir::Module,
    facts: &mut dyn Collaborators,
    config: &AnnotateConfig,
) -> Result<UnitReport> {
    if let Some(path) = &config.parallel_file {
        let external = codegen::read_parallel_lines(path, config.family)
            .with_context(|| format!("Failed to read parallel lines: {:?}", path))?;
        info!("Using {} externally parallel lines", external.len());
        return Ok(UnitReport { external, ..Default::default() });
    }
    Ok(Annotator::new(config, module).annotate_module(facts))
}
