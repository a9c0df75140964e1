//! Directive annotation engine.
//!
//! Two walks over the region tree share one engine:
//! - the loop-granular walk marks eligible loops as parallel
//! - the coalescing walk turns whole regions into offload kernels
//!
//! Both are driven per function by [`Annotator`], which also owns the
//! state that spans the compilation unit.

pub mod engine;
pub mod parallel;
pub mod coalescing;
pub mod routines;
pub mod stats;
pub mod driver;

pub use engine::AnnotationEngine;
pub use routines::{discover_routines, RoutineSet};
pub use stats::{Counter, Statistics, StatsAccumulator};
pub use driver::{Annotator, FunctionAnnotations, UnitReport};
