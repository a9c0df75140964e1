//! Program model consumed by the annotation engine.
//!
//! Two related but distinct trees describe each function:
//! - the loop forest (natural loops and their sub-loops)
//! - the region tree (single-entry regions covering the control-flow graph)
//!
//! Both are arena-indexed and read-only once built. A region is mapped to
//! "its" loop through the loop membership of its entry block.

pub mod cfg;
pub mod loops;
pub mod regions;
pub mod function;
pub mod builder;

pub use cfg::{
    BasicBlock, BlockId, CallSite, FunctionIr, Linkage, LoopId, LoopNode, ModuleIr, RegionId,
    RegionNode, TerminatorTags,
};
pub use loops::LoopForest;
pub use regions::RegionTree;
pub use function::{Function, Module};
pub use builder::FunctionBuilder;
