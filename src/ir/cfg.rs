//! Control-flow facts consumed by the annotation engine.
//!
//! The engine never builds these itself; an upstream compiler pass produces
//! them (blocks with debug lines, call sites and terminator metadata, plus
//! the loop nest and region tree) and hands them over read-only.

use serde::{Serialize, Deserialize};
use std::fmt;

macro_rules! node_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(id: u32) -> Self { Self(id) }

            /// Position of the node in its arena.
            pub fn index(self) -> usize { self.0 as usize }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

node_id!(
    /// Index of a basic block within its function.
    BlockId, "bb"
);
node_id!(
    /// Index of a loop within its function's loop forest.
    LoopId, "L"
);
node_id!(
    /// Index of a region within its function's region tree.
    RegionId, "R"
);

/// Metadata attached to a block terminator by loop-carried-dependence analysis.
///
/// On a loop latch these describe the loop's exit edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminatorTags {
    /// Iterations carry no dependence
    pub parallel: bool,
    /// Iterations may take different control paths
    pub divergent: bool,
}

/// A call instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Statically known callee, `None` for indirect calls
    #[serde(default)]
    pub callee: Option<String>,
    /// Whether the call produces a value
    #[serde(default)]
    pub has_result: bool,
}

impl CallSite {
    pub fn direct(callee: impl Into<String>) -> Self {
        Self { callee: Some(callee.into()), has_result: false }
    }
}

/// A basic block, reduced to what the engine inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    /// Debug lines of the block's instructions
    #[serde(default)]
    pub lines: Vec<u32>,
    #[serde(default)]
    pub calls: Vec<CallSite>,
    #[serde(default)]
    pub tags: TerminatorTags,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            lines: Vec::new(),
            calls: Vec::new(),
            tags: TerminatorTags::default(),
        }
    }

    /// Highest debug line in the block.
    pub fn max_line(&self) -> Option<u32> {
        self.lines.iter().copied().max()
    }
}

/// Linkage of a function, deciding whether its body may be offloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Body defined in this unit
    #[default]
    Definition,
    /// Declaration only, body elsewhere
    Declaration,
    /// Compiler intrinsic
    Intrinsic,
    /// Body visible but owned by another unit
    AvailableExternally,
}

impl Linkage {
    /// Only functions whose body lives in this unit can become device routines.
    pub fn is_offloadable(&self) -> bool {
        matches!(self, Linkage::Definition)
    }
}

/// A natural loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopNode {
    pub id: LoopId,
    pub header: BlockId,
    /// Block holding the back edge; malformed loops have none
    #[serde(default)]
    pub latch: Option<BlockId>,
    /// Every block of the loop, sub-loops included
    pub blocks: Vec<BlockId>,
    /// Enclosing loop
    #[serde(default)]
    pub parent: Option<LoopId>,
    /// Line of the loop header in the source
    #[serde(default)]
    pub start_line: Option<u32>,
}

/// A single-entry region of the control-flow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionNode {
    pub id: RegionId,
    #[serde(default)]
    pub parent: Option<RegionId>,
    /// Block the entry edge comes from
    #[serde(default)]
    pub entering: Option<BlockId>,
    /// Every block of the region, nested regions included; the first is the entry
    pub blocks: Vec<BlockId>,
    /// Region built by the reconstructor outside the tree
    #[serde(default)]
    pub detached: bool,
}

/// Raw function as produced upstream, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionIr {
    pub name: String,
    #[serde(default)]
    pub linkage: Linkage,
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
    #[serde(default)]
    pub loops: Vec<LoopNode>,
    #[serde(default)]
    pub regions: Vec<RegionNode>,
}

/// Raw compilation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleIr {
    #[serde(default)]
    pub functions: Vec<FunctionIr>,
}
