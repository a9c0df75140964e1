//! Programmatic construction of functions.
//!
//! Used by front ends that translate another compiler's IR, and by tests.

use super::cfg::{
    BasicBlock, BlockId, CallSite, FunctionIr, Linkage, LoopId, LoopNode, RegionId, RegionNode,
};
use super::function::Function;
use crate::utils::errors::IrError;

/// Builder for a [`Function`].
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    ir: FunctionIr,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ir: FunctionIr {
                name: name.into(),
                linkage: Linkage::Definition,
                blocks: Vec::new(),
                loops: Vec::new(),
                regions: Vec::new(),
            },
        }
    }

    pub fn set_linkage(&mut self, linkage: Linkage) -> &mut Self {
        self.ir.linkage = linkage;
        self
    }

    /// Append a block carrying the given debug lines.
    pub fn block(&mut self, lines: &[u32]) -> BlockId {
        let id = BlockId(self.ir.blocks.len() as u32);
        let mut block = BasicBlock::new(id);
        block.lines = lines.to_vec();
        self.ir.blocks.push(block);
        id
    }

    /// Add a direct call without a result.
    pub fn call(&mut self, block: BlockId, callee: &str) -> &mut Self {
        self.ir.blocks[block.index()].calls.push(CallSite::direct(callee));
        self
    }

    /// Add a direct call whose result is used.
    pub fn call_with_result(&mut self, block: BlockId, callee: &str) -> &mut Self {
        self.ir.blocks[block.index()].calls.push(CallSite {
            callee: Some(callee.to_string()),
            has_result: true,
        });
        self
    }

    /// Tag the block terminator as carrying no loop dependence.
    pub fn mark_parallel(&mut self, block: BlockId) -> &mut Self {
        self.ir.blocks[block.index()].tags.parallel = true;
        self
    }

    /// Tag the block terminator as divergent.
    pub fn mark_divergent(&mut self, block: BlockId) -> &mut Self {
        self.ir.blocks[block.index()].tags.divergent = true;
        self
    }

    pub fn add_loop(
        &mut self,
        parent: Option<LoopId>,
        header: BlockId,
        latch: Option<BlockId>,
        blocks: &[BlockId],
        start_line: Option<u32>,
    ) -> LoopId {
        let id = LoopId(self.ir.loops.len() as u32);
        self.ir.loops.push(LoopNode {
            id,
            header,
            latch,
            blocks: blocks.to_vec(),
            parent,
            start_line,
        });
        id
    }

    pub fn add_region(
        &mut self,
        parent: Option<RegionId>,
        entering: Option<BlockId>,
        blocks: &[BlockId],
    ) -> RegionId {
        self.push_region(parent, entering, blocks, false)
    }

    /// Add a region outside the tree, as a reconstructor would.
    pub fn add_detached_region(&mut self, entering: Option<BlockId>, blocks: &[BlockId]) -> RegionId {
        self.push_region(None, entering, blocks, true)
    }

    fn push_region(
        &mut self,
        parent: Option<RegionId>,
        entering: Option<BlockId>,
        blocks: &[BlockId],
        detached: bool,
    ) -> RegionId {
        let id = RegionId(self.ir.regions.len() as u32);
        self.ir.regions.push(RegionNode {
            id,
            parent,
            entering,
            blocks: blocks.to_vec(),
            detached,
        });
        id
    }

    pub fn build(self) -> Result<Function, IrError> {
        Function::from_ir(self.ir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_numbering() {
        let mut b = FunctionBuilder::new("g");
        let b0 = b.block(&[1]);
        let b1 = b.block(&[2, 3]);
        b.call(b1, "helper").mark_parallel(b1);
        let l0 = b.add_loop(None, b1, Some(b1), &[b1], Some(2));
        let r0 = b.add_region(None, None, &[b0, b1]);
        assert_eq!((b0, b1, l0, r0), (BlockId(0), BlockId(1), LoopId(0), RegionId(0)));

        let f = b.build().unwrap();
        assert!(f.block(b1).tags.parallel);
        assert_eq!(f.callees().collect::<Vec<_>>(), vec!["helper"]);
    }
}
