//! Loop nest forest.
//!
//! Loops live in an arena indexed by [`LoopId`]; nesting is expressed through
//! parent links only, and the child lists plus the innermost-loop-of-block
//! table are derived once at construction.

use super::cfg::{BlockId, LoopId, LoopNode};
use crate::utils::errors::{IrError, IrErrorKind};
use std::collections::{HashSet, VecDeque};

/// All loops of a function.
#[derive(Debug, Clone)]
pub struct LoopForest {
    loops: Vec<LoopNode>,
    sub_loops: Vec<Vec<LoopId>>,
    roots: Vec<LoopId>,
    members: Vec<HashSet<BlockId>>,
    /// Innermost loop containing each block
    owner: Vec<Option<LoopId>>,
}

impl LoopForest {
    /// Validate the loops of `function` and build the lookup tables.
    pub fn new(function: &str, mut loops: Vec<LoopNode>, num_blocks: usize) -> Result<Self, IrError> {
        let n = loops.len();
        for (i, lp) in loops.iter_mut().enumerate() {
            if lp.id.index() != i {
                return Err(IrError::new(
                    IrErrorKind::MisnumberedNode,
                    function,
                    format!("loop at position {} is numbered {}", i, lp.id),
                ));
            }
            let dangling = std::iter::once(lp.header)
                .chain(lp.latch)
                .chain(lp.blocks.iter().copied())
                .find(|b| b.index() >= num_blocks);
            if let Some(block) = dangling {
                return Err(IrError::new(
                    IrErrorKind::DanglingBlock,
                    function,
                    format!("loop {} references {}", lp.id, block),
                ));
            }
            if let Some(parent) = lp.parent {
                if parent.index() >= n {
                    return Err(IrError::new(
                        IrErrorKind::DanglingLoop,
                        function,
                        format!("loop {} has unknown parent {}", lp.id, parent),
                    ));
                }
            }
            if !lp.blocks.contains(&lp.header) {
                lp.blocks.insert(0, lp.header);
            }
        }

        let mut depth = Vec::with_capacity(n);
        for lp in &loops {
            let mut d = 0;
            let mut cursor = lp.parent;
            while let Some(p) = cursor {
                d += 1;
                if d > n {
                    return Err(IrError::new(
                        IrErrorKind::CyclicLoopNest,
                        function,
                        format!("loop {} is nested inside itself", lp.id),
                    ));
                }
                cursor = loops[p.index()].parent;
            }
            depth.push(d);
        }

        let mut sub_loops = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for lp in &loops {
            match lp.parent {
                Some(p) => sub_loops[p.index()].push(lp.id),
                None => roots.push(lp.id),
            }
        }

        // Deeper loops overwrite their ancestors.
        let mut by_depth: Vec<LoopId> = loops.iter().map(|l| l.id).collect();
        by_depth.sort_by_key(|id| depth[id.index()]);
        let mut owner = vec![None; num_blocks];
        for id in by_depth {
            for block in &loops[id.index()].blocks {
                owner[block.index()] = Some(id);
            }
        }

        let members = loops
            .iter()
            .map(|l| l.blocks.iter().copied().collect())
            .collect();

        Ok(Self { loops, sub_loops, roots, members, owner })
    }

    /// Get a loop by id.
    pub fn get(&self, id: LoopId) -> &LoopNode {
        &self.loops[id.index()]
    }

    /// Direct sub-loops of a loop.
    pub fn sub_loops(&self, id: LoopId) -> &[LoopId] {
        &self.sub_loops[id.index()]
    }

    /// Outermost loops.
    pub fn roots(&self) -> &[LoopId] {
        &self.roots
    }

    /// Innermost loop containing `block`.
    pub fn loop_for(&self, block: BlockId) -> Option<LoopId> {
        self.owner.get(block.index()).copied().flatten()
    }

    /// Check if `block` belongs to the loop or one of its sub-loops.
    pub fn contains_block(&self, id: LoopId, block: BlockId) -> bool {
        self.members[id.index()].contains(&block)
    }

    /// The loop followed by all its transitive sub-loops, breadth first.
    pub fn nest(&self, id: LoopId) -> Vec<LoopId> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            queue.extend(self.sub_loops(current).iter().copied());
        }
        order
    }

    /// Number of loops.
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}
