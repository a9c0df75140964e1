//! Region tree.
//!
//! Regions nest like structured control flow and together cover the whole
//! function. Detached regions are kept in the same arena but sit outside the
//! tree: they are the reduced regions a reconstructor builds when an original
//! region is not analyzable.

use super::cfg::{BlockId, RegionId, RegionNode};
use crate::utils::errors::{IrError, IrErrorKind};
use std::collections::HashSet;

/// All regions of a function.
#[derive(Debug, Clone)]
pub struct RegionTree {
    regions: Vec<RegionNode>,
    children: Vec<Vec<RegionId>>,
    top: RegionId,
    members: Vec<HashSet<BlockId>>,
    /// Innermost attached region containing each block
    innermost: Vec<Option<RegionId>>,
}

impl RegionTree {
    /// Validate the regions of `function` and build the lookup tables.
    pub fn new(function: &str, regions: Vec<RegionNode>, num_blocks: usize) -> Result<Self, IrError> {
        let n = regions.len();
        for (i, region) in regions.iter().enumerate() {
            if region.id.index() != i {
                return Err(IrError::new(
                    IrErrorKind::MisnumberedNode,
                    function,
                    format!("region at position {} is numbered {}", i, region.id),
                ));
            }
            let dangling = region
                .entering
                .into_iter()
                .chain(region.blocks.iter().copied())
                .find(|b| b.index() >= num_blocks);
            if let Some(block) = dangling {
                return Err(IrError::new(
                    IrErrorKind::DanglingBlock,
                    function,
                    format!("region {} references {}", region.id, block),
                ));
            }
            if let Some(parent) = region.parent {
                if parent.index() >= n || regions[parent.index()].detached != region.detached {
                    return Err(IrError::new(
                        IrErrorKind::DanglingRegion,
                        function,
                        format!("region {} has invalid parent {}", region.id, parent),
                    ));
                }
            }
        }

        let mut depth = vec![0usize; n];
        for region in &regions {
            let mut d = 0;
            let mut cursor = region.parent;
            while let Some(p) = cursor {
                d += 1;
                if d > n {
                    return Err(IrError::new(
                        IrErrorKind::CyclicRegionTree,
                        function,
                        format!("region {} is nested inside itself", region.id),
                    ));
                }
                cursor = regions[p.index()].parent;
            }
            depth[region.id.index()] = d;
        }

        let tops: Vec<RegionId> = regions
            .iter()
            .filter(|r| r.parent.is_none() && !r.detached)
            .map(|r| r.id)
            .collect();
        let top = match tops.as_slice() {
            [top] => *top,
            [] => {
                return Err(IrError::new(
                    IrErrorKind::MissingTopRegion,
                    function,
                    "no top-level region",
                ))
            }
            _ => {
                return Err(IrError::new(
                    IrErrorKind::MultipleTopRegions,
                    function,
                    format!("{} regions without a parent", tops.len()),
                ))
            }
        };

        let mut children = vec![Vec::new(); n];
        for region in &regions {
            if let Some(p) = region.parent {
                children[p.index()].push(region.id);
            }
        }

        let mut attached: Vec<&RegionNode> = regions.iter().filter(|r| !r.detached).collect();
        attached.sort_by_key(|r| depth[r.id.index()]);
        let mut innermost = vec![None; num_blocks];
        for region in attached {
            for block in &region.blocks {
                innermost[block.index()] = Some(region.id);
            }
        }

        let members = regions
            .iter()
            .map(|r| r.blocks.iter().copied().collect())
            .collect();

        Ok(Self { regions, children, top, members, innermost })
    }

    /// A single top region covering `blocks`.
    pub fn flat(blocks: Vec<BlockId>, num_blocks: usize) -> Self {
        let top = RegionId(0);
        let mut innermost = vec![None; num_blocks];
        for block in &blocks {
            innermost[block.index()] = Some(top);
        }
        let members = vec![blocks.iter().copied().collect()];
        Self {
            regions: vec![RegionNode { id: top, parent: None, entering: None, blocks, detached: false }],
            children: vec![Vec::new()],
            top,
            members,
            innermost,
        }
    }

    /// Get a region by id.
    pub fn get(&self, id: RegionId) -> &RegionNode {
        &self.regions[id.index()]
    }

    /// Child regions, in declaration order.
    pub fn children(&self, id: RegionId) -> &[RegionId] {
        &self.children[id.index()]
    }

    /// The function's outermost region.
    pub fn top(&self) -> RegionId {
        self.top
    }

    pub fn is_top_level(&self, id: RegionId) -> bool {
        id == self.top
    }

    pub fn is_detached(&self, id: RegionId) -> bool {
        self.get(id).detached
    }

    /// Entry block of a region.
    pub fn first_block(&self, id: RegionId) -> Option<BlockId> {
        self.get(id).blocks.first().copied()
    }

    /// Innermost attached region containing `block`.
    pub fn region_for(&self, block: BlockId) -> Option<RegionId> {
        self.innermost.get(block.index()).copied().flatten()
    }

    /// Walk parent links from the region holding `block` up to the root.
    pub fn outermost_from(&self, block: BlockId) -> Option<RegionId> {
        let mut region = self.region_for(block)?;
        while let Some(parent) = self.get(region).parent {
            region = parent;
        }
        Some(region)
    }

    pub fn contains_block(&self, id: RegionId, block: BlockId) -> bool {
        self.members[id.index()].contains(&block)
    }

    /// Number of regions, detached ones included.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
