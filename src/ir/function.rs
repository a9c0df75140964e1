//! Validated functions and compilation units.

use super::cfg::{
    BasicBlock, BlockId, CallSite, FunctionIr, Linkage, LoopId, ModuleIr, RegionId,
};
use super::loops::LoopForest;
use super::regions::RegionTree;
use crate::utils::errors::{IrError, IrErrorKind};
use std::collections::HashMap;

/// A function with its loop forest, region tree and the cross-reference
/// tables the engine needs.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    linkage: Linkage,
    blocks: Vec<BasicBlock>,
    loops: LoopForest,
    regions: RegionTree,
    /// Loop owning the entry block of each region
    region_owner: Vec<Option<LoopId>>,
}

impl Function {
    /// Validate a raw function.
    pub fn from_ir(ir: FunctionIr) -> Result<Self, IrError> {
        let FunctionIr { name, linkage, blocks, loops, regions } = ir;

        for (i, block) in blocks.iter().enumerate() {
            if block.id.index() != i {
                return Err(IrError::new(
                    IrErrorKind::MisnumberedNode,
                    &name,
                    format!("block at position {} is numbered {}", i, block.id),
                ));
            }
        }

        let loops = LoopForest::new(&name, loops, blocks.len())?;
        let regions = if regions.is_empty() {
            // Without region info the body is one flat region.
            RegionTree::flat(blocks.iter().map(|b| b.id).collect(), blocks.len())
        } else {
            RegionTree::new(&name, regions, blocks.len())?
        };

        let region_owner = (0..regions.len())
            .map(|i| {
                regions
                    .first_block(RegionId(i as u32))
                    .and_then(|b| loops.loop_for(b))
            })
            .collect();

        Ok(Self { name, linkage, blocks, loops, regions, region_owner })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn loops(&self) -> &LoopForest {
        &self.loops
    }

    pub fn regions(&self) -> &RegionTree {
        &self.regions
    }

    /// Loop that owns a region, through the membership of its entry block.
    pub fn owner_loop(&self, region: RegionId) -> Option<LoopId> {
        self.region_owner.get(region.index()).copied().flatten()
    }

    /// Innermost loop containing `block`.
    pub fn loop_for(&self, block: BlockId) -> Option<LoopId> {
        self.loops.loop_for(block)
    }

    /// Innermost region containing `block`.
    pub fn region_for(&self, block: BlockId) -> Option<RegionId> {
        self.regions.region_for(block)
    }

    /// Call sites found in the given blocks.
    pub fn calls_in<'a>(&'a self, blocks: &'a [BlockId]) -> impl Iterator<Item = &'a CallSite> + 'a {
        blocks.iter().flat_map(move |b| self.block(*b).calls.iter())
    }

    /// Names of every direct callee of the function.
    pub fn callees(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .flat_map(|b| b.calls.iter())
            .filter_map(|c| c.callee.as_deref())
    }

    /// Whether the function has a body in this unit.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty() || self.linkage == Linkage::Declaration
    }
}

/// A compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Module {
    functions: Vec<Function>,
    index: HashMap<String, usize>,
}

impl Module {
    /// Build a module from validated functions.
    pub fn new(functions: Vec<Function>) -> Result<Self, IrError> {
        let mut index = HashMap::with_capacity(functions.len());
        for (i, f) in functions.iter().enumerate() {
            if index.insert(f.name().to_string(), i).is_some() {
                return Err(IrError::new(
                    IrErrorKind::DuplicateFunction,
                    f.name(),
                    "function defined twice",
                ));
            }
        }
        Ok(Self { functions, index })
    }

    /// Validate a raw compilation unit.
    pub fn from_ir(ir: ModuleIr) -> Result<Self, IrError> {
        let functions = ir
            .functions
            .into_iter()
            .map(Function::from_ir)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(functions)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.index.get(name).map(|&i| &self.functions[i])
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
