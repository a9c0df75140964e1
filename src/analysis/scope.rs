//! Source scopes derived from debug lines.
//!
//! A region starts at the header line of the first loop it touches and ends
//! one line past its last instruction. This is the fallback used when no
//! dedicated scope tree is available.

use super::ScopeResolver;
use crate::ir::{Function, LoopId, RegionId};
use crate::utils::location::LineRange;
use std::collections::BTreeSet;

/// Loops owning at least one block of the region, innermost per block.
fn loops_touching(function: &Function, region: RegionId) -> BTreeSet<LoopId> {
    function
        .regions()
        .get(region)
        .blocks
        .iter()
        .filter_map(|b| function.loop_for(*b))
        .collect()
}

/// Smallest header line among the loops touching the region.
pub fn region_start_line(function: &Function, region: RegionId) -> Option<u32> {
    loops_touching(function, region)
        .into_iter()
        .filter_map(|lp| function.loops().get(lp).start_line)
        .min()
}

/// First line after the region's last instruction.
///
/// `None` when the region has no debug lines, or when its last line is the
/// largest representable one and nothing can follow it.
pub fn region_end_line(function: &Function, region: RegionId) -> Option<u32> {
    function
        .regions()
        .get(region)
        .blocks
        .iter()
        .filter_map(|b| function.block(*b).max_line())
        .max()
        .and_then(|line| line.checked_add(1))
}

/// A region's boundary never cuts through a loop: each loop it touches lies
/// either fully inside the region or fully around it.
pub fn loops_nest_cleanly(function: &Function, region: RegionId) -> bool {
    let regions = function.regions();
    let region_blocks = &regions.get(region).blocks;
    let mut seen = BTreeSet::new();
    for lp in loops_touching(function, region) {
        let mut cursor = Some(lp);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                break;
            }
            let node = function.loops().get(current);
            let inside = node.blocks.iter().all(|b| regions.contains_block(region, *b));
            let around = region_blocks
                .iter()
                .all(|b| function.loops().contains_block(current, *b));
            if !inside && !around {
                return false;
            }
            cursor = node.parent;
        }
    }
    true
}

/// [`ScopeResolver`] backed only by debug lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugLineScopes;

impl ScopeResolver for DebugLineScopes {
    fn start_end_lines(&self, function: &Function, region: RegionId) -> Option<LineRange> {
        let start = region_start_line(function, region)?;
        let end = region_end_line(function, region)?;
        Some(LineRange::new(start, end.max(start.checked_add(1)?)))
    }

    fn is_safely_nested(&self, function: &Function, region: RegionId) -> bool {
        loops_nest_cleanly(function, region)
    }
}
