//! Table-driven collaborator.
//!
//! `StaticFacts` answers every collaborator query from precomputed tables,
//! keyed by function name. It is what the command-line driver loads from
//! JSON next to the program model, and what tests use to script scenarios.
//! Anything not listed takes the permissive default: side effects are
//! complete, regions are safe, lines come from debug info. Extraction is
//! the exception: a loop or region without an entry cannot be extracted.

use super::scope::DebugLineScopes;
use super::{
    ComputationExtractor, Extraction, ExtractRequest, RegionReconstructor, ScopeResolver,
    SideEffectAnalysis,
};
use crate::codegen::AnnotationMap;
use crate::ir::{Function, LoopId, RegionId};
use crate::utils::location::LineRange;
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Placeholder replaced by the computation name in extraction texts.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// A scripted extraction result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionFact {
    /// Text to insert, keyed by line
    pub comments: BTreeMap<u32, String>,
    pub restrict: bool,
    pub test: String,
}

impl ExtractionFact {
    fn instantiate(&self, computation: &str) -> Extraction {
        let mut comments = AnnotationMap::new();
        for (line, text) in &self.comments {
            comments.add(*line, &text.replace(NAME_PLACEHOLDER, computation));
        }
        Extraction {
            comments,
            restrict: self.restrict,
            test: self.test.replace(NAME_PLACEHOLDER, computation),
        }
    }
}

/// Facts about one function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionFacts {
    /// Regions whose accesses could not all be bounded
    pub incomplete_side_effects: BTreeSet<RegionId>,
    /// Reduced region the reconstructor builds for an original region
    pub reduced_regions: BTreeMap<RegionId, RegionId>,
    /// Regions the reconstructor deems unsafe
    pub unsafe_reductions: BTreeSet<RegionId>,
    /// Regions whose loops do not nest inside source scopes
    pub unsafe_scopes: BTreeSet<RegionId>,
    /// Explicit line ranges overriding debug info
    pub scope_lines: BTreeMap<RegionId, LineRange>,
    pub loop_extractions: BTreeMap<LoopId, ExtractionFact>,
    pub region_extractions: BTreeMap<RegionId, ExtractionFact>,
    /// Detached regions whose side effects have been computed
    #[serde(skip)]
    analyzed: BTreeSet<RegionId>,
}

impl FunctionFacts {
    pub fn is_analyzed(&self, region: RegionId) -> bool {
        self.analyzed.contains(&region)
    }
}

/// Collaborator answering from [`FunctionFacts`] tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticFacts {
    functions: HashMap<String, FunctionFacts>,
}

impl StaticFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Facts for a function, created empty on first use.
    pub fn function_mut(&mut self, name: &str) -> &mut FunctionFacts {
        self.functions.entry(name.to_string()).or_default()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionFacts> {
        self.functions.get(name)
    }

    fn facts(&self, function: &Function) -> Option<&FunctionFacts> {
        self.functions.get(function.name())
    }
}

impl SideEffectAnalysis for StaticFacts {
    fn has_complete_side_effect_info(&self, function: &Function, region: RegionId) -> bool {
        let Some(facts) = self.facts(function) else {
            return !function.regions().is_detached(region);
        };
        if facts.incomplete_side_effects.contains(&region) {
            return false;
        }
        // Reduced regions only have information once analyzed.
        !function.regions().is_detached(region) || facts.is_analyzed(region)
    }

    fn analyze_reduced_region(&mut self, function: &Function, region: RegionId) {
        if let Some(facts) = self.functions.get_mut(function.name()) {
            if let Some(reduced) = facts.reduced_regions.get(&region).copied() {
                facts.analyzed.insert(reduced);
            }
        }
    }
}

impl RegionReconstructor for StaticFacts {
    fn reduced_region_of(&self, function: &Function, region: RegionId) -> Option<RegionId> {
        self.facts(function)?.reduced_regions.get(&region).copied()
    }

    fn is_safe(&self, function: &Function, region: RegionId) -> bool {
        self.facts(function)
            .map_or(true, |f| !f.unsafe_reductions.contains(&region))
    }
}

impl ScopeResolver for StaticFacts {
    fn start_end_lines(&self, function: &Function, region: RegionId) -> Option<LineRange> {
        self.facts(function)
            .and_then(|f| f.scope_lines.get(&region).copied())
            .or_else(|| DebugLineScopes.start_end_lines(function, region))
    }

    fn is_safely_nested(&self, function: &Function, region: RegionId) -> bool {
        let listed_unsafe = self
            .facts(function)
            .map_or(false, |f| f.unsafe_scopes.contains(&region));
        !listed_unsafe && DebugLineScopes.is_safely_nested(function, region)
    }
}

impl ComputationExtractor for StaticFacts {
    fn extract_loop(&mut self, request: &ExtractRequest<'_>, lp: LoopId) -> Option<Extraction> {
        let fact = self.facts(request.function)?.loop_extractions.get(&lp)?;
        Some(fact.instantiate(request.computation))
    }

    fn extract_region(&mut self, request: &ExtractRequest<'_>, region: RegionId) -> Option<Extraction> {
        let fact = self.facts(request.function)?.region_extractions.get(&region)?;
        Some(fact.instantiate(request.computation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::DirectiveFamily;
    use crate::ir::FunctionBuilder;

    fn function_with_reduction() -> (Function, RegionId, RegionId) {
        let mut b = FunctionBuilder::new("f");
        let b0 = b.block(&[1]);
        let b1 = b.block(&[2]);
        let top = b.add_region(None, None, &[b0, b1]);
        let reduced = b.add_detached_region(Some(b0), &[b1]);
        (b.build().unwrap(), top, reduced)
    }

    #[test]
    fn test_reduced_region_revealed_by_analysis() {
        let (f, top, reduced) = function_with_reduction();
        let mut facts = StaticFacts::new();
        facts.function_mut("f").incomplete_side_effects.insert(top);
        facts.function_mut("f").reduced_regions.insert(top, reduced);

        assert!(!facts.has_complete_side_effect_info(&f, top));
        assert!(!facts.has_complete_side_effect_info(&f, reduced));
        assert_eq!(facts.reduced_region_of(&f, top), Some(reduced));

        facts.analyze_reduced_region(&f, top);
        assert!(facts.has_complete_side_effect_info(&f, reduced));
        assert!(facts.function("f").unwrap().is_analyzed(reduced));
    }

    #[test]
    fn test_defaults_without_facts() {
        let (f, top, reduced) = function_with_reduction();
        let facts = StaticFacts::new();
        assert!(facts.has_complete_side_effect_info(&f, top));
        assert!(!facts.has_complete_side_effect_info(&f, reduced));
        assert!(facts.is_safe(&f, top));
        assert_eq!(facts.reduced_region_of(&f, top), None);
    }

    #[test]
    fn test_extraction_substitutes_name() {
        let (f, top, _) = function_with_reduction();
        let mut facts = StaticFacts::new();
        facts.function_mut("f").region_extractions.insert(
            top,
            ExtractionFact {
                comments: BTreeMap::from([(1, "long {name}_size = n;\n".to_string())]),
                restrict: true,
                test: "if(!RST_{name})".to_string(),
            },
        );
        let request = ExtractRequest {
            function: &f,
            computation: "AI7",
            start_line: 1,
            family: DirectiveFamily::OpenAcc,
        };
        let extraction = facts.extract_region(&request, top).unwrap();
        assert_eq!(extraction.comments.get(1), Some("long AI7_size = n;\n"));
        assert_eq!(extraction.test, "if(!RST_AI7)");
        assert!(extraction.restrict);
        assert!(facts.extract_loop(&request, LoopId(0)).is_none());
    }

    #[test]
    fn test_scope_override() {
        let (f, top, _) = function_with_reduction();
        let mut facts = StaticFacts::new();
        assert_eq!(facts.start_end_lines(&f, top), None);
        facts.function_mut("f").scope_lines.insert(top, LineRange::new(1, 3));
        assert_eq!(facts.start_end_lines(&f, top), Some(LineRange::new(1, 3)));
        facts.function_mut("f").unsafe_scopes.insert(top);
        assert!(!facts.is_safely_nested(&f, top));
    }

    #[test]
    fn test_facts_from_json() {
        let json = r#"{
            "f": {
                "incomplete_side_effects": [0],
                "scope_lines": { "0": { "start": 1, "end": 4 } },
                "loop_extractions": { "0": { "comments": { "1": "x\n" } } }
            }
        }"#;
        let facts: StaticFacts = serde_json::from_str(json).unwrap();
        let f = facts.function("f").unwrap();
        assert!(f.incomplete_side_effects.contains(&RegionId(0)));
        assert_eq!(f.scope_lines.get(&RegionId(0)), Some(&LineRange::new(1, 4)));
        assert!(f.loop_extractions.contains_key(&LoopId(0)));
    }
}
