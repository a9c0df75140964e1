//! Device routine discovery.
//!
//! A function called from inside an offloaded region must itself be
//! compiled for the device. Discovery walks the static call graph from such
//! call sites and records every reachable function with a body in this unit.

use crate::codegen::DirectiveFamily;
use crate::ir::Module;
use log::trace;
use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;

/// Functions confirmed reachable from a parallel region.
///
/// Lives for the whole compilation unit; entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutineSet {
    names: BTreeSet<String>,
}

impl RoutineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns whether the name was newly added.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.names.contains(name) {
            return false;
        }
        self.names.insert(name.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Register `root` and everything it transitively calls.
///
/// Declarations, intrinsics and externally owned bodies are skipped, and
/// nothing is registered unless the accelerator family is active. Each
/// function is expanded at most once, so cycles and diamonds terminate.
pub fn discover_routines(
    module: &Module,
    family: DirectiveFamily,
    routines: &mut RoutineSet,
    root: &str,
) {
    if !family.is_accelerator() {
        return;
    }
    let mut pending = vec![root];
    while let Some(name) = pending.pop() {
        let Some(function) = module.function(name) else {
            trace!("Callee `{}` not in unit", name);
            continue;
        };
        if function.is_declaration() || !function.linkage().is_offloadable() {
            continue;
        }
        if !routines.insert(name) {
            continue;
        }
        trace!("Registered device routine `{}`", name);
        pending.extend(function.callees().filter(|callee| !routines.contains(callee)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Function, FunctionBuilder, Linkage};

    fn caller(name: &str, callees: &[&str]) -> Function {
        let mut b = FunctionBuilder::new(name);
        let block = b.block(&[1]);
        for callee in callees {
            b.call(block, callee);
        }
        b.build().unwrap()
    }

    fn declaration(name: &str) -> Function {
        let mut b = FunctionBuilder::new(name);
        b.set_linkage(Linkage::Declaration);
        b.build().unwrap()
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let module = Module::new(vec![caller("a", &["b"]), caller("b", &["a"])]).unwrap();
        let mut routines = RoutineSet::new();
        discover_routines(&module, DirectiveFamily::OpenAcc, &mut routines, "a");
        assert_eq!(routines.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_diamond_visited_once() {
        let module = Module::new(vec![
            caller("top", &["left", "right"]),
            caller("left", &["bottom"]),
            caller("right", &["bottom", "bottom"]),
            caller("bottom", &[]),
        ])
        .unwrap();
        let mut routines = RoutineSet::new();
        discover_routines(&module, DirectiveFamily::OpenAcc, &mut routines, "top");
        assert_eq!(routines.len(), 4);
        assert!(routines.contains("bottom"));
    }

    #[test]
    fn test_declarations_skipped() {
        let module = Module::new(vec![caller("work", &["sqrt", "helper"]), declaration("sqrt"), caller("helper", &[])]).unwrap();
        let mut routines = RoutineSet::new();
        discover_routines(&module, DirectiveFamily::OpenAcc, &mut routines, "work");
        assert!(routines.contains("helper"));
        assert!(!routines.contains("sqrt"));
    }

    #[test]
    fn test_openmp_family_registers_nothing() {
        let module = Module::new(vec![caller("a", &["b"]), caller("b", &[])]).unwrap();
        let mut routines = RoutineSet::new();
        discover_routines(&module, DirectiveFamily::OpenMpGpu, &mut routines, "a");
        assert!(routines.is_empty());
    }

    #[test]
    fn test_unknown_callee_ignored() {
        let module = Module::new(vec![caller("a", &["external_fn"])]).unwrap();
        let mut routines = RoutineSet::new();
        discover_routines(&module, DirectiveFamily::OpenAcc, &mut routines, "a");
        assert_eq!(routines.len(), 1);
    }
}
