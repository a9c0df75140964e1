//! Directive text generation.
//!
//! Directives are emitted as source comments keyed by line; this module owns
//! their exact spelling so the walkers never branch on the target family.

pub mod annotations;
pub mod external;

pub use annotations::AnnotationMap;
pub use external::{parse_parallel_lines, read_parallel_lines};

use serde::{Serialize, Deserialize};
use std::fmt;

/// Marker closing a committed offload block.
pub const CLOSING_MARKER: &str = "}\n";

/// Family of directives to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectiveFamily {
    /// OpenACC: independent loops, kernels and data regions
    #[default]
    #[serde(rename = "acc")]
    OpenAcc,
    /// OpenMP parallel loops for a GPU build
    #[serde(rename = "omp-gpu")]
    OpenMpGpu,
    /// OpenMP parallel loops for a CPU build
    #[serde(rename = "omp-cpu")]
    OpenMpCpu,
}

impl DirectiveFamily {
    /// Decode the single-character selector (`0`, `1`, `2`).
    pub fn from_selector(selector: char) -> Option<Self> {
        match selector {
            '0' => Some(DirectiveFamily::OpenAcc),
            '1' => Some(DirectiveFamily::OpenMpGpu),
            '2' => Some(DirectiveFamily::OpenMpCpu),
            _ => None,
        }
    }

    /// Whether this family has kernels and device routines.
    pub fn is_accelerator(&self) -> bool {
        matches!(self, DirectiveFamily::OpenAcc)
    }

    /// Directive marking a loop as free of loop-carried dependences,
    /// optionally followed by a guard clause.
    pub fn parallel_loop(&self, condition: &str) -> String {
        let base = match self {
            DirectiveFamily::OpenAcc => "#pragma acc loop independent",
            DirectiveFamily::OpenMpGpu | DirectiveFamily::OpenMpCpu => "#pragma omp parallel for",
        };
        let condition = condition.trim();
        if condition.is_empty() {
            format!("{}\n", base)
        } else {
            format!("{} {}\n", base, condition)
        }
    }

    /// Directive for a kernel loop inside a committed region. Only the
    /// accelerator family has one.
    pub fn kernels(&self, restriction: Option<&str>) -> Option<String> {
        if !self.is_accelerator() {
            return None;
        }
        Some(match restriction {
            Some(name) => format!("#pragma acc kernels if(!{})\n", restriction_flag(name)),
            None => "#pragma acc kernels\n".to_string(),
        })
    }
}

impl fmt::Display for DirectiveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DirectiveFamily::OpenAcc => "acc",
            DirectiveFamily::OpenMpGpu => "omp-gpu",
            DirectiveFamily::OpenMpCpu => "omp-cpu",
        };
        write!(f, "{}", s)
    }
}

/// Runtime flag a computation sets when its pointer ranges may overlap.
pub fn restriction_flag(computation: &str) -> String {
    format!("RST_{}", computation)
}
