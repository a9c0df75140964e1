//! Utility modules shared by the engine.
//!
//! - Error types
//! - Source line ranges

pub mod errors;
pub mod location;

// Re-exports
pub use errors::*;
pub use location::LineRange;
