//! Core data types for the corag engine.
//!
//! This module contains the structures passed between retrieval stages:
//! evidence chunks, graded sets, corrective actions, and pipeline results.

pub mod chunk;
pub mod query;
pub mod response;
pub mod retrieval;

// Re-export all types for convenience
pub use chunk::*;
pub use query::*;
pub use response::*;
pub use retrieval::*;
