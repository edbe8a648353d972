//! Error module orchestrator.
//!
//! Editing operations surface [`SwapError`]; the tick pipeline recovers from
//! every failure locally and never returns one.

mod types;

pub use types::{Result, SwapError};
