//! Rule table and the swap decision scan.

mod core;
mod decide;

pub use core::Rule;
pub use decide::{Decision, decide};
