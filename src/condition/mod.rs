//! Condition model: primitive predicates and user-defined custom conditions.
//!
//! `core` holds the data types, `set` the owning collection with cycle
//! validation, and `eval` the per-snapshot evaluator.

mod core;
mod eval;
mod set;

pub use core::{
    CompositeItem, ConditionKind, ConditionName, CustomCondition, Junction, KeyCombo, Predicate,
};
pub use eval::Evaluator;
pub use set::{ConditionSet, PrunedItem, validate_composite_edit};
