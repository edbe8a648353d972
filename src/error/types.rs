use thiserror::Error;

use crate::condition::ConditionName;
use crate::layout::LayoutId;

/// Unified result type for the layout swap crate.
pub type Result<T> = std::result::Result<T, SwapError>;

/// Errors surfaced by store and condition editing operations.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("adding a reference from `{owner}` to `{target}` would create a condition cycle")]
    CycleRejected {
        owner: ConditionName,
        target: ConditionName,
    },
    #[error("condition `{0}` not found")]
    UnknownCondition(ConditionName),
    #[error("condition `{0}` already exists")]
    DuplicateCondition(ConditionName),
    #[error("condition `{name}` is still referenced by {referrers:?}")]
    ConditionInUse {
        name: ConditionName,
        referrers: Vec<String>,
    },
    #[error("condition `{0}` is not a {1} condition")]
    WrongConditionKind(ConditionName, &'static str),
    #[error("composite item {index} out of range for `{name}`")]
    ItemOutOfRange { name: ConditionName, index: usize },
    #[error("layout `{0}` not found")]
    UnknownLayout(LayoutId),
    #[error("layout `{0}` already exists")]
    DuplicateLayout(LayoutId),
    #[error("making `{parent}` the parent of `{child}` would create a layout cycle")]
    ParentCycle { child: LayoutId, parent: LayoutId },
    #[error("rule index {0} out of range")]
    RuleOutOfRange(usize),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
