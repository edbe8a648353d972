//! Rule-driven layout swapping.
//!
//! Each tick the engine reads a state snapshot, scans an ordered rule table
//! for the first matching base layout (plus any layers above it), composes
//! the result through the layout inheritance forest, and hands it to a
//! commit sink unless the staging cache says nothing changed.

pub mod condition;
pub mod error;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod rules;
pub mod runtime;
pub mod sink;
pub mod state;
pub mod store;

pub use condition::{
    CompositeItem, ConditionKind, ConditionName, ConditionSet, CustomCondition, Evaluator,
    Junction, KeyCombo, Predicate, PrunedItem, validate_composite_edit,
};
pub use error::{Result, SwapError};
pub use layout::{
    Anchor, Composer, EffectiveLayout, Element, ElementFields, ElementKind, ForestIssue,
    InputVisibility, Layout, LayoutForest, LayoutId, LayoutMap, NodeRef, Overlay, Overridable,
    SizeHint, Window, WindowFields, WindowName, merge, merge_element, merge_window,
};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{MetricSnapshot, SwapMetrics};
pub use rules::{Decision, Rule, decide};
pub use runtime::{EngineConfig, Selection, StageAction, StagingCache, SwapEngine, TickOutcome};
pub use sink::{CommitSink, RecordingSink, WriterSink};
pub use state::{HeldKeys, RoleId, StateProvider, StateSnapshot, StatusId};
pub use store::{DeletedLayout, SwapConfig, SwapSettings};
