//! Layout module orchestrator.
//!
//! Record types live in `core`; the forest, merge algebra, and composer build
//! on them to produce an [`EffectiveLayout`].

mod compose;
mod core;
pub mod forest;
pub mod merge;

pub use compose::{Composer, EffectiveLayout};
pub use core::{
    Anchor, Element, ElementFields, ElementKind, InputVisibility, Layout, LayoutId, LayoutMap,
    Overlay, SizeHint, Window, WindowFields, WindowName,
};
pub use forest::{ForestIssue, LayoutForest, NodeRef};
pub use merge::{Overridable, merge, merge_element, merge_window};
