//! Last-committed selection, used to suppress redundant commits.

use crate::layout::{EffectiveLayout, LayoutId};
use crate::state::RoleId;

/// What a decision resolved to, plus the role it was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub role: Option<RoleId>,
    pub base: LayoutId,
    pub layers: Vec<LayoutId>,
}

impl Selection {
    pub fn new(role: Option<RoleId>, base: impl Into<LayoutId>, layers: Vec<LayoutId>) -> Self {
        Self {
            role,
            base: base.into(),
            layers,
        }
    }

    fn same_layouts(&self, other: &Selection) -> bool {
        self.base == other.base && self.layers == other.layers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// Nothing changed since the last commit.
    Skip,
    /// Same layouts, different role: re-apply role visibility only.
    RoleRefresh,
    /// Compose and commit.
    Full,
}

#[derive(Debug, Clone, Default)]
pub struct StagingCache {
    committed: Option<Selection>,
    effective: Option<EffectiveLayout>,
    fingerprint: Option<blake3::Hash>,
}

impl StagingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, selection: &Selection) -> StageAction {
        match (&self.committed, &self.effective) {
            (Some(committed), Some(_)) if committed.same_layouts(selection) => {
                if committed.role == selection.role {
                    StageAction::Skip
                } else {
                    StageAction::RoleRefresh
                }
            }
            _ => StageAction::Full,
        }
    }

    pub fn commit(&mut self, selection: Selection, effective: EffectiveLayout) {
        self.fingerprint = Some(effective.fingerprint());
        self.committed = Some(selection);
        self.effective = Some(effective);
    }

    /// Record the role a cached layout was refreshed for.
    pub fn refresh_role(&mut self, role: Option<RoleId>) {
        if let Some(committed) = self.committed.as_mut() {
            committed.role = role;
        }
    }

    pub fn invalidate(&mut self) {
        self.committed = None;
        self.effective = None;
        self.fingerprint = None;
    }

    pub fn committed(&self) -> Option<&Selection> {
        self.committed.as_ref()
    }

    pub fn effective(&self) -> Option<&EffectiveLayout> {
        self.effective.as_ref()
    }

    pub fn committed_fingerprint(&self) -> Option<blake3::Hash> {
        self.fingerprint
    }
}
