//! Per-tick snapshot of host state consumed by predicate evaluation.

use std::collections::{BTreeSet, HashMap};

use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};

/// Role or category identifier ("healer", "tank", a class or specialization).
pub type RoleId = String;

/// Primitive boolean status flag identifier ("combat", "mounted", ...).
pub type StatusId = String;

/// Modifier and key state held at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldKeys {
    pub modifiers: KeyModifiers,
    #[serde(default)]
    pub codes: Vec<KeyCode>,
}

impl HeldKeys {
    pub fn new(modifiers: KeyModifiers) -> Self {
        Self {
            modifiers,
            codes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: KeyCode) -> Self {
        self.codes.push(code);
        self
    }

    pub fn is_held(&self, code: &KeyCode) -> bool {
        self.codes.contains(code)
    }
}

/// Host state captured once per tick.
///
/// A snapshot without a role is empty: every predicate evaluates false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub role: Option<RoleId>,
    #[serde(default)]
    pub categories: BTreeSet<RoleId>,
    #[serde(default)]
    pub statuses: HashMap<StatusId, bool>,
    #[serde(default)]
    pub held_keys: Option<HeldKeys>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub subzone: Option<String>,
    #[serde(default)]
    pub external: HashMap<u32, bool>,
}

impl StateSnapshot {
    pub fn new(role: impl Into<RoleId>) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::default()
        }
    }

    /// Snapshot with no current subject.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<RoleId>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<StatusId>, value: bool) -> Self {
        self.statuses.insert(status.into(), value);
        self
    }

    pub fn with_held_keys(mut self, keys: HeldKeys) -> Self {
        self.held_keys = Some(keys);
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>, subzone: Option<&str>) -> Self {
        self.zone = Some(zone.into());
        self.subzone = subzone.map(str::to_string);
        self
    }

    pub fn with_external(mut self, index: u32, value: bool) -> Self {
        self.external.insert(index, value);
        self
    }

    pub fn has_subject(&self) -> bool {
        self.role.is_some()
    }

    /// True when `id` is the current role or one of the extra categories.
    pub fn is_member(&self, id: &str) -> bool {
        self.role.as_deref() == Some(id) || self.categories.contains(id)
    }

    /// Unknown statuses read as false.
    pub fn status(&self, id: &str) -> bool {
        self.statuses.get(id).copied().unwrap_or(false)
    }

    pub fn external(&self, index: u32) -> bool {
        self.external.get(&index).copied().unwrap_or(false)
    }

    /// Case-insensitive match of zone or subzone against `zones`.
    pub fn in_any_zone(&self, zones: &[String]) -> bool {
        [self.zone.as_deref(), self.subzone.as_deref()]
            .into_iter()
            .flatten()
            .any(|current| zones.iter().any(|zone| zone.eq_ignore_ascii_case(current)))
    }
}

/// Source of live host state, polled once per tick.
pub trait StateProvider {
    fn snapshot(&mut self) -> StateSnapshot;
}

impl<F> StateProvider for F
where
    F: FnMut() -> StateSnapshot,
{
    fn snapshot(&mut self) -> StateSnapshot {
        self()
    }
}
