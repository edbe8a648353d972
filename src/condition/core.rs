use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::state::{HeldKeys, RoleId, StatusId};

/// Unique custom-condition name.
pub type ConditionName = String;

/// A single primitive or custom-condition test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Predicate {
    /// Current role or category membership.
    Role(RoleId),
    /// A primitive boolean status flag.
    Status(StatusId),
    /// Reference to another custom condition by name.
    Condition(ConditionName),
}

impl Predicate {
    pub fn role(id: impl Into<RoleId>) -> Self {
        Self::Role(id.into())
    }

    pub fn status(id: impl Into<StatusId>) -> Self {
        Self::Status(id.into())
    }

    pub fn condition(name: impl Into<ConditionName>) -> Self {
        Self::Condition(name.into())
    }

    /// Name of the referenced custom condition, if this is a reference.
    pub fn condition_ref(&self) -> Option<&ConditionName> {
        match self {
            Self::Condition(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Junction {
    #[default]
    And,
    Or,
}

/// One term of a composite expression.
///
/// The junction joins this term to the running result of the terms before
/// it; it is ignored on the first term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeItem {
    #[serde(default)]
    pub junction: Junction,
    #[serde(default)]
    pub negate: bool,
    pub predicate: Predicate,
}

impl CompositeItem {
    pub fn and(predicate: Predicate) -> Self {
        Self {
            junction: Junction::And,
            negate: false,
            predicate,
        }
    }

    pub fn or(predicate: Predicate) -> Self {
        Self {
            junction: Junction::Or,
            negate: false,
            predicate,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

/// Modifier set plus an optional key that must be held together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub modifiers: KeyModifiers,
    #[serde(default)]
    pub code: Option<KeyCode>,
}

impl KeyCombo {
    pub fn new(modifiers: KeyModifiers) -> Self {
        Self {
            modifiers,
            code: None,
        }
    }

    pub fn with_code(mut self, code: KeyCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Modifiers must match exactly; the key, when set, must be among the held codes.
    pub fn matches(&self, held: &HeldKeys) -> bool {
        held.modifiers == self.modifiers
            && self.code.as_ref().is_none_or(|code| held.is_held(code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ConditionKind {
    Manual {
        #[serde(default)]
        active: bool,
    },
    HeldKeys {
        combo: KeyCombo,
    },
    Zones {
        zones: Vec<String>,
    },
    External {
        index: u32,
    },
    Composite {
        #[serde(default)]
        items: Vec<CompositeItem>,
    },
}

impl ConditionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Manual { .. } => "manual",
            Self::HeldKeys { .. } => "held_keys",
            Self::Zones { .. } => "zones",
            Self::External { .. } => "external",
            Self::Composite { .. } => "composite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCondition {
    pub name: ConditionName,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

impl CustomCondition {
    pub fn manual(name: impl Into<ConditionName>, active: bool) -> Self {
        Self {
            name: name.into(),
            kind: ConditionKind::Manual { active },
        }
    }

    pub fn held_keys(name: impl Into<ConditionName>, combo: KeyCombo) -> Self {
        Self {
            name: name.into(),
            kind: ConditionKind::HeldKeys { combo },
        }
    }

    pub fn zones<I, S>(name: impl Into<ConditionName>, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: ConditionKind::Zones {
                zones: zones.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn external(name: impl Into<ConditionName>, index: u32) -> Self {
        Self {
            name: name.into(),
            kind: ConditionKind::External { index },
        }
    }

    pub fn composite(name: impl Into<ConditionName>, items: Vec<CompositeItem>) -> Self {
        Self {
            name: name.into(),
            kind: ConditionKind::Composite { items },
        }
    }

    /// Custom conditions this one references directly.
    pub fn references(&self) -> impl Iterator<Item = &ConditionName> + '_ {
        let items: &[CompositeItem] = match &self.kind {
            ConditionKind::Composite { items } => items,
            _ => &[],
        };
        items.iter().filter_map(|item| item.predicate.condition_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_combo_requires_exact_modifiers() {
        let combo = KeyCombo::new(KeyModifiers::SHIFT | KeyModifiers::CONTROL);
        assert!(combo.matches(&HeldKeys::new(KeyModifiers::SHIFT | KeyModifiers::CONTROL)));
        assert!(!combo.matches(&HeldKeys::new(KeyModifiers::SHIFT)));
        assert!(!combo.matches(&HeldKeys::new(
            KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT
        )));
    }

    #[test]
    fn key_combo_with_code_needs_key_held() {
        let combo = KeyCombo::new(KeyModifiers::ALT).with_code(KeyCode::Char('q'));
        let without = HeldKeys::new(KeyModifiers::ALT);
        let with = HeldKeys::new(KeyModifiers::ALT).with_code(KeyCode::Char('q'));
        assert!(!combo.matches(&without));
        assert!(combo.matches(&with));
    }

    #[test]
    fn references_lists_condition_predicates_only() {
        let condition = CustomCondition::composite(
            "pvp",
            vec![
                CompositeItem::and(Predicate::status("combat")),
                CompositeItem::or(Predicate::condition("arena")),
                CompositeItem::and(Predicate::role("healer")),
            ],
        );
        let refs: Vec<_> = condition.references().collect();
        assert_eq!(refs, vec!["arena"]);
        assert_eq!(CustomCondition::manual("m", true).references().count(), 0);
    }

    #[test]
    fn condition_round_trips_through_tagged_json() {
        let json = r#"{"name":"arena","type":"zones","zones":["Nagrand Arena"]}"#;
        let condition: CustomCondition = serde_json::from_str(json).unwrap();
        assert_eq!(condition, CustomCondition::zones("arena", ["Nagrand Arena"]));
        assert_eq!(condition.kind.label(), "zones");
    }
}
