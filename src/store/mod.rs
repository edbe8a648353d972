//! Layout, rule, and condition store read by the engine each tick.
//!
//! `SwapConfig` is the persisted schema. The editing surface mutates it
//! through the methods here between ticks; the engine only prunes dangling
//! composite items.

use serde::{Deserialize, Deserializer, Serialize};

use crate::condition::{ConditionSet, CustomCondition};
use crate::error::{Result, SwapError};
use crate::layout::{Layout, LayoutId, LayoutMap};
use crate::rules::Rule;

/// User settings persisted next to the layouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSettings {
    /// Let rules flagged as layers stack on top of the base layout.
    #[serde(default)]
    pub advanced_layering: bool,
}

/// Result of deleting a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedLayout {
    pub layout: Layout,
    /// Former children, now roots.
    pub orphaned: Vec<LayoutId>,
    /// Indices of rules that still target the deleted id.
    pub dangling_rules: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapConfig {
    #[serde(default, deserialize_with = "layouts_keyed_by_id")]
    pub layouts: LayoutMap,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub conditions: ConditionSet,
    #[serde(default)]
    pub settings: SwapSettings,
}

/// Rules and the forest resolve layouts by map key, so the key is authoritative.
fn layouts_keyed_by_id<'de, D>(deserializer: D) -> std::result::Result<LayoutMap, D::Error>
where
    D: Deserializer<'de>,
{
    let mut layouts = LayoutMap::deserialize(deserializer)?;
    for (key, layout) in layouts.iter_mut() {
        if layout.id != *key {
            layout.id = key.clone();
        }
    }
    Ok(layouts)
}

impl SwapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_layering(mut self, enabled: bool) -> Self {
        self.settings.advanced_layering = enabled;
        self
    }

    pub fn add_layout(&mut self, layout: Layout) -> Result<()> {
        if self.layouts.contains_key(&layout.id) {
            return Err(SwapError::DuplicateLayout(layout.id));
        }
        self.layouts.insert(layout.id.clone(), layout);
        Ok(())
    }

    /// Remove a layout and clear its children's parent links.
    pub fn delete_layout(&mut self, id: &str) -> Result<DeletedLayout> {
        let layout = self
            .layouts
            .remove(id)
            .ok_or_else(|| SwapError::UnknownLayout(id.to_string()))?;

        let mut orphaned = Vec::new();
        for child in self.layouts.values_mut() {
            if child.parent.as_deref() == Some(id) {
                child.parent = None;
                orphaned.push(child.id.clone());
            }
        }

        Ok(DeletedLayout {
            layout,
            orphaned,
            dangling_rules: self.rules_targeting(id),
        })
    }

    /// Re-parent `child`, refusing links that would close a cycle.
    pub fn set_parent(&mut self, child: &str, parent: Option<&str>) -> Result<()> {
        if !self.layouts.contains_key(child) {
            return Err(SwapError::UnknownLayout(child.to_string()));
        }
        if let Some(parent) = parent {
            if !self.layouts.contains_key(parent) {
                return Err(SwapError::UnknownLayout(parent.to_string()));
            }
            let mut cursor = Some(parent);
            let mut steps = 0;
            while let Some(current) = cursor {
                if current == child {
                    return Err(SwapError::ParentCycle {
                        child: child.to_string(),
                        parent: parent.to_string(),
                    });
                }
                steps += 1;
                if steps > self.layouts.len() {
                    break;
                }
                cursor = self
                    .layouts
                    .get(current)
                    .and_then(|layout| layout.parent.as_deref());
            }
        }
        if let Some(layout) = self.layouts.get_mut(child) {
            layout.parent = parent.map(str::to_string);
        }
        Ok(())
    }

    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn remove_rule(&mut self, index: usize) -> Result<Rule> {
        if index >= self.rules.len() {
            return Err(SwapError::RuleOutOfRange(index));
        }
        Ok(self.rules.remove(index))
    }

    /// Move a rule to a new priority slot.
    pub fn move_rule(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.rules.len() {
            return Err(SwapError::RuleOutOfRange(from));
        }
        if to >= self.rules.len() {
            return Err(SwapError::RuleOutOfRange(to));
        }
        let rule = self.rules.remove(from);
        self.rules.insert(to, rule);
        Ok(())
    }

    pub fn rules_targeting(&self, id: &str) -> Vec<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.target == id)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn add_condition(&mut self, condition: CustomCondition) -> Result<()> {
        self.conditions.insert(condition)
    }

    /// Remove a custom condition no rule or other condition references.
    pub fn remove_condition(&mut self, name: &str) -> Result<CustomCondition> {
        let mut referrers: Vec<String> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.references_condition(name))
            .map(|(index, _)| format!("rule #{index}"))
            .collect();
        referrers.extend(self.conditions.referrers(name));
        if !referrers.is_empty() {
            return Err(SwapError::ConditionInUse {
                name: name.to_string(),
                referrers,
            });
        }
        self.conditions.remove(name)
    }
}
