use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::core::{CompositeItem, ConditionKind, ConditionName, CustomCondition};
use crate::error::{Result, SwapError};

/// Composite item removed because its reference no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedItem {
    pub owner: ConditionName,
    pub missing: ConditionName,
}

/// Owning collection of custom conditions, in user-defined order.
///
/// Every mutation that adds a reference between conditions is validated
/// before it is applied, so the reference graph stays acyclic. Names are
/// unique, including in loaded data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CustomCondition>", into = "Vec<CustomCondition>")]
pub struct ConditionSet {
    conditions: Vec<CustomCondition>,
}

impl TryFrom<Vec<CustomCondition>> for ConditionSet {
    type Error = SwapError;

    fn try_from(conditions: Vec<CustomCondition>) -> Result<Self> {
        let mut seen = HashSet::new();
        for condition in &conditions {
            if !seen.insert(condition.name.as_str()) {
                return Err(SwapError::DuplicateCondition(condition.name.clone()));
            }
        }
        Ok(Self { conditions })
    }
}

impl From<ConditionSet> for Vec<CustomCondition> {
    fn from(set: ConditionSet) -> Self {
        set.conditions
    }
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomCondition> + '_ {
        self.conditions.iter()
    }

    pub fn get(&self, name: &str) -> Option<&CustomCondition> {
        self.conditions.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CustomCondition> {
        self.conditions.iter_mut().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add a new condition; composite items are cycle-checked first.
    pub fn insert(&mut self, condition: CustomCondition) -> Result<()> {
        if self.contains(&condition.name) {
            return Err(SwapError::DuplicateCondition(condition.name));
        }
        for target in condition.references() {
            if !self.reference_is_acyclic(&condition.name, target) {
                return Err(SwapError::CycleRejected {
                    owner: condition.name.clone(),
                    target: target.clone(),
                });
            }
        }
        self.conditions.push(condition);
        Ok(())
    }

    /// Remove a condition no other condition references.
    ///
    /// Rules are not checked here; `SwapConfig::remove_condition` covers them.
    pub fn remove(&mut self, name: &str) -> Result<CustomCondition> {
        let referrers = self.referrers(name);
        if !referrers.is_empty() {
            return Err(SwapError::ConditionInUse {
                name: name.to_string(),
                referrers,
            });
        }
        let idx = self
            .position(name)
            .ok_or_else(|| SwapError::UnknownCondition(name.to_string()))?;
        Ok(self.conditions.remove(idx))
    }

    /// Names of conditions whose composite items reference `name`.
    pub fn referrers(&self, name: &str) -> Vec<ConditionName> {
        self.conditions
            .iter()
            .filter(|c| c.references().any(|r| r == name))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Flip a manual toggle, returning the new state.
    pub fn toggle_manual(&mut self, name: &str) -> Result<bool> {
        let condition = self
            .get_mut(name)
            .ok_or_else(|| SwapError::UnknownCondition(name.to_string()))?;
        match &mut condition.kind {
            ConditionKind::Manual { active } => {
                *active = !*active;
                Ok(*active)
            }
            _ => Err(SwapError::WrongConditionKind(name.to_string(), "manual")),
        }
    }

    /// Pure check: would `item` be safe to add to `owner`'s composite?
    ///
    /// Walks depth-first from the item's referenced condition through every
    /// composite reference and fails if the walk reaches `owner`. Items that
    /// reference no custom condition are always safe.
    pub fn validate_item(&self, owner: &str, item: &CompositeItem) -> bool {
        match item.predicate.condition_ref() {
            Some(target) => self.reference_is_acyclic(owner, target),
            None => true,
        }
    }

    /// Pure check that `name` cannot reach itself through composite references.
    pub fn validate(&self, name: &str) -> bool {
        match self.get(name) {
            Some(condition) => condition
                .references()
                .all(|target| self.reference_is_acyclic(name, target)),
            None => true,
        }
    }

    fn reference_is_acyclic(&self, owner: &str, target: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![target];
        while let Some(current) = stack.pop() {
            if current == owner {
                return false;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(condition) = self.get(current) {
                stack.extend(condition.references().map(String::as_str));
            }
        }
        true
    }

    /// Append an item to a composite condition after validating it.
    pub fn add_item(&mut self, owner: &str, item: CompositeItem) -> Result<()> {
        self.check_item(owner, &item)?;
        self.composite_items_mut(owner)?.push(item);
        Ok(())
    }

    /// Replace the item at `index` after validating the replacement.
    pub fn replace_item(
        &mut self,
        owner: &str,
        index: usize,
        item: CompositeItem,
    ) -> Result<CompositeItem> {
        self.check_item(owner, &item)?;
        let items = self.composite_items_mut(owner)?;
        let slot = items.get_mut(index).ok_or_else(|| SwapError::ItemOutOfRange {
            name: owner.to_string(),
            index,
        })?;
        Ok(std::mem::replace(slot, item))
    }

    pub fn remove_item(&mut self, owner: &str, index: usize) -> Result<CompositeItem> {
        let items = self.composite_items_mut(owner)?;
        if index >= items.len() {
            return Err(SwapError::ItemOutOfRange {
                name: owner.to_string(),
                index,
            });
        }
        Ok(items.remove(index))
    }

    fn check_item(&self, owner: &str, item: &CompositeItem) -> Result<()> {
        let condition = self
            .get(owner)
            .ok_or_else(|| SwapError::UnknownCondition(owner.to_string()))?;
        if !matches!(condition.kind, ConditionKind::Composite { .. }) {
            return Err(SwapError::WrongConditionKind(owner.to_string(), "composite"));
        }
        if let Some(target) = item.predicate.condition_ref() {
            if !self.contains(target) {
                return Err(SwapError::UnknownCondition(target.clone()));
            }
            if !self.reference_is_acyclic(owner, target) {
                return Err(SwapError::CycleRejected {
                    owner: owner.to_string(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }

    fn composite_items_mut(&mut self, owner: &str) -> Result<&mut Vec<CompositeItem>> {
        let condition = self
            .get_mut(owner)
            .ok_or_else(|| SwapError::UnknownCondition(owner.to_string()))?;
        match &mut condition.kind {
            ConditionKind::Composite { items } => Ok(items),
            _ => Err(SwapError::WrongConditionKind(owner.to_string(), "composite")),
        }
    }

    /// Drop composite items whose referenced condition no longer exists.
    pub fn prune_dangling(&mut self) -> Vec<PrunedItem> {
        let names: HashSet<ConditionName> =
            self.conditions.iter().map(|c| c.name.clone()).collect();
        let mut pruned = Vec::new();
        for condition in &mut self.conditions {
            let ConditionKind::Composite { items } = &mut condition.kind else {
                continue;
            };
            items.retain(|item| match item.predicate.condition_ref() {
                Some(target) if !names.contains(target) => {
                    pruned.push(PrunedItem {
                        owner: condition.name.clone(),
                        missing: target.clone(),
                    });
                    false
                }
                _ => true,
            });
        }
        pruned
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.conditions.iter().position(|c| c.name == name)
    }
}

/// Pre-check for an editing surface: can `item` be added to `owner` without a cycle?
pub fn validate_composite_edit(
    conditions: &ConditionSet,
    owner: &str,
    item: &CompositeItem,
) -> bool {
    conditions.validate_item(owner, item)
}
