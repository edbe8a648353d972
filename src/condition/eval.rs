use std::cell::Cell;

use super::core::{CompositeItem, ConditionKind, Junction, Predicate};
use super::set::ConditionSet;
use crate::logging::{LogLevel, Logger, TARGET_CONDITION, emit, json_str};
use crate::state::StateSnapshot;

/// Evaluates predicates against one state snapshot.
///
/// Evaluation never fails: unknown conditions, snapshots without a subject,
/// and re-entrant references all read as false.
pub struct Evaluator<'a> {
    conditions: &'a ConditionSet,
    snapshot: &'a StateSnapshot,
    logger: Option<&'a Logger>,
    dangling: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(conditions: &'a ConditionSet, snapshot: &'a StateSnapshot) -> Self {
        Self {
            conditions,
            snapshot,
            logger: None,
            dangling: Cell::new(0),
        }
    }

    pub fn with_logger(mut self, logger: Option<&'a Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        self.snapshot
    }

    /// Dangling condition references seen so far.
    pub fn dangling_count(&self) -> usize {
        self.dangling.get()
    }

    pub fn role(&self, id: &str) -> bool {
        self.snapshot.has_subject() && self.snapshot.is_member(id)
    }

    pub fn status(&self, id: &str) -> bool {
        self.snapshot.has_subject() && self.snapshot.status(id)
    }

    pub fn condition(&self, name: &str) -> bool {
        self.snapshot.has_subject() && self.eval_condition(name, &mut Vec::new())
    }

    pub fn predicate(&self, predicate: &Predicate) -> bool {
        self.snapshot.has_subject() && self.eval_predicate(predicate, &mut Vec::new())
    }

    fn eval_predicate(&self, predicate: &Predicate, stack: &mut Vec<&'a str>) -> bool {
        match predicate {
            Predicate::Role(id) => self.snapshot.is_member(id),
            Predicate::Status(id) => self.snapshot.status(id),
            Predicate::Condition(name) => self.eval_condition(name, stack),
        }
    }

    fn eval_condition(&self, name: &str, stack: &mut Vec<&'a str>) -> bool {
        let Some(condition) = self.conditions.get(name) else {
            self.dangling.set(self.dangling.get() + 1);
            emit(
                self.logger,
                LogLevel::Warn,
                TARGET_CONDITION,
                "dangling_condition",
                [json_str("condition", name)],
            );
            return false;
        };

        if stack.contains(&condition.name.as_str()) {
            emit(
                self.logger,
                LogLevel::Error,
                TARGET_CONDITION,
                "condition_reentered",
                [json_str("condition", name)],
            );
            return false;
        }

        match &condition.kind {
            ConditionKind::Manual { active } => *active,
            ConditionKind::HeldKeys { combo } => self
                .snapshot
                .held_keys
                .as_ref()
                .is_some_and(|held| combo.matches(held)),
            ConditionKind::Zones { zones } => self.snapshot.in_any_zone(zones),
            ConditionKind::External { index } => self.snapshot.external(*index),
            ConditionKind::Composite { items } => {
                stack.push(condition.name.as_str());
                let result = self.eval_composite(items, stack);
                stack.pop();
                result
            }
        }
    }

    /// Left-to-right fold without short-circuiting; an empty list is false.
    fn eval_composite(&self, items: &'a [CompositeItem], stack: &mut Vec<&'a str>) -> bool {
        let mut terms = items.iter();
        let Some(first) = terms.next() else {
            return false;
        };
        let mut result = self.eval_predicate(&first.predicate, stack) ^ first.negate;
        for item in terms {
            let value = self.eval_predicate(&item.predicate, stack) ^ item.negate;
            result = match item.junction {
                Junction::And => result & value,
                Junction::Or => result | value,
            };
        }
        result
    }
}
