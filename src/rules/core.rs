use serde::{Deserialize, Serialize};

use crate::condition::{ConditionName, Evaluator, Predicate};
use crate::layout::LayoutId;
use crate::state::{RoleId, StatusId};

/// One row of the prioritized rule table.
///
/// Every present predicate must hold for the rule to match; absent
/// predicates match anything. A rule with no predicates matches any
/// snapshot that has a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub role: Option<RoleId>,
    #[serde(default)]
    pub status: Option<StatusId>,
    #[serde(default)]
    pub condition: Option<ConditionName>,
    pub target: LayoutId,
    #[serde(default)]
    pub is_layer: bool,
}

impl Rule {
    pub fn new(target: impl Into<LayoutId>) -> Self {
        Self {
            role: None,
            status: None,
            condition: None,
            target: target.into(),
            is_layer: false,
        }
    }

    pub fn for_role(mut self, role: impl Into<RoleId>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<StatusId>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<ConditionName>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn as_layer(mut self) -> Self {
        self.is_layer = true;
        self
    }

    /// The present predicates, in role, status, condition order.
    pub fn predicates(&self) -> impl Iterator<Item = Predicate> + '_ {
        let role = self.role.clone().map(Predicate::Role);
        let status = self.status.clone().map(Predicate::Status);
        let condition = self.condition.clone().map(Predicate::Condition);
        [role, status, condition].into_iter().flatten()
    }

    pub fn matches(&self, evaluator: &Evaluator<'_>) -> bool {
        evaluator.snapshot().has_subject()
            && self
                .predicates()
                .all(|predicate| evaluator.predicate(&predicate))
    }

    pub fn references_condition(&self, name: &str) -> bool {
        self.condition.as_deref() == Some(name)
    }
}
