use serde_json::json;

use super::core::Rule;
use crate::condition::Evaluator;
use crate::layout::{LayoutId, LayoutMap};
use crate::logging::{LogLevel, Logger, TARGET_DECIDE, emit, json_kv, json_str};

/// Outcome of one scan over the rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision<'a> {
    /// First matching non-layer rule, if any.
    pub base: Option<&'a Rule>,
    /// Matching layer rules found above the base, in table order.
    pub layers: Vec<&'a Rule>,
    /// Matching rules skipped because their target layout is gone.
    pub dangling: Vec<&'a Rule>,
}

impl Decision<'_> {
    pub fn base_id(&self) -> Option<&LayoutId> {
        self.base.map(|rule| &rule.target)
    }

    pub fn layer_ids(&self) -> Vec<LayoutId> {
        self.layers.iter().map(|rule| rule.target.clone()).collect()
    }
}

/// Scan `rules` top to bottom and pick the base rule plus the layers above it.
///
/// Matching layer rules accumulate until the first matching non-layer rule,
/// which ends the scan. With layering disabled the layer flag is ignored.
/// A matching rule whose target is missing from `layouts` counts as a
/// non-match.
pub fn decide<'a>(
    rules: &'a [Rule],
    evaluator: &Evaluator<'_>,
    layouts: &LayoutMap,
    advanced_layering: bool,
    logger: Option<&Logger>,
) -> Decision<'a> {
    let mut decision = Decision::default();

    for (index, rule) in rules.iter().enumerate() {
        if !rule.matches(evaluator) {
            continue;
        }
        if !layouts.contains_key(&rule.target) {
            emit(
                logger,
                LogLevel::Warn,
                TARGET_DECIDE,
                "dangling_rule_target",
                [json_kv("rule", json!(index)), json_str("layout", rule.target.as_str())],
            );
            decision.dangling.push(rule);
            continue;
        }
        if advanced_layering && rule.is_layer {
            decision.layers.push(rule);
            continue;
        }
        decision.base = Some(rule);
        emit(
            logger,
            LogLevel::Trace,
            TARGET_DECIDE,
            "base_selected",
            [
                json_kv("rule", json!(index)),
                json_str("layout", rule.target.as_str()),
                json_kv("layers", json!(decision.layers.len())),
            ],
        );
        break;
    }

    decision
}
