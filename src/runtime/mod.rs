use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::condition::Evaluator;
use crate::layout::{Composer, EffectiveLayout, ForestIssue, LayoutForest, LayoutId};
use crate::logging::{
    LogLevel, Logger, TARGET_CONDITION, TARGET_ENGINE, TARGET_FOREST, emit, json_kv, json_str,
};
use crate::metrics::SwapMetrics;
use crate::rules::decide;
use crate::sink::CommitSink;
use crate::state::{StateProvider, StateSnapshot};
use crate::store::SwapConfig;

pub mod staging;

pub use staging::{Selection, StageAction, StagingCache};

/// Configuration knobs for the swap engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Optional structured logger used by the engine.
    pub logger: Option<Logger>,
    /// Metrics accumulator used for periodic snapshots.
    pub metrics: Option<Arc<Mutex<SwapMetrics>>>,
    /// Ticks between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: u64,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    /// Target field used for engine events.
    pub log_target: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            metrics_interval: 600,
            metrics_target: "layout_swap::engine.metrics".to_string(),
            log_target: TARGET_ENGINE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(SwapMetrics::new())));
        }
    }

    /// Disable metrics collection and prevent further snapshots.
    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<SwapMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The edit lock is held; nothing was evaluated.
    Locked,
    /// No base rule matched.
    NoMatch,
    /// Same selection as the last commit.
    Unchanged,
    /// Same layouts under a new role; only the role hook ran.
    RoleRefreshed,
    Committed(EffectiveLayout),
    /// The chosen base could not be composed.
    Unresolved(LayoutId),
    /// The sink rejected the layout; the cache was left untouched.
    CommitFailed(String),
}

impl TickOutcome {
    pub fn effective(&self) -> Option<&EffectiveLayout> {
        match self {
            TickOutcome::Committed(layout) => Some(layout),
            _ => None,
        }
    }
}

/// Decides, composes, and commits the layout for each state snapshot.
pub struct SwapEngine {
    config: EngineConfig,
    cache: StagingCache,
    edit_locked: bool,
    ticks: u64,
}

impl Default for SwapEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SwapEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: StagingCache::new(),
            edit_locked: false,
            ticks: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn cache(&self) -> &StagingCache {
        &self.cache
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_edit_locked(&self) -> bool {
        self.edit_locked
    }

    /// Suspend evaluation while the host edits layouts. Releasing the lock
    /// invalidates the cache so the next tick commits again.
    pub fn set_edit_lock(&mut self, locked: bool) {
        if self.edit_locked == locked {
            return;
        }
        self.edit_locked = locked;
        if locked {
            self.log(LogLevel::Info, "edit_lock_engaged", std::iter::empty());
        } else {
            self.cache.invalidate();
            self.log(LogLevel::Info, "edit_lock_released", std::iter::empty());
        }
    }

    /// Force the next tick to recompose, e.g. after editing the store.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Pull a snapshot from `provider` and run the pipeline on it.
    pub fn tick<P>(
        &mut self,
        store: &mut SwapConfig,
        provider: &mut P,
        sink: &mut dyn CommitSink,
    ) -> TickOutcome
    where
        P: StateProvider + ?Sized,
    {
        if self.edit_locked {
            return self.finish_tick(|engine| engine.locked());
        }
        let snapshot = provider.snapshot();
        self.decide_and_compose(store, &snapshot, sink)
    }

    pub fn decide_and_compose(
        &mut self,
        store: &mut SwapConfig,
        snapshot: &StateSnapshot,
        sink: &mut dyn CommitSink,
    ) -> TickOutcome {
        self.finish_tick(|engine| engine.run_pipeline(store, snapshot, sink))
    }

    fn finish_tick(&mut self, body: impl FnOnce(&mut Self) -> TickOutcome) -> TickOutcome {
        self.ticks = self.ticks.saturating_add(1);
        self.ensure_metrics_initialized();
        self.record_metric(SwapMetrics::record_tick);
        let outcome = body(self);
        self.maybe_emit_metrics();
        outcome
    }

    fn locked(&mut self) -> TickOutcome {
        self.record_metric(SwapMetrics::record_locked);
        self.log(LogLevel::Trace, "tick_locked", std::iter::empty());
        TickOutcome::Locked
    }

    fn run_pipeline(
        &mut self,
        store: &mut SwapConfig,
        snapshot: &StateSnapshot,
        sink: &mut dyn CommitSink,
    ) -> TickOutcome {
        if self.edit_locked {
            return self.locked();
        }

        let pruned = store.conditions.prune_dangling();
        for item in &pruned {
            emit(
                self.config.logger.as_ref(),
                LogLevel::Warn,
                TARGET_CONDITION,
                "dangling_item_pruned",
                [
                    json_str("owner", item.owner.as_str()),
                    json_str("missing", item.missing.as_str()),
                ],
            );
        }

        let layering = store.settings.advanced_layering;
        let (selection, layers_without_base, dangling) = {
            let logger = self.config.logger.as_ref();
            let evaluator = Evaluator::new(&store.conditions, snapshot).with_logger(logger);
            let decision = decide(&store.rules, &evaluator, &store.layouts, layering, logger);
            let dangling = pruned.len() + evaluator.dangling_count() + decision.dangling.len();
            let selection = decision.base_id().map(|base| {
                Selection::new(snapshot.role.clone(), base.clone(), decision.layer_ids())
            });
            (selection, decision.layers.len(), dangling)
        };
        self.record_metric(|metrics| metrics.record_dangling(dangling));

        let Some(selection) = selection else {
            self.record_metric(SwapMetrics::record_no_match);
            self.log(
                LogLevel::Debug,
                "no_match",
                [json_kv("unplaced_layers", json!(layers_without_base))],
            );
            return TickOutcome::NoMatch;
        };

        match self.cache.stage(&selection) {
            StageAction::Skip => {
                self.record_metric(SwapMetrics::record_cache_skip);
                TickOutcome::Unchanged
            }
            StageAction::RoleRefresh => self.refresh_role(store, selection, sink),
            StageAction::Full => self.commit(store, selection, sink),
        }
    }

    fn refresh_role(
        &mut self,
        store: &SwapConfig,
        selection: Selection,
        sink: &mut dyn CommitSink,
    ) -> TickOutcome {
        let Some(effective) = self.cache.effective() else {
            return self.commit(store, selection, sink);
        };

        match sink.refresh_role(selection.role.as_ref(), effective) {
            Ok(()) => {
                self.cache.refresh_role(selection.role.clone());
                self.record_metric(SwapMetrics::record_role_refresh);
                self.log(
                    LogLevel::Debug,
                    "role_refreshed",
                    [
                        json_kv("role", json!(selection.role)),
                        json_str("layout", selection.base.as_str()),
                    ],
                );
                TickOutcome::RoleRefreshed
            }
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    "role_refresh_failed",
                    [json_str("error", err.to_string())],
                );
                TickOutcome::CommitFailed(err.to_string())
            }
        }
    }

    fn commit(
        &mut self,
        store: &SwapConfig,
        selection: Selection,
        sink: &mut dyn CommitSink,
    ) -> TickOutcome {
        let forest = LayoutForest::build(&store.layouts);
        self.log_forest_issues(forest.issues());

        let composed = Composer::new(&store.layouts, &forest)
            .with_layering(store.settings.advanced_layering)
            .with_logger(self.config.logger.as_ref())
            .compose(&selection.base, &selection.layers);

        let Some(effective) = composed else {
            self.log(
                LogLevel::Error,
                "unresolved_base",
                [json_str("layout", selection.base.as_str())],
            );
            return TickOutcome::Unresolved(selection.base);
        };

        if let Err(err) = sink.apply(&effective) {
            self.log(
                LogLevel::Error,
                "commit_failed",
                [
                    json_str("layout", selection.base.as_str()),
                    json_str("error", err.to_string()),
                ],
            );
            return TickOutcome::CommitFailed(err.to_string());
        }

        self.record_metric(SwapMetrics::record_commit);
        self.log(
            LogLevel::Info,
            "layout_committed",
            [
                json_str("layout", selection.base.as_str()),
                json_kv("layers", json!(effective.layers)),
                json_str("fingerprint", effective.fingerprint().to_hex().to_string()),
            ],
        );
        self.cache.commit(selection, effective.clone());
        TickOutcome::Committed(effective)
    }

    fn log_forest_issues(&self, issues: &[ForestIssue]) {
        for issue in issues {
            let (message, fields) = match issue {
                ForestIssue::MissingParent { layout, parent } => (
                    "missing_parent",
                    vec![
                        json_str("layout", layout.as_str()),
                        json_str("parent", parent.as_str()),
                    ],
                ),
                ForestIssue::ParentCycle { layout } => {
                    ("parent_cycle_broken", vec![json_str("layout", layout.as_str())])
                }
            };
            emit(
                self.config.logger.as_ref(),
                LogLevel::Warn,
                TARGET_FOREST,
                message,
                fields,
            );
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(
            self.config.logger.as_ref(),
            level,
            &self.config.log_target,
            message,
            fields,
        );
    }

    fn ensure_metrics_initialized(&mut self) {
        if self.config.metrics.is_none() && self.config.metrics_interval > 0 {
            self.config.metrics = Some(Arc::new(Mutex::new(SwapMetrics::new())));
        }
    }

    fn record_metric(&self, record: impl FnOnce(&mut SwapMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut guard);
            }
        }
    }

    fn maybe_emit_metrics(&self) {
        let interval = self.config.metrics_interval;
        if interval == 0 || self.ticks % interval != 0 {
            return;
        }

        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let target = self.config.metrics_target.as_str();
                let _ = logger.log_event(guard.snapshot().to_log_event(target));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{CompositeItem, ConditionSet, CustomCondition, Predicate};
    use crate::error::{Result, SwapError};
    use crate::layout::{Element, Layout};
    use crate::logging::MemorySink;
    use crate::rules::Rule;
    use crate::sink::RecordingSink;

    fn store() -> SwapConfig {
        let mut store = SwapConfig::new();
        store
            .add_layout(Layout::new("base", "Base").with_element(Element::new("chat").with_x(10.0)))
            .unwrap();
        store
            .add_layout(
                Layout::new("combat", "Combat")
                    .with_parent("base")
                    .with_element(Element::new("chat").with_y(5.0)),
            )
            .unwrap();
        store.push_rule(Rule::new("combat").with_status("combat"));
        store.push_rule(Rule::new("base"));
        store
    }

    fn quiet_engine() -> SwapEngine {
        let mut config = EngineConfig::default();
        config.metrics_interval = 0;
        SwapEngine::new(config)
    }

    struct FailingSink;

    impl CommitSink for FailingSink {
        fn apply(&mut self, _layout: &EffectiveLayout) -> Result<()> {
            Err(SwapError::Io(std::io::Error::other("host busy")))
        }
    }

    #[test]
    fn identical_ticks_commit_once() {
        let mut store = store();
        let mut engine = quiet_engine();
        let mut sink = RecordingSink::new();
        let snapshot = StateSnapshot::new("dps");

        let first = engine.decide_and_compose(&mut store, &snapshot, &mut sink);
        assert_eq!(first.effective().map(|layout| layout.base.as_str()), Some("base"));
        let second = engine.decide_and_compose(&mut store, &snapshot, &mut sink);
        assert_eq!(second, TickOutcome::Unchanged);
        assert_eq!(sink.commits.len(), 1);
    }

    #[test]
    fn state_change_recomposes_with_inheritance() {
        let mut store = store();
        let mut engine = quiet_engine();
        let mut sink = RecordingSink::new();

        engine.decide_and_compose(&mut store, &StateSnapshot::new("dps"), &mut sink);
        let fighting = StateSnapshot::new("dps").with_status("combat", true);
        let outcome = engine.decide_and_compose(&mut store, &fighting, &mut sink);

        let chat = outcome.effective().and_then(|layout| layout.element("chat")).unwrap();
        assert_eq!((chat.x, chat.y), (10.0, 5.0));
        assert_eq!(sink.commits.len(), 2);
    }

    #[test]
    fn edit_lock_blocks_then_forces_recommit() {
        let mut store = store();
        let mut engine = quiet_engine();
        let mut sink = RecordingSink::new();
        let snapshot = StateSnapshot::new("dps");

        engine.decide_and_compose(&mut store, &snapshot, &mut sink);
        engine.set_edit_lock(true);
        assert_eq!(
            engine.decide_and_compose(&mut store, &snapshot, &mut sink),
            TickOutcome::Locked
        );
        engine.set_edit_lock(false);
        assert!(engine.cache().effective().is_none());
        assert!(matches!(
            engine.decide_and_compose(&mut store, &snapshot, &mut sink),
            TickOutcome::Committed(_)
        ));
        assert_eq!(sink.commits.len(), 2);
    }

    #[test]
    fn locked_tick_does_not_pull_a_snapshot() {
        let mut store = store();
        let mut engine = quiet_engine();
        let mut sink = RecordingSink::new();
        let mut pulls = 0;
        let mut provider = || {
            pulls += 1;
            StateSnapshot::new("dps")
        };

        engine.set_edit_lock(true);
        assert_eq!(
            engine.tick(&mut store, &mut provider, &mut sink),
            TickOutcome::Locked
        );
        engine.set_edit_lock(false);
        assert!(matches!(
            engine.tick(&mut store, &mut provider, &mut sink),
            TickOutcome::Committed(_)
        ));
        assert_eq!(pulls, 1);
        assert_eq!(engine.ticks(), 2);
    }

    #[test]
    fn role_switch_on_same_layout_only_refreshes() {
        let mut store = store();
        let mut engine = quiet_engine();
        let mut sink = RecordingSink::new();

        engine.decide_and_compose(&mut store, &StateSnapshot::new("tank"), &mut sink);
        let healer = StateSnapshot::new("healer");
        let outcome = engine.decide_and_compose(&mut store, &healer, &mut sink);

        assert_eq!(outcome, TickOutcome::RoleRefreshed);
        assert_eq!(sink.commits.len(), 1);
        assert_eq!(sink.role_refreshes.len(), 1);
        assert_eq!(sink.role_refreshes[0].0.as_deref(), Some("healer"));
        assert_eq!(
            engine.decide_and_compose(&mut store, &StateSnapshot::new("healer"), &mut sink),
            TickOutcome::Unchanged
        );
    }

    #[test]
    fn empty_snapshot_is_no_match() {
        let mut store = store();
        let mut engine = quiet_engine();
        let mut sink = RecordingSink::new();
        let outcome = engine.decide_and_compose(&mut store, &StateSnapshot::empty(), &mut sink);
        assert_eq!(outcome, TickOutcome::NoMatch);
        assert!(sink.commits.is_empty());
    }

    #[test]
    fn failed_commit_leaves_cache_empty() {
        let mut store = store();
        let mut engine = quiet_engine();
        let snapshot = StateSnapshot::new("dps");

        let outcome = engine.decide_and_compose(&mut store, &snapshot, &mut FailingSink);
        assert!(matches!(outcome, TickOutcome::CommitFailed(ref msg) if msg.contains("host busy")));
        assert!(engine.cache().committed().is_none());

        let mut sink = RecordingSink::new();
        engine.decide_and_compose(&mut store, &snapshot, &mut sink);
        assert_eq!(sink.commits.len(), 1);
    }

    #[test]
    fn dangling_composite_items_are_pruned_each_tick() {
        let mut store = store();
        store.conditions = serde_json::from_str::<ConditionSet>(
            r#"[{"name":"wrapper","type":"composite","items":[
                {"predicate":{"kind":"status","id":"combat"}},
                {"predicate":{"kind":"condition","id":"gone"}}
            ]}]"#,
        )
        .unwrap();

        let sink_log = MemorySink::new();
        let mut config = EngineConfig::default().with_logger(Logger::new(sink_log.clone()));
        config.enable_metrics();
        config.metrics_interval = 0;
        let metrics = config.metrics_handle().unwrap();
        let mut engine = SwapEngine::new(config);

        engine.decide_and_compose(
            &mut store,
            &StateSnapshot::new("dps"),
            &mut RecordingSink::new(),
        );

        let CustomCondition { kind, .. } = store.conditions.get("wrapper").unwrap();
        assert_eq!(
            kind,
            &crate::condition::ConditionKind::Composite {
                items: vec![CompositeItem::and(Predicate::status("combat"))]
            }
        );
        assert_eq!(metrics.lock().unwrap().snapshot().dangling_refs, 1);
        assert_eq!(
            sink_log.messages_for(TARGET_CONDITION),
            vec!["dangling_item_pruned".to_string()]
        );
    }

    #[test]
    fn metrics_snapshot_emitted_on_interval() {
        let mut store = store();
        let log = MemorySink::new();
        let mut config = EngineConfig::default().with_logger(Logger::new(log.clone()));
        config.metrics_interval = 2;
        let target = config.metrics_target.clone();
        let mut engine = SwapEngine::new(config);
        let mut sink = RecordingSink::new();

        for _ in 0..4 {
            engine.decide_and_compose(&mut store, &StateSnapshot::new("dps"), &mut sink);
        }

        let snapshots: Vec<_> = log
            .events()
            .into_iter()
            .filter(|event| event.target == target)
            .collect();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].fields["ticks"], json!(4));
        assert_eq!(snapshots[1].fields["commits"], json!(1));
        assert_eq!(snapshots[1].fields["cache_skips"], json!(3));
    }

    #[test]
    fn orphaned_layout_logs_missing_parent() {
        let mut store = SwapConfig::new();
        store
            .add_layout(Layout::new("orphan", "Orphan").with_parent("deleted"))
            .unwrap();
        store.push_rule(Rule::new("orphan"));

        let log = MemorySink::new();
        let mut config = EngineConfig::default().with_logger(Logger::new(log.clone()));
        config.metrics_interval = 0;
        let mut engine = SwapEngine::new(config);
        let outcome = engine.decide_and_compose(
            &mut store,
            &StateSnapshot::new("dps"),
            &mut RecordingSink::new(),
        );

        assert!(matches!(outcome, TickOutcome::Committed(_)));
        let warning = log
            .events()
            .into_iter()
            .find(|event| event.target == TARGET_FOREST)
            .unwrap();
        assert_eq!(warning.message, "missing_parent");
        assert_eq!(warning.level, LogLevel::Warn);
        assert_eq!(warning.fields["parent"], json!("deleted"));
    }

    #[test]
    fn commit_logs_fingerprint() {
        let mut store = store();
        let log = MemorySink::new();
        let mut config = EngineConfig::default().with_logger(Logger::new(log.clone()));
        config.metrics_interval = 0;
        let mut engine = SwapEngine::new(config);
        engine.decide_and_compose(
            &mut store,
            &StateSnapshot::new("dps"),
            &mut RecordingSink::new(),
        );

        let committed = log
            .events()
            .into_iter()
            .find(|event| event.message == "layout_committed")
            .unwrap();
        let expected = engine.cache().committed_fingerprint().unwrap().to_hex().to_string();
        assert_eq!(committed.fields["fingerprint"], json!(expected));
    }
}
