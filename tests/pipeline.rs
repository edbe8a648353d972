use layout_swap::{
    CompositeItem, ConditionSet, CustomCondition, Element, ElementFields, EngineConfig, Layout,
    Logger, MemorySink, Predicate, RecordingSink, Rule, StateSnapshot, SwapConfig, SwapEngine,
    SwapError, TickOutcome, merge, validate_composite_edit,
};

fn engine() -> SwapEngine {
    let mut config = EngineConfig::default();
    config.metrics_interval = 0;
    SwapEngine::new(config)
}

#[test]
fn partial_patch_inherits_unset_fields() {
    let mut store = SwapConfig::new();
    store
        .add_layout(
            Layout::new("A", "A").with_element(Element::new("bar").with_position(10.0, 20.0)),
        )
        .unwrap();
    store
        .add_layout(
            Layout::new("B", "B")
                .with_parent("A")
                .with_element(Element::new("bar").with_x(99.0)),
        )
        .unwrap();
    store.push_rule(Rule::new("B"));

    let mut sink = RecordingSink::new();
    let outcome = engine().decide_and_compose(&mut store, &StateSnapshot::new("dps"), &mut sink);
    let bar = outcome.effective().and_then(|layout| layout.element("bar")).unwrap();
    assert_eq!((bar.x, bar.y), (99.0, 20.0));
    assert_eq!(bar.enabled, ElementFields::X | ElementFields::Y);
}

#[test]
fn full_replacement_is_idempotent() {
    let inherited = Element::new("bar").with_position(1.0, 2.0).with_scale(3.0);
    let specific = Element::new("bar").with_position(5.0, 6.0).full();
    let once = merge(Some(&inherited), &specific);
    assert_eq!(once, specific);
    assert_eq!(merge(Some(&once), &specific), once);
}

#[test]
fn layer_rule_stacks_above_base() {
    let mut store = SwapConfig::new().with_layering(true);
    store
        .add_layout(Layout::new("BaseLayout", "Base").with_element(Element::new("bar").with_x(1.0)))
        .unwrap();
    store
        .add_layout(
            Layout::new("LayerLayout", "Layer").with_element(Element::new("bar").with_y(7.0)),
        )
        .unwrap();
    store.push_rule(Rule::new("LayerLayout").with_status("p1").as_layer());
    store.push_rule(Rule::new("BaseLayout").with_status("p2"));

    let snapshot = StateSnapshot::new("dps")
        .with_status("p1", true)
        .with_status("p2", true);
    let mut sink = RecordingSink::new();
    let outcome = engine().decide_and_compose(&mut store, &snapshot, &mut sink);

    let layout = outcome.effective().unwrap();
    assert_eq!(layout.base, "BaseLayout");
    assert_eq!(layout.layers, vec!["LayerLayout".to_string()]);
    let bar = layout.element("bar").unwrap();
    assert_eq!((bar.x, bar.y), (1.0, 7.0));
}

#[test]
fn first_match_wins_and_no_match_commits_nothing() {
    let mut store = SwapConfig::new();
    store.add_layout(Layout::new("L1", "L1")).unwrap();
    store.add_layout(Layout::new("L2", "L2")).unwrap();
    store.push_rule(Rule::new("L1").with_status("p1"));
    store.push_rule(Rule::new("L2").with_status("p2"));

    let mut engine = engine();
    let mut sink = RecordingSink::new();

    let idle = StateSnapshot::new("dps");
    assert_eq!(
        engine.decide_and_compose(&mut store, &idle, &mut sink),
        TickOutcome::NoMatch
    );
    assert!(sink.commits.is_empty());

    let both = idle.with_status("p1", true).with_status("p2", true);
    let outcome = engine.decide_and_compose(&mut store, &both, &mut sink);
    assert_eq!(outcome.effective().map(|layout| layout.base.as_str()), Some("L1"));
}

#[test]
fn consecutive_identical_ticks_commit_once() {
    let mut store = SwapConfig::new();
    store.add_layout(Layout::new("only", "Only")).unwrap();
    store.push_rule(Rule::new("only"));

    let mut engine = engine();
    let mut sink = RecordingSink::new();
    let mut provider = || StateSnapshot::new("dps");
    for _ in 0..5 {
        engine.tick(&mut store, &mut provider, &mut sink);
    }
    assert_eq!(sink.commits.len(), 1);
}

#[test]
fn validated_edits_never_build_a_cycle() {
    let mut set = ConditionSet::new();
    set.insert(CustomCondition::manual("leaf", true)).unwrap();
    set.insert(CustomCondition::composite(
        "a",
        vec![CompositeItem::and(Predicate::condition("leaf"))],
    ))
    .unwrap();
    set.insert(CustomCondition::composite(
        "b",
        vec![CompositeItem::and(Predicate::condition("a"))],
    ))
    .unwrap();

    let closing = CompositeItem::or(Predicate::condition("b"));
    assert!(!validate_composite_edit(&set, "a", &closing));
    assert!(matches!(
        set.add_item("a", closing),
        Err(SwapError::CycleRejected { .. })
    ));
    let self_loop = CompositeItem::and(Predicate::condition("b"));
    assert!(!validate_composite_edit(&set, "b", &self_loop));

    for name in ["leaf", "a", "b"] {
        assert!(set.validate(name));
    }
}

#[test]
fn cyclic_parents_from_disk_still_compose() {
    let mut store = SwapConfig::from_json(
        r#"{
            "layouts": {
                "a": {"id": "a", "name": "A", "parent": "b",
                      "elements": {"bar": {"kind": "bar", "enabled": "X", "x": 4.0}}},
                "b": {"id": "b", "name": "B", "parent": "a"}
            },
            "rules": [{"target": "a"}]
        }"#,
    )
    .unwrap();

    let log = MemorySink::new();
    let mut config = EngineConfig::default().with_logger(Logger::new(log.clone()));
    config.metrics_interval = 0;
    let mut engine = SwapEngine::new(config);
    let mut sink = RecordingSink::new();

    let outcome = engine.decide_and_compose(&mut store, &StateSnapshot::new("dps"), &mut sink);
    assert_eq!(outcome.effective().and_then(|l| l.element("bar")).map(|bar| bar.x), Some(4.0));
    assert!(
        log.messages_for("layout_swap::forest")
            .contains(&"parent_cycle_broken".to_string())
    );
}

#[test]
fn deleted_layout_falls_through_to_next_rule() {
    let mut store = SwapConfig::new();
    store.add_layout(Layout::new("raid", "Raid")).unwrap();
    store.add_layout(Layout::new("solo", "Solo")).unwrap();
    store.push_rule(Rule::new("raid"));
    store.push_rule(Rule::new("solo"));

    let deleted = store.delete_layout("raid").unwrap();
    assert_eq!(deleted.dangling_rules, vec![0]);

    let mut sink = RecordingSink::new();
    let outcome = engine().decide_and_compose(&mut store, &StateSnapshot::new("dps"), &mut sink);
    assert_eq!(outcome.effective().map(|layout| layout.base.as_str()), Some("solo"));
}
