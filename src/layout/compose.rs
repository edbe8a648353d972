use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use super::core::{Element, ElementKind, Layout, LayoutId, LayoutMap, Overlay, Window, WindowName};
use super::forest::LayoutForest;
use super::merge::{merge_entries, merge_overlays};
use crate::logging::{LogLevel, Logger, TARGET_COMPOSE, emit, json_kv, json_str};

/// Fully merged, parent-free result of composing a layout with its ancestry and layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveLayout {
    /// Layout the composition was rooted at.
    pub base: LayoutId,
    /// Layers that were actually applied, in rule-table order.
    pub layers: Vec<LayoutId>,
    pub elements: BTreeMap<ElementKind, Element>,
    pub windows: BTreeMap<WindowName, Window>,
    pub overlays: Vec<Overlay>,
}

impl EffectiveLayout {
    fn empty(base: &LayoutId) -> Self {
        Self {
            base: base.clone(),
            layers: Vec::new(),
            elements: BTreeMap::new(),
            windows: BTreeMap::new(),
            overlays: Vec::new(),
        }
    }

    fn apply(&mut self, layout: &Layout) {
        merge_entries(&mut self.elements, &layout.elements);
        merge_entries(&mut self.windows, &layout.windows);
        merge_overlays(&mut self.overlays, &layout.overlays);
    }

    pub fn element(&self, kind: &str) -> Option<&Element> {
        self.elements.get(kind)
    }

    pub fn window(&self, name: &str) -> Option<&Window> {
        self.windows.get(name)
    }

    /// Stable content hash over the canonical JSON encoding.
    pub fn fingerprint(&self) -> blake3::Hash {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes)
    }

    /// Materialize as a plain root layout.
    pub fn into_layout(self, id: impl Into<LayoutId>, name: impl Into<String>) -> Layout {
        Layout {
            id: id.into(),
            name: name.into(),
            elements: self.elements,
            windows: self.windows,
            overlays: self.overlays,
            parent: None,
        }
    }
}

/// Resolves a target layout plus active layers into an [`EffectiveLayout`].
pub struct Composer<'a> {
    layouts: &'a LayoutMap,
    forest: &'a LayoutForest,
    advanced_layering: bool,
    logger: Option<&'a Logger>,
}

impl<'a> Composer<'a> {
    pub fn new(layouts: &'a LayoutMap, forest: &'a LayoutForest) -> Self {
        Self {
            layouts,
            forest,
            advanced_layering: false,
            logger: None,
        }
    }

    pub fn with_layering(mut self, enabled: bool) -> Self {
        self.advanced_layering = enabled;
        self
    }

    pub fn with_logger(mut self, logger: Option<&'a Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Compose `target` over its ancestors, then `layers` on top.
    ///
    /// Ancestors apply root first. Layers apply in reverse of the given order,
    /// so the first layer in `layers` lands last and wins conflicts. Unknown
    /// layer ids are logged and skipped; an unknown target yields `None`.
    pub fn compose(&self, target: &str, layers: &[LayoutId]) -> Option<EffectiveLayout> {
        let Some((node, layout)) = self
            .forest
            .find(target)
            .zip(self.layouts.get(target))
        else {
            emit(
                self.logger,
                LogLevel::Warn,
                TARGET_COMPOSE,
                "dangling_target",
                [json_str("layout", target)],
            );
            return None;
        };

        let mut effective = EffectiveLayout::empty(node.id());

        let chain: Vec<&Layout> = self
            .forest
            .ancestors(node)
            .filter_map(|ancestor| self.layouts.get(ancestor.id()))
            .collect();
        for ancestor in chain.iter().rev() {
            effective.apply(ancestor);
        }
        effective.apply(layout);

        if self.advanced_layering && !layers.is_empty() {
            for layer_id in layers.iter().rev() {
                match self.layouts.get(layer_id) {
                    Some(layer) => {
                        effective.apply(layer);
                    }
                    None => emit(
                        self.logger,
                        LogLevel::Warn,
                        TARGET_COMPOSE,
                        "dangling_layer",
                        [json_str("layer", layer_id.as_str())],
                    ),
                }
            }
            effective.layers = layers
                .iter()
                .filter(|id| self.layouts.contains_key(*id))
                .cloned()
                .collect();
        }

        emit(
            self.logger,
            LogLevel::Debug,
            TARGET_COMPOSE,
            "composed",
            [
                json_str("layout", target),
                json_kv("ancestors", json!(chain.len())),
                json_kv("layers", json!(effective.layers.len())),
                json_kv("elements", json!(effective.elements.len())),
            ],
        );
        Some(effective)
    }
}
