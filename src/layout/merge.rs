//! Enabled-mask merge algebra for layout entries.
//!
//! Merging is a pure function of the ancestor value and the more specific
//! value. Application order is fixed by the composer (root to leaf, then
//! layers); the operation is associative in that order but not commutative.

use std::collections::BTreeMap;

use super::core::{Element, ElementFields, Overlay, Window, WindowFields};

/// An entry that can either replace or patch an inherited value.
pub trait Overridable: Clone {
    fn is_full_replacement(&self) -> bool;

    /// Overwrite the fields `patch` marks enabled, leaving the rest untouched.
    fn apply_patch(&mut self, patch: &Self);
}

impl Overridable for Element {
    fn is_full_replacement(&self) -> bool {
        Element::is_full_replacement(self)
    }

    fn apply_patch(&mut self, patch: &Self) {
        let mask = patch.enabled;
        if mask.contains(ElementFields::X) {
            self.x = patch.x;
        }
        if mask.contains(ElementFields::Y) {
            self.y = patch.y;
        }
        if mask.contains(ElementFields::SCALE) {
            self.scale = patch.scale;
        }
        if mask.contains(ElementFields::OPTIONS) {
            self.options.clone_from(&patch.options);
        }
        if mask.contains(ElementFields::VISIBILITY) {
            self.visibility = patch.visibility;
        }
        if mask.contains(ElementFields::OPACITY) {
            self.opacity = patch.opacity;
        }
        if mask.contains(ElementFields::ANCHOR) {
            self.anchor = patch.anchor;
        }
        self.enabled |= mask;
    }
}

impl Overridable for Window {
    fn is_full_replacement(&self) -> bool {
        Window::is_full_replacement(self)
    }

    fn apply_patch(&mut self, patch: &Self) {
        if patch.enabled.contains(WindowFields::X) {
            self.x = patch.x;
        }
        if patch.enabled.contains(WindowFields::Y) {
            self.y = patch.y;
        }
        self.enabled |= patch.enabled;
    }
}

/// Combine an inherited value with a more specific one.
///
/// With nothing inherited the specific value is taken as-is whatever its mask.
pub fn merge<T: Overridable>(inherited: Option<&T>, specific: &T) -> T {
    match inherited {
        Some(base) if !specific.is_full_replacement() => {
            let mut merged = base.clone();
            merged.apply_patch(specific);
            merged
        }
        _ => specific.clone(),
    }
}

pub fn merge_element(inherited: Option<&Element>, specific: &Element) -> Element {
    merge(inherited, specific)
}

pub fn merge_window(inherited: Option<&Window>, specific: &Window) -> Window {
    merge(inherited, specific)
}

/// Merge every entry of `specific` into `target`, keyed by map key.
pub fn merge_entries<K, T>(target: &mut BTreeMap<K, T>, specific: &BTreeMap<K, T>)
where
    K: Ord + Clone,
    T: Overridable,
{
    for (key, value) in specific {
        let merged = merge(target.get(key), value);
        target.insert(key.clone(), merged);
    }
}

/// Overlays are opaque: a later entry with the same key replaces the earlier one.
pub fn merge_overlays(target: &mut Vec<Overlay>, specific: &[Overlay]) {
    for overlay in specific {
        match target.iter_mut().find(|existing| existing.key == overlay.key) {
            Some(existing) => *existing = overlay.clone(),
            None => target.push(overlay.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::core::Anchor;

    #[test]
    fn partial_patch_inherits_untouched_fields() {
        let ancestor = Element::new("chat").with_position(10.0, 20.0);
        let child = Element::new("chat").with_x(99.0);

        let merged = merge(Some(&ancestor), &child);
        assert_eq!(merged.x, 99.0);
        assert_eq!(merged.y, 20.0);
        assert_eq!(merged.enabled, ElementFields::POSITION);
    }

    #[test]
    fn full_replacement_ignores_ancestry() {
        let ancestor = Element::new("chat")
            .with_position(10.0, 20.0)
            .with_anchor(Anchor::TopLeft);
        let child = Element::new("chat").with_x(5.0).full();

        let merged = merge(Some(&ancestor), &child);
        assert_eq!(merged, child);
        assert_eq!(merged.anchor, Anchor::Center);
    }

    #[test]
    fn window_patch_keeps_inherited_axis() {
        let ancestor = Window::new("bags").with_position(100.0, 200.0);
        let child = Window::new("bags").with_y(50.0);
        let merged = merge_window(Some(&ancestor), &child);
        assert_eq!((merged.x, merged.y), (100.0, 50.0));
        assert_eq!(merged.enabled, WindowFields::X | WindowFields::Y);
        assert!(merged.is_full_replacement());
        assert_eq!(merge_element(None, &Element::new("chat").with_x(1.0)).x, 1.0);
    }

    #[test]
    fn full_replacement_is_idempotent() {
        let full = Element::new("bags")
            .with_position(1.0, 2.0)
            .with_scale(0.8)
            .with_options(vec![1, 2, 3])
            .full();

        let once = merge(Some(&full), &full);
        let twice = merge(Some(&once), &full);
        assert_eq!(once, full);
        assert_eq!(twice, full);
    }

    #[test]
    fn first_value_is_taken_regardless_of_mask() {
        let patch = Element::new("buffs").with_y(7.0);
        let merged = merge(None, &patch);
        assert_eq!(merged, patch);
    }

    #[test]
    fn disabled_fields_are_inert() {
        let ancestor = Element::new("map").with_opacity(0.4);
        let mut child = Element::new("map").with_scale(2.0);
        child.opacity = 0.0;

        let merged = merge(Some(&ancestor), &child);
        assert_eq!(merged.opacity, 0.4);
        assert_eq!(merged.scale, 2.0);
    }

    #[test]
    fn merge_order_matters() {
        let a = Element::new("k").with_x(1.0);
        let b = Element::new("k").with_x(2.0);
        assert_eq!(merge(Some(&a), &b).x, 2.0);
        assert_eq!(merge(Some(&b), &a).x, 1.0);
    }

    #[test]
    fn overlays_replace_by_key() {
        let mut target = vec![Overlay::new("a", serde_json::json!(1))];
        merge_overlays(
            &mut target,
            &[
                Overlay::new("b", serde_json::json!(2)),
                Overlay::new("a", serde_json::json!(3)),
            ],
        );
        assert_eq!(target.len(), 2);
        assert_eq!(target[0].payload, serde_json::json!(3));
        assert_eq!(target[1].key, "b");
    }
}
