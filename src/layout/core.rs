use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique identifier for layouts.
pub type LayoutId = String;

/// Element kinds are open-ended host identifiers ("action_bar_1", "minimap", ...).
pub type ElementKind = String;

pub type WindowName = String;

/// Flat layout collection keyed by id, iterated in id order.
pub type LayoutMap = BTreeMap<LayoutId, Layout>;

bitflags! {
    /// Fields of an [`Element`] that carry authoritative values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ElementFields: u16 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const SCALE = 1 << 2;
        const OPTIONS = 1 << 3;
        const VISIBILITY = 1 << 4;
        const OPACITY = 1 << 5;
        const ANCHOR = 1 << 6;
        const POSITION = Self::X.bits() | Self::Y.bits();
    }
}

bitflags! {
    /// Fields of a [`Window`] that carry authoritative values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WindowFields: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
    }
}

bitflags! {
    /// Input modes an element is shown in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InputVisibility: u8 {
        const KEYBOARD = 1 << 0;
        const GAMEPAD = 1 << 1;
    }
}

impl Default for InputVisibility {
    fn default() -> Self {
        Self::all()
    }
}

/// Corner or edge an element position is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    #[default]
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

/// Host-reported size, never merged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeHint {
    pub width: f32,
    pub height: f32,
}

/// Per-kind override record guarded by [`ElementFields`].
///
/// Values for fields outside `enabled` are placeholders. An element with every
/// field enabled replaces whatever it is merged onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    #[serde(default)]
    pub enabled: ElementFields,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "unit")]
    pub scale: f32,
    #[serde(default)]
    pub options: Vec<u8>,
    #[serde(default)]
    pub visibility: InputVisibility,
    #[serde(default = "unit")]
    pub opacity: f32,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub size_hint: SizeHint,
}

fn unit() -> f32 {
    1.0
}

impl Element {
    pub fn new(kind: impl Into<ElementKind>) -> Self {
        Self {
            kind: kind.into(),
            enabled: ElementFields::empty(),
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            options: Vec::new(),
            visibility: InputVisibility::default(),
            opacity: 1.0,
            anchor: Anchor::default(),
            size_hint: SizeHint::default(),
        }
    }

    pub fn with_x(mut self, x: f32) -> Self {
        self.x = x;
        self.enabled |= ElementFields::X;
        self
    }

    pub fn with_y(mut self, y: f32) -> Self {
        self.y = y;
        self.enabled |= ElementFields::Y;
        self
    }

    pub fn with_position(self, x: f32, y: f32) -> Self {
        self.with_x(x).with_y(y)
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self.enabled |= ElementFields::SCALE;
        self
    }

    pub fn with_options(mut self, options: impl Into<Vec<u8>>) -> Self {
        self.options = options.into();
        self.enabled |= ElementFields::OPTIONS;
        self
    }

    pub fn with_visibility(mut self, visibility: InputVisibility) -> Self {
        self.visibility = visibility;
        self.enabled |= ElementFields::VISIBILITY;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.enabled |= ElementFields::OPACITY;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self.enabled |= ElementFields::ANCHOR;
        self
    }

    pub fn with_size_hint(mut self, width: f32, height: f32) -> Self {
        self.size_hint = SizeHint { width, height };
        self
    }

    /// Mark every field authoritative, turning a patch into a full replacement.
    pub fn full(mut self) -> Self {
        self.enabled = ElementFields::all();
        self
    }

    pub fn is_full_replacement(&self) -> bool {
        self.enabled == ElementFields::all()
    }
}

/// Window position override guarded by [`WindowFields`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub name: WindowName,
    #[serde(default)]
    pub enabled: WindowFields,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl Window {
    pub fn new(name: impl Into<WindowName>) -> Self {
        Self {
            name: name.into(),
            enabled: WindowFields::empty(),
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn with_x(mut self, x: f32) -> Self {
        self.x = x;
        self.enabled |= WindowFields::X;
        self
    }

    pub fn with_y(mut self, y: f32) -> Self {
        self.y = y;
        self.enabled |= WindowFields::Y;
        self
    }

    pub fn with_position(self, x: f32, y: f32) -> Self {
        self.with_x(x).with_y(y)
    }

    pub fn is_full_replacement(&self) -> bool {
        self.enabled == WindowFields::all()
    }
}

/// Opaque entry owned by an external overlay provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub key: String,
    #[serde(default)]
    pub payload: Value,
}

impl Overlay {
    pub fn new(key: impl Into<String>, payload: Value) -> Self {
        Self {
            key: key.into(),
            payload,
        }
    }
}

/// Named bundle of element, window, and overlay overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub id: LayoutId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elements: BTreeMap<ElementKind, Element>,
    #[serde(default)]
    pub windows: BTreeMap<WindowName, Window>,
    #[serde(default)]
    pub overlays: Vec<Overlay>,
    #[serde(default)]
    pub parent: Option<LayoutId>,
}

impl Layout {
    pub fn new(id: impl Into<LayoutId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elements: BTreeMap::new(),
            windows: BTreeMap::new(),
            overlays: Vec::new(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<LayoutId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.insert(element.kind.clone(), element);
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.windows.insert(window.name.clone(), window);
        self
    }

    /// Add an overlay, replacing any earlier entry with the same key.
    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        match self.overlays.iter_mut().find(|o| o.key == overlay.key) {
            Some(existing) => *existing = overlay,
            None => self.overlays.push(overlay),
        }
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
