//! Arena forest built from flat parent pointers.
//!
//! Layouts name their parent by id, and a parent may be visited after its
//! children. Nodes live in an arena indexed by id; the first reference to an
//! unseen id creates a placeholder that is filled in once its own entry shows
//! up. Placeholders that are never filled are missing ancestors: their
//! children are detached and treated as roots.

use std::collections::HashMap;

use super::core::{LayoutId, LayoutMap};

/// Problems found and repaired while building a forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestIssue {
    /// `layout` names a parent that does not exist; it was made a root.
    MissingParent { layout: LayoutId, parent: LayoutId },
    /// `layout` closed a parent cycle; its parent link was dropped.
    ParentCycle { layout: LayoutId },
}

#[derive(Debug, Clone)]
struct Node {
    id: LayoutId,
    parent: Option<usize>,
    children: Vec<usize>,
    present: bool,
}

impl Node {
    fn placeholder(id: LayoutId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            present: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutForest {
    nodes: Vec<Node>,
    index: HashMap<LayoutId, usize>,
    issues: Vec<ForestIssue>,
}

impl LayoutForest {
    pub fn build(layouts: &LayoutMap) -> Self {
        let mut forest = Self::default();

        for (id, layout) in layouts {
            let idx = forest.slot(id);
            forest.nodes[idx].present = true;
            if let Some(parent_id) = layout.parent.as_ref() {
                let parent = forest.slot(parent_id);
                forest.nodes[idx].parent = Some(parent);
            }
        }

        forest.detach_missing_parents();
        forest.break_cycles();

        for idx in 0..forest.nodes.len() {
            if let Some(parent) = forest.nodes[idx].parent {
                forest.nodes[parent].children.push(idx);
            }
        }

        forest
    }

    fn slot(&mut self, id: &LayoutId) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node::placeholder(id.clone()));
        self.index.insert(id.clone(), idx);
        idx
    }

    fn detach_missing_parents(&mut self) {
        for idx in 0..self.nodes.len() {
            let Some(parent) = self.nodes[idx].parent else {
                continue;
            };
            if !self.nodes[parent].present {
                self.nodes[idx].parent = None;
                self.issues.push(ForestIssue::MissingParent {
                    layout: self.nodes[idx].id.clone(),
                    parent: self.nodes[parent].id.clone(),
                });
            }
        }
    }

    fn break_cycles(&mut self) {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;

        let mut state = vec![UNSEEN; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if state[start] != UNSEEN {
                continue;
            }
            let mut path = Vec::new();
            let mut cursor = Some(start);
            while let Some(idx) = cursor {
                match state[idx] {
                    UNSEEN => {
                        state[idx] = ON_PATH;
                        path.push(idx);
                        cursor = self.nodes[idx].parent;
                    }
                    ON_PATH => {
                        self.nodes[idx].parent = None;
                        self.issues.push(ForestIssue::ParentCycle {
                            layout: self.nodes[idx].id.clone(),
                        });
                        cursor = None;
                    }
                    _ => cursor = None,
                }
            }
            for idx in path {
                state[idx] = DONE;
            }
        }
    }

    /// Look up a layout node; placeholders for missing layouts are not found.
    pub fn find(&self, id: &str) -> Option<NodeRef<'_>> {
        let &idx = self.index.get(id)?;
        self.nodes[idx].present.then_some(NodeRef { forest: self, idx })
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.present && node.parent.is_none())
            .map(move |(idx, _)| NodeRef { forest: self, idx })
    }

    /// Immediate parent first, root last. Walks the forest `node` belongs to.
    pub fn ancestors<'a>(&self, node: NodeRef<'a>) -> Ancestors<'a> {
        let forest = node.forest;
        Ancestors {
            forest,
            current: forest.nodes[node.idx].parent,
            budget: forest.nodes.len(),
        }
    }

    /// Pre-order walk of `node` and its descendants; `node` has depth 0.
    pub fn subtree<'a>(&self, node: NodeRef<'a>) -> Subtree<'a> {
        Subtree {
            forest: node.forest,
            stack: vec![(node.idx, 0)],
        }
    }

    pub fn issues(&self) -> &[ForestIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.present).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed handle to a present node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    forest: &'a LayoutForest,
    idx: usize,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> &'a LayoutId {
        &self.forest.nodes[self.idx].id
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.forest.nodes[self.idx].parent.map(|idx| NodeRef {
            forest: self.forest,
            idx,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let forest = self.forest;
        forest.nodes[self.idx]
            .children
            .iter()
            .map(move |&idx| NodeRef { forest, idx })
    }

    pub fn is_root(&self) -> bool {
        self.forest.nodes[self.idx].parent.is_none()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.forest, other.forest) && self.idx == other.idx
    }
}

impl Eq for NodeRef<'_> {}

pub struct Ancestors<'a> {
    forest: &'a LayoutForest,
    current: Option<usize>,
    // Cycles are broken at build time; this bounds the walk regardless.
    budget: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        if self.budget == 0 {
            self.current = None;
            return None;
        }
        self.budget -= 1;
        self.current = self.forest.nodes[idx].parent;
        Some(NodeRef {
            forest: self.forest,
            idx,
        })
    }
}

pub struct Subtree<'a> {
    forest: &'a LayoutForest,
    stack: Vec<(usize, usize)>,
}

impl<'a> Iterator for Subtree<'a> {
    type Item = (NodeRef<'a>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, depth) = self.stack.pop()?;
        let forest = self.forest;
        self.stack.extend(
            forest.nodes[idx]
                .children
                .iter()
                .rev()
                .map(|&child| (child, depth + 1)),
        );
        Some((NodeRef { forest, idx }, depth))
    }
}
