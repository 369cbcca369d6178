//! In-memory retained scene: the reference [`SceneBackend`].
//!
//! Transitions are recorded but not interpolated; attributes jump straight to their final value.

use crate::scene::{
    ElementKey, ElementKind, ElementSpec, JoinSummary, PointerEventKind, SceneBackend, Transition,
};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub key: ElementKey,
    pub parent: Option<ElementKey>,
    pub attrs: IndexMap<&'static str, String>,
    pub text: Option<String>,
    pub events: Vec<PointerEventKind>,
}

impl SceneNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn handles(&self, kind: PointerEventKind) -> bool {
        self.events.contains(&kind)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetainedScene {
    nodes: IndexMap<ElementKey, SceneNode>,
    last_transition: Option<Transition>,
    patches: usize,
}

impl RetainedScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: &ElementKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub fn node(&self, kind: ElementKind, uid: &str) -> Option<&SceneNode> {
        self.nodes.get(&ElementKey::new(kind, uid))
    }

    pub fn attr(&self, kind: ElementKind, uid: &str, name: &str) -> Option<&str> {
        self.node(kind, uid)?.attr(name)
    }

    /// Every element, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    pub fn nodes_of(&self, kind: ElementKind) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values().filter(move |node| node.key.kind == kind)
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.nodes_of(kind).count()
    }

    /// Top-level elements, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values().filter(|node| node.parent.is_none())
    }

    pub fn children<'a>(
        &'a self,
        key: &'a ElementKey,
    ) -> impl Iterator<Item = &'a SceneNode> + 'a {
        self.nodes
            .values()
            .filter(move |node| node.parent.as_ref() == Some(key))
    }

    pub fn last_transition(&self) -> Option<Transition> {
        self.last_transition
    }

    /// Number of single-element patches applied so far.
    pub fn patch_count(&self) -> usize {
        self.patches
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.last_transition = None;
    }

    fn remove_subtree(&mut self, key: &ElementKey) {
        let mut stack = vec![key.clone()];
        while let Some(current) = stack.pop() {
            stack.extend(
                self.nodes
                    .values()
                    .filter(|node| node.parent.as_ref() == Some(&current))
                    .map(|node| node.key.clone()),
            );
            self.nodes.shift_remove(&current);
        }
    }
}

impl SceneBackend for RetainedScene {
    fn join(
        &mut self,
        kind: ElementKind,
        elements: Vec<ElementSpec>,
        transition: Option<Transition>,
    ) -> JoinSummary {
        let mut summary = JoinSummary::default();
        let mut seen: FxHashSet<ElementKey> = FxHashSet::default();
        for spec in elements {
            debug_assert_eq!(spec.key.kind, kind);
            seen.insert(spec.key.clone());
            let node = SceneNode {
                key: spec.key.clone(),
                parent: spec.parent,
                attrs: spec.attrs,
                text: spec.text,
                events: spec.events,
            };
            match self.nodes.get_mut(&spec.key) {
                Some(existing) => {
                    *existing = node;
                    summary.updated += 1;
                }
                None => {
                    self.nodes.insert(spec.key, node);
                    summary.entered += 1;
                }
            }
        }

        let stale: Vec<ElementKey> = self
            .nodes
            .keys()
            .filter(|key| key.kind == kind && !seen.contains(*key))
            .cloned()
            .collect();
        summary.exited = stale.len();
        for key in &stale {
            self.remove_subtree(key);
        }
        if transition.is_some() {
            self.last_transition = transition;
        }
        summary
    }

    fn patch(
        &mut self,
        key: &ElementKey,
        attrs: &[(&'static str, String)],
        transition: Option<Transition>,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        for (name, value) in attrs {
            node.attrs.insert(*name, value.clone());
        }
        self.patches += 1;
        if transition.is_some() {
            self.last_transition = transition;
        }
        true
    }
}
