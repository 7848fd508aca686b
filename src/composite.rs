//! Recursive leaf/container trees (Composite).
//!
//! Nodes live in an index arena owned by [`Tree`]. Containers own an ordered
//! list of child ids; children never point back at their parent. A node is
//! created as either a leaf or a container and stays that way.
//!
//! Cycles are refused at [`Tree::add_child`] by walking downward from the
//! would-be child, so every traversal here terminates.
//!
//! [`Tree::remove`] drops a detached subtree and recycles its slots. Each slot
//! carries a generation, so ids into a removed subtree stop resolving.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::trace;

use crate::error::{Error, Result};
use crate::family::Product;

const INDENT: &str = "  ";

static NEXT_TREE: AtomicU64 = AtomicU64::new(0);

/// Handle to a node inside one particular [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: u64,
    index: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Container,
}

/// One-line description of a leaf payload.
pub trait Describe {
    fn describe(&self) -> String;
}

impl Describe for String {
    fn describe(&self) -> String {
        self.clone()
    }
}

impl Describe for &str {
    fn describe(&self) -> String {
        self.to_string()
    }
}

impl Describe for Box<dyn Product> {
    fn describe(&self) -> String {
        Product::describe(self.as_ref())
    }
}

#[derive(Debug)]
enum Body<P> {
    Leaf(P),
    Container { label: String, children: Vec<NodeId> },
}

#[derive(Debug)]
struct Node<P> {
    body: Body<P>,
    attached: bool,
}

#[derive(Debug)]
struct Slot<P> {
    generation: u32,
    node: Option<Node<P>>,
}

/// Serialisable view of a subtree.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Snapshot<'a, P> {
    Leaf {
        payload: &'a P,
    },
    Container {
        label: &'a str,
        children: Vec<Snapshot<'a, P>>,
    },
}

#[derive(Debug)]
pub struct Tree<P> {
    id: u64,
    slots: Vec<Slot<P>>,
    free: Vec<usize>,
}

impl<P> Default for Tree<P> {
    fn default() -> Self {
        Tree {
            id: NEXT_TREE.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<P> Tree<P> {
    pub fn new() -> Self {
        Tree::default()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn leaf(&mut self, payload: P) -> NodeId {
        self.alloc(Body::Leaf(payload))
    }

    pub fn container(&mut self, label: impl Into<String>) -> NodeId {
        self.alloc(Body::Container {
            label: label.into(),
            children: Vec::new(),
        })
    }

    fn alloc(&mut self, body: Body<P>) -> NodeId {
        let node = Node {
            body,
            attached: false,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };
        NodeId {
            tree: self.id,
            index,
            generation: self.slots[index].generation,
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node<P>> {
        if id.tree != self.id {
            return Err(Error::UnknownNode(id));
        }
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(Error::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<P>> {
        if id.tree != self.id {
            return Err(Error::UnknownNode(id));
        }
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(Error::UnknownNode(id))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Append `child` to `container`'s children.
    ///
    /// Nothing changes when this fails: `container` must be a container,
    /// `child` must not be `container` or one of its ancestors, and `child`
    /// must not already sit under another container.
    pub fn add_child(&mut self, container: NodeId, child: NodeId) -> Result<()> {
        let child_attached = self.node(child)?.attached;
        if let Body::Leaf(_) = self.node(container)?.body {
            return Err(Error::NotAContainer(container));
        }
        if self.pre_order(child)?.any(|(id, _)| id == container) {
            return Err(Error::Cycle { container, child });
        }
        if child_attached {
            return Err(Error::AlreadyAttached(child));
        }

        if let Body::Container { children, .. } = &mut self.node_mut(container)?.body {
            children.push(child);
        }
        self.node_mut(child)?.attached = true;
        trace!(%container, %child, "attached node");
        Ok(())
    }

    /// Detach the first occurrence of `child`. Returns whether anything was removed.
    pub fn remove_child(&mut self, container: NodeId, child: NodeId) -> Result<bool> {
        self.node(child)?;
        let removed = match &mut self.node_mut(container)?.body {
            Body::Leaf(_) => return Err(Error::NotAContainer(container)),
            Body::Container { children, .. } => match children.iter().position(|&c| c == child) {
                Some(pos) => {
                    children.remove(pos);
                    true
                }
                None => false,
            },
        };
        if removed {
            self.node_mut(child)?.attached = false;
            trace!(%container, %child, "detached node");
        }
        Ok(removed)
    }

    /// Drop a detached node together with its subtree and recycle the slots.
    ///
    /// Returns how many nodes were dropped. Their ids resolve to
    /// `UnknownNode` from now on.
    pub fn remove(&mut self, id: NodeId) -> Result<usize> {
        if self.node(id)?.attached {
            return Err(Error::AlreadyAttached(id));
        }
        let doomed: Vec<NodeId> = self.pre_order(id)?.map(|(node, _)| node).collect();
        for node in &doomed {
            let slot = &mut self.slots[node.index];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
        trace!(%id, removed = doomed.len(), "removed subtree");
        Ok(doomed.len())
    }

    pub fn payload_mut(&mut self, id: NodeId) -> Option<&mut P> {
        match &mut self.node_mut(id).ok()?.body {
            Body::Leaf(payload) => Some(payload),
            Body::Container { .. } => None,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(match self.node(id)?.body {
            Body::Leaf(_) => NodeKind::Leaf,
            Body::Container { .. } => NodeKind::Container,
        })
    }

    pub fn payload(&self, id: NodeId) -> Option<&P> {
        match &self.node(id).ok()?.body {
            Body::Leaf(payload) => Some(payload),
            Body::Container { .. } => None,
        }
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.body {
            Body::Leaf(_) => None,
            Body::Container { label, .. } => Some(label),
        }
    }

    /// Children in insertion order; empty for a leaf.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        match &self.node(id)?.body {
            Body::Leaf(_) => Ok(&[]),
            Body::Container { children, .. } => Ok(children.as_slice()),
        }
    }

    /// Live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).map(|s| s.attached).unwrap_or(false)
    }

    /// Depth-first, parent before children, with each node's depth below `id`.
    pub fn pre_order(&self, id: NodeId) -> Result<PreOrder<'_, P>> {
        self.node(id)?;
        Ok(PreOrder {
            tree: self,
            stack: vec![(id, 0)],
        })
    }

    /// Nodes in the subtree, `id` included.
    pub fn count(&self, id: NodeId) -> Result<usize> {
        Ok(self.pre_order(id)?.count())
    }

    /// Number of levels in the subtree; a lone node has height 1.
    pub fn height(&self, id: NodeId) -> Result<usize> {
        Ok(self.pre_order(id)?.map(|(_, depth)| depth + 1).max().unwrap_or(1))
    }

    /// Leaf payloads in pre-order.
    pub fn leaves(&self, id: NodeId) -> Result<impl Iterator<Item = &P> + '_> {
        Ok(self
            .pre_order(id)?
            .filter_map(move |(node, _)| self.payload(node)))
    }

    /// Aggregate over every leaf payload in the subtree.
    pub fn fold<A, F>(&self, id: NodeId, init: A, f: F) -> Result<A>
    where
        F: FnMut(A, &P) -> A,
    {
        Ok(self.leaves(id)?.fold(init, f))
    }

    pub fn snapshot(&self, id: NodeId) -> Result<Snapshot<'_, P>> {
        Ok(match &self.node(id)?.body {
            Body::Leaf(payload) => Snapshot::Leaf { payload },
            Body::Container { label, children } => Snapshot::Container {
                label,
                children: children
                    .iter()
                    .map(|&child| self.snapshot(child))
                    .collect::<Result<Vec<_>>>()?,
            },
        })
    }

    pub fn to_json(&self, id: NodeId) -> Result<serde_json::Value>
    where
        P: Serialize,
    {
        Ok(serde_json::to_value(self.snapshot(id)?)?)
    }
}

impl<P: Describe> Tree<P> {
    /// One line per node: containers show their label, leaves their payload,
    /// each indented one level deeper than its parent.
    ///
    /// Every line ends in `\n`; line breaks inside a label or description
    /// are written as `\\n` / `\\r` so a node never spans two lines.
    pub fn describe(&self, id: NodeId) -> Result<String> {
        let mut out = String::new();
        for (node, depth) in self.pre_order(id)? {
            let text = match &self.node(node)?.body {
                Body::Leaf(payload) => payload.describe(),
                Body::Container { label, .. } => label.clone(),
            };
            push_line(&mut out, depth, &text);
        }
        Ok(out)
    }
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    out.push_str(&INDENT.repeat(depth));
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\n');
}

/// Iterator returned by [`Tree::pre_order`].
pub struct PreOrder<'a, P> {
    tree: &'a Tree<P>,
    stack: Vec<(NodeId, usize)>,
}

impl<P> Iterator for PreOrder<'_, P> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        if let Some(Node {
            body: Body::Container { children, .. },
            ..
        }) = &self.tree.slots[id.index].node
        {
            self.stack
                .extend(children.iter().rev().map(|&child| (child, depth + 1)));
        }
        Some((id, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn org_chart() -> (Tree<String>, NodeId) {
        let mut tree = Tree::new();
        let eve = tree.container("Eve");
        let david = tree.container("David");
        let alice = tree.leaf("Alice".to_string());
        let bob = tree.leaf("Bob".to_string());
        let charlie = tree.leaf("Charlie".to_string());

        tree.add_child(david, alice).unwrap();
        tree.add_child(david, bob).unwrap();
        tree.add_child(eve, david).unwrap();
        tree.add_child(eve, charlie).unwrap();
        (tree, eve)
    }

    #[test]
    fn describe_indents_by_depth() {
        let (tree, eve) = org_chart();
        assert_eq!(
            tree.describe(eve).unwrap(),
            "Eve\n  David\n    Alice\n    Bob\n  Charlie\n"
        );
        assert_eq!(tree.count(eve).unwrap(), 5);
        assert_eq!(tree.height(eve).unwrap(), 3);
    }

    #[test]
    fn leaf_rejects_children() {
        let mut tree = Tree::new();
        let leaf = tree.leaf("x".to_string());
        let other = tree.leaf("y".to_string());
        assert!(matches!(tree.add_child(leaf, other), Err(Error::NotAContainer(id)) if id == leaf));
        assert!(matches!(tree.remove_child(leaf, other), Err(Error::NotAContainer(_))));
    }

    #[test]
    fn self_and_ancestor_insertion_is_a_cycle() {
        let (mut tree, eve) = org_chart();
        let david = tree.children(eve).unwrap()[0];
        let before = tree.describe(eve).unwrap();

        assert!(matches!(tree.add_child(eve, eve), Err(Error::Cycle { .. })));
        assert!(matches!(tree.add_child(david, eve), Err(Error::Cycle { .. })));
        assert_eq!(tree.describe(eve).unwrap(), before);
    }

    #[test]
    fn attached_node_needs_detaching_first() {
        let (mut tree, eve) = org_chart();
        let david = tree.children(eve).unwrap()[0];
        let charlie = tree.children(eve).unwrap()[1];

        assert!(matches!(tree.add_child(david, charlie), Err(Error::AlreadyAttached(_))));
        assert!(tree.remove_child(eve, charlie).unwrap());
        assert!(!tree.is_attached(charlie));
        tree.add_child(david, charlie).unwrap();
        assert_eq!(tree.children(david).unwrap().len(), 3);
    }

    #[test]
    fn remove_missing_child_is_noop() {
        let (mut tree, eve) = org_chart();
        let stray = tree.leaf("Mallory".to_string());
        assert!(!tree.remove_child(eve, stray).unwrap());
        assert_eq!(tree.count(eve).unwrap(), 5);
    }

    #[test]
    fn foreign_ids_are_unknown() {
        let (tree, _) = org_chart();
        let mut other = Tree::<String>::new();
        let foreign = other.container("elsewhere");
        assert!(matches!(tree.count(foreign), Err(Error::UnknownNode(_))));
        assert_eq!(tree.kind(foreign).ok(), None);
    }

    #[test]
    fn leaves_and_fold_visit_payloads_in_order() {
        let (tree, eve) = org_chart();
        let names: Vec<&String> = tree.leaves(eve).unwrap().collect();
        assert_eq!(names, ["Alice", "Bob", "Charlie"]);

        let total = tree.fold(eve, 0, |acc, name| acc + name.len()).unwrap();
        assert_eq!(total, 15);
    }

    #[test]
    fn snapshot_serialises_nested_structure() {
        let (tree, eve) = org_chart();
        let json = tree.to_json(eve).unwrap();
        assert_eq!(json["kind"], "container");
        assert_eq!(json["label"], "Eve");
        assert_eq!(json["children"][0]["children"][1]["payload"], "Bob");
        assert_eq!(json["children"][1]["kind"], "leaf");
    }

    #[test]
    fn each_node_is_exactly_one_line() {
        let mut tree = Tree::new();
        let blank = tree.container("");
        assert_eq!(tree.describe(blank).unwrap().lines().count(), 1);

        let team = tree.container("Team\nB");
        let alice = tree.leaf("Alice\r\nSmith".to_string());
        tree.add_child(team, alice).unwrap();
        let text = tree.describe(team).unwrap();
        assert_eq!(text, "Team\\nB\n  Alice\\r\\nSmith\n");
        assert_eq!(text.lines().count(), tree.count(team).unwrap());
    }

    #[test]
    fn removed_subtree_frees_slots() {
        let (mut tree, eve) = org_chart();
        let david = tree.children(eve).unwrap()[0];
        let alice = tree.children(david).unwrap()[0];

        assert!(matches!(tree.remove(david), Err(Error::AlreadyAttached(_))));
        tree.remove_child(eve, david).unwrap();
        assert_eq!(tree.remove(david).unwrap(), 3);
        assert_eq!(tree.len(), 2);
        assert!(matches!(tree.count(david), Err(Error::UnknownNode(_))));
        assert!(matches!(tree.kind(alice), Err(Error::UnknownNode(_))));

        let frank = tree.leaf("Frank".to_string());
        assert_eq!(tree.slots.len(), 5);
        assert_eq!(tree.len(), 3);
        assert!(matches!(tree.add_child(eve, alice), Err(Error::UnknownNode(_))));
        tree.add_child(eve, frank).unwrap();
        assert_eq!(tree.describe(eve).unwrap(), "Eve\n  Charlie\n  Frank\n");
    }

    fn recount(tree: &Tree<String>, id: NodeId) -> usize {
        1 + tree
            .children(id)
            .unwrap()
            .iter()
            .map(|&child| recount(tree, child))
            .sum::<usize>()
    }

    proptest! {
        #[test]
        fn random_trees_stay_acyclic(
            containers in 1usize..8,
            leaves in 0usize..8,
            ops in prop::collection::vec((0usize..16, 0usize..16), 0..40),
            labels in prop::collection::vec("[a-z\\n\\r ]{0,4}", 16),
        ) {
            let mut tree = Tree::new();
            let mut ids: Vec<NodeId> = (0..containers).map(|i| tree.container(labels[i].clone())).collect();
            ids.extend((0..leaves).map(|i| tree.leaf(labels[8 + i].clone())));

            for (a, b) in ops {
                let _ = tree.add_child(ids[a % ids.len()], ids[b % ids.len()]);
            }

            for &node in &ids {
                let count = tree.count(node).unwrap();
                prop_assert_eq!(count, recount(&tree, node));
                prop_assert_eq!(tree.describe(node).unwrap().lines().count(), count);

                let below: Vec<NodeId> = tree.pre_order(node).unwrap().map(|(id, _)| id).collect();
                for target in below {
                    if tree.kind(target).unwrap() != NodeKind::Container {
                        continue;
                    }
                    let before = tree.describe(node).unwrap();
                    let is_cycle = matches!(tree.add_child(target, node), Err(Error::Cycle { .. }));
                    prop_assert!(is_cycle);
                    prop_assert_eq!(tree.describe(node).unwrap(), before);
                }
            }
        }
    }
}
