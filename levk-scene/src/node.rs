// Copyright (c) 2024-present the levk contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! The node hierarchy: a parent/child graph of local transforms, addressed by
//! stable [`Id<Node>`] rather than the generational `Handle<Node>` this family of
//! engines usually reaches for. Ids here are never reused, so a `NodeTree` is a
//! plain `HashMap<Id<Node>, Node>` plus an explicit root list and a monotonic
//! counter, not a freelist-backed pool.

use crate::transform::Transform;
use fxhash::FxHashMap;
use levk_core::{log::LevkLog, math::Matrix4, Id};

/// Placeholder type purely used to parametrize [`Id<Node>`]; never constructed.
pub struct NodeMarker;
/// Placeholder type purely used to parametrize [`Id<Entity>`] handles stored on
/// a node; the entity store itself lives in `crate::entity`.
pub struct EntityMarker;

pub type NodeId = Id<NodeMarker>;
pub type EntityId = Id<EntityMarker>;

/// A single transform in the scene hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    parent: NodeId,
    children: Vec<NodeId>,
    /// The entity bound to this node, `EntityId::NONE` if the node carries no
    /// entity (e.g. a purely structural joint created by a skeleton instance).
    pub entity_id: EntityId,
    pub transform: Transform,
    pub name: String,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Fields needed to create a [`Node`]; `parent` of `NodeId::NONE` creates a root.
#[derive(Debug, Clone, Default)]
pub struct NodeCreateInfo {
    pub name: String,
    pub parent: NodeId,
    pub transform: Transform,
    pub entity_id: EntityId,
}

/// The node hierarchy. Global transform of a node is the product, root-to-node,
/// of every ancestor's local matrix.
#[derive(Default)]
pub struct NodeTree {
    nodes: FxHashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    next_id: levk_core::id::IdSource<NodeMarker>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Creates a node. If `info.parent` does not resolve to a live node, the new
    /// node is created as a root and a warning is logged.
    pub fn add(&mut self, info: NodeCreateInfo) -> NodeId {
        let id = self.next_id.next();
        let parent = if info.parent.is_none() {
            NodeId::NONE
        } else if self.nodes.contains_key(&info.parent) {
            info.parent
        } else {
            LevkLog::warn(format!(
                "node tree: add() given unknown parent {}, creating '{}' as a root instead",
                info.parent, info.name
            ));
            NodeId::NONE
        };

        let node = Node {
            id,
            parent,
            children: Vec::new(),
            entity_id: info.entity_id,
            transform: info.transform,
            name: info.name,
        };
        self.nodes.insert(id, node);

        if parent.is_none() {
            self.roots.push(id);
        } else if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// Detaches `id` from its parent (or the root list), then recursively
    /// destroys every descendant, then erases `id` itself. A no-op for unknown
    /// ids.
    pub fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let parent = node.parent();
        let children: Vec<NodeId> = node.children().to_vec();

        if parent.is_none() {
            self.roots.retain(|root| *root != id);
        } else if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|child| *child != id);
        }

        for child in children {
            self.remove_subtree(child);
        }
        self.nodes.remove(&id);
    }

    /// Removes a node and its descendants without touching the (already-removed)
    /// parent's child list.
    fn remove_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let children: Vec<NodeId> = node.children().to_vec();
        for child in children {
            self.remove_subtree(child);
        }
        self.nodes.remove(&id);
    }

    /// Re-parents `node` under `new_parent`. A no-op (with a warning) if either
    /// id is unknown, or if `new_parent == node` (a node may never become its
    /// own ancestor).
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) {
        if node == new_parent {
            LevkLog::warn(format!(
                "node tree: refusing to reparent node {node} onto itself"
            ));
            return;
        }
        if !self.nodes.contains_key(&node) {
            LevkLog::warn(format!("node tree: reparent() given unknown node {node}"));
            return;
        }
        if new_parent.is_some() && !self.nodes.contains_key(&new_parent) {
            LevkLog::warn(format!(
                "node tree: reparent() given unknown new parent {new_parent}"
            ));
            return;
        }
        if self.is_ancestor(node, new_parent) {
            LevkLog::warn(format!(
                "node tree: refusing to reparent {node} under its own descendant {new_parent}"
            ));
            return;
        }

        let old_parent = self.nodes[&node].parent();
        if old_parent.is_none() {
            self.roots.retain(|root| *root != node);
        } else if let Some(old_parent_node) = self.nodes.get_mut(&old_parent) {
            old_parent_node.children.retain(|child| *child != node);
        }

        if new_parent.is_none() {
            self.roots.push(node);
        } else if let Some(new_parent_node) = self.nodes.get_mut(&new_parent) {
            new_parent_node.children.push(node);
        }

        self.nodes.get_mut(&node).unwrap().parent = new_parent;
    }

    fn is_ancestor(&self, candidate_ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while current.is_some() {
            if current == candidate_ancestor {
                return true;
            }
            current = match self.nodes.get(&current) {
                Some(node) => node.parent(),
                None => return false,
            };
        }
        false
    }

    /// Global transform: the product, root-to-node, of every local matrix along
    /// the ancestor chain. `O(depth)`.
    pub fn global_transform(&self, id: NodeId) -> Matrix4<f32> {
        match self.nodes.get(&id) {
            Some(node) => {
                let local = node.transform.matrix();
                if node.parent().is_some() {
                    self.global_transform(node.parent()) * local
                } else {
                    local
                }
            }
            None => Matrix4::identity(),
        }
    }

    /// Global position extracted from [`NodeTree::global_transform`].
    pub fn global_position(&self, id: NodeId) -> levk_core::math::Vector3<f32> {
        let m = self.global_transform(id);
        levk_core::math::Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
    }

    /// First node found by a linear scan whose name equals `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|node| node.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn info(name: &str, parent: NodeId) -> NodeCreateInfo {
        NodeCreateInfo {
            name: name.to_string(),
            parent,
            ..Default::default()
        }
    }

    #[test]
    fn invariant_child_list_agrees_with_parent_field() {
        let mut tree = NodeTree::new();
        let root = tree.add(info("root", NodeId::NONE));
        let child = tree.add(info("child", root));
        assert!(tree.get(root).unwrap().children().contains(&child));
        assert_eq!(tree.get(child).unwrap().parent(), root);
    }

    #[test]
    fn reparenting_preserves_roots_s1() {
        let mut tree = NodeTree::new();
        let a = tree.add(info("A", NodeId::NONE));
        let b = tree.add(info("B", a));
        let c = tree.add(info("C", NodeId::NONE));

        tree.reparent(c, a);

        assert_eq!(tree.roots(), &[a]);
        let mut children = tree.get(a).unwrap().children().to_vec();
        children.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(children, expected);
        assert_eq!(tree.get(c).unwrap().parent(), a);
    }

    #[test]
    fn reparent_onto_self_is_rejected() {
        let mut tree = NodeTree::new();
        let a = tree.add(info("A", NodeId::NONE));
        tree.reparent(a, a);
        assert_eq!(tree.get(a).unwrap().parent(), NodeId::NONE);
    }

    #[test]
    fn reparent_onto_own_descendant_is_rejected() {
        let mut tree = NodeTree::new();
        let a = tree.add(info("A", NodeId::NONE));
        let b = tree.add(info("B", a));
        tree.reparent(a, b);
        assert_eq!(tree.get(a).unwrap().parent(), NodeId::NONE);
        assert!(tree.get(b).unwrap().children().is_empty() || tree.get(a).unwrap().children().contains(&b));
    }

    #[test]
    fn remove_destroys_descendants_recursively() {
        let mut tree = NodeTree::new();
        let root = tree.add(info("root", NodeId::NONE));
        let child = tree.add(info("child", root));
        let grandchild = tree.add(info("grandchild", child));

        tree.remove(child);

        assert!(tree.get(child).is_none());
        assert!(tree.get(grandchild).is_none());
        assert!(tree.get(root).unwrap().children().is_empty());
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let mut tree = NodeTree::new();
        let root = tree.add(info("root", NodeId::NONE));
        tree.remove(NodeId::from_raw(9999));
        assert!(tree.get(root).is_some());
    }

    #[test]
    fn add_with_unknown_parent_falls_back_to_root() {
        let mut tree = NodeTree::new();
        let bogus = NodeId::from_raw(777);
        let id = tree.add(info("orphan", bogus));
        assert_eq!(tree.get(id).unwrap().parent(), NodeId::NONE);
        assert!(tree.roots().contains(&id));
    }

    #[test]
    fn global_transform_chains_through_ancestors() {
        let mut tree = NodeTree::new();
        let root = tree.add(info("root", NodeId::NONE));
        tree.get_mut(root)
            .unwrap()
            .transform
            .set_position(levk_core::math::Vector3::new(1.0, 0.0, 0.0));
        let child = tree.add(info("child", root));
        tree.get_mut(child)
            .unwrap()
            .transform
            .set_position(levk_core::math::Vector3::new(0.0, 2.0, 0.0));

        let global = tree.global_position(child);
        assert_eq!(global, levk_core::math::Vector3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn node_count_matches_roots_plus_children_invariant() {
        let mut tree = NodeTree::new();
        let a = tree.add(info("A", NodeId::NONE));
        let _b = tree.add(info("B", a));
        let _c = tree.add(info("C", NodeId::NONE));
        let total_children: usize = tree.iter().map(|n| n.children().len()).sum();
        assert_eq!(tree.roots().len() + total_children, tree.len());
    }
}
