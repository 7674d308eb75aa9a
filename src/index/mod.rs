//! An in-memory B-tree index of minimum degree 3, used to accelerate
//! primary-key equality lookups (spec §4.2).
//!
//! Nodes are arena-allocated (`Vec<BTreeNode<K>>` indexed by `usize` handles)
//! rather than linked by owning pointers, per the redesign guidance in
//! spec §9 ("avoid owning-pointer cycles"). The whole arena serializes as one
//! opaque blob (spec §4.2 "Serialization").

use serde::{Deserialize, Serialize};

/// Minimum degree. Each non-root node holds between `T - 1` and `2T - 1` keys.
const T: usize = 3;

type NodeId = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BTreeNode<K> {
    keys: Vec<K>,
    payloads: Vec<usize>,
    /// Child node ids; empty for a leaf.
    children: Vec<NodeId>,
    leaf: bool,
}

impl<K> BTreeNode<K> {
    fn new_leaf() -> Self {
        BTreeNode {
            keys: Vec::new(),
            payloads: Vec::new(),
            children: Vec::new(),
            leaf: true,
        }
    }

    fn is_full(&self) -> bool {
        self.keys.len() == 2 * T - 1
    }
}

/// An ordered multi-way tree mapping keys to a single `usize` payload
/// (a row position in the owning table). Duplicate keys are permitted by the
/// structure itself; the database layer enforces primary-key uniqueness
/// before ever inserting (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BTree<K> {
    nodes: Vec<BTreeNode<K>>,
    root: NodeId,
}

impl<K: Ord + Clone> BTree<K> {
    pub fn new() -> Self {
        BTree {
            nodes: vec![BTreeNode::new_leaf()],
            root: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        let root = &self.nodes[self.root];
        root.leaf && root.keys.is_empty()
    }

    /// Inserts one key/payload pair, splitting full nodes on the way down so
    /// that no parent is ever full when a child split is required.
    pub fn insert(&mut self, key: K, payload: usize) {
        if self.nodes[self.root].is_full() {
            let old_root = self.root;
            let mut new_root = BTreeNode::new_leaf();
            new_root.leaf = false;
            new_root.children.push(old_root);
            let new_root_id = self.nodes.len();
            self.nodes.push(new_root);
            self.root = new_root_id;
            self.split_child(new_root_id, 0);
        }
        self.insert_non_full(self.root, key, payload);
    }

    /// Splits the full child at `child_index` of `parent_id` into two nodes,
    /// promoting its median key into `parent_id`.
    fn split_child(&mut self, parent_id: NodeId, child_index: usize) {
        let child_id = self.nodes[parent_id].children[child_index];
        let (median_key, median_payload, mut sibling) = {
            let child = &mut self.nodes[child_id];
            let mid = T - 1;
            let median_key = child.keys[mid].clone();
            let median_payload = child.payloads[mid];

            let sibling_keys = child.keys.split_off(mid + 1);
            let sibling_payloads = child.payloads.split_off(mid + 1);
            child.keys.truncate(mid);
            child.payloads.truncate(mid);

            let sibling_children = if child.leaf {
                Vec::new()
            } else {
                child.children.split_off(T)
            };

            let sibling = BTreeNode {
                keys: sibling_keys,
                payloads: sibling_payloads,
                children: sibling_children,
                leaf: child.leaf,
            };
            (median_key, median_payload, sibling)
        };
        sibling.leaf = self.nodes[child_id].leaf;
        let sibling_id = self.nodes.len();
        self.nodes.push(sibling);

        let parent = &mut self.nodes[parent_id];
        parent.keys.insert(child_index, median_key);
        parent.payloads.insert(child_index, median_payload);
        parent.children.insert(child_index + 1, sibling_id);
    }

    fn insert_non_full(&mut self, node_id: NodeId, key: K, payload: usize) {
        let is_leaf = self.nodes[node_id].leaf;
        if is_leaf {
            let node = &mut self.nodes[node_id];
            let pos = node.keys.partition_point(|k| *k <= key);
            node.keys.insert(pos, key);
            node.payloads.insert(pos, payload);
            return;
        }

        let mut pos = self.nodes[node_id].keys.partition_point(|k| *k <= key);
        let mut child_id = self.nodes[node_id].children[pos];
        if self.nodes[child_id].is_full() {
            self.split_child(node_id, pos);
            if key > self.nodes[node_id].keys[pos] {
                pos += 1;
            }
            child_id = self.nodes[node_id].children[pos];
        }
        self.insert_non_full(child_id, key, payload);
    }

    /// Returns the payload associated with `key`, or `None` if absent.
    pub fn find(&self, key: &K) -> Option<usize> {
        self.find_in(self.root, key)
    }

    fn find_in(&self, node_id: NodeId, key: &K) -> Option<usize> {
        let node = &self.nodes[node_id];
        let pos = node.keys.partition_point(|k| k < key);
        if pos < node.keys.len() && &node.keys[pos] == key {
            return Some(node.payloads[pos]);
        }
        if node.leaf {
            return None;
        }
        self.find_in(node.children[pos], key)
    }

    /// Returns all (key, payload) pairs in ascending key order — used by the
    /// sort-merge join (spec §4.3 `smj_join`) to read a table in primary-key
    /// order without re-sorting it.
    pub fn iter_sorted(&self) -> Vec<(K, usize)> {
        let mut out = Vec::new();
        self.collect_in_order(self.root, &mut out);
        out
    }

    fn collect_in_order(&self, node_id: NodeId, out: &mut Vec<(K, usize)>) {
        let node = &self.nodes[node_id];
        for i in 0..node.keys.len() {
            if !node.leaf {
                self.collect_in_order(node.children[i], out);
            }
            out.push((node.keys[i].clone(), node.payloads[i]));
        }
        if !node.leaf {
            self.collect_in_order(*node.children.last().unwrap(), out);
        }
    }
}

impl<K: Ord + Clone> Default for BTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Default for BTreeNode<K> {
    fn default() -> Self {
        BTreeNode {
            keys: Vec::new(),
            payloads: Vec::new(),
            children: Vec::new(),
            leaf: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find() {
        let mut bt = BTree::new();
        for i in 0..50 {
            bt.insert(i, i as usize * 10);
        }
        for i in 0..50 {
            assert_eq!(bt.find(&i), Some(i as usize * 10));
        }
        assert_eq!(bt.find(&999), None);
    }

    #[test]
    fn find_on_empty_tree() {
        let bt: BTree<i64> = BTree::new();
        assert_eq!(bt.find(&1), None);
        assert!(bt.is_empty());
    }

    #[test]
    fn splits_maintain_sorted_order() {
        let mut bt = BTree::new();
        let mut keys: Vec<i64> = (0..200).rev().collect();
        for (payload, &k) in keys.iter().enumerate() {
            bt.insert(k, payload);
        }
        keys.sort();
        let collected: Vec<i64> = bt.iter_sorted().into_iter().map(|(k, _)| k).collect();
        assert_eq!(collected, keys);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut bt = BTree::new();
        for i in 0..40 {
            bt.insert(format!("key{i:03}"), i as usize);
        }
        let blob = bincode::serialize(&bt).unwrap();
        let restored: BTree<String> = bincode::deserialize(&blob).unwrap();
        for i in 0..40 {
            assert_eq!(restored.find(&format!("key{i:03}")), Some(i as usize));
        }
    }
}
