//! An ordered map implemented with an AVL tree.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::collections::VecDeque;
use std::fmt;
use std::mem;

use tracing::{debug, trace};

use crate::error::{Error, InsertError};

mod dump;
mod iter;
mod node;
mod rotate;

pub use dump::Dump;
pub use iter::{IntoIter, Iter, Keys, Values};
pub use node::NodeId;

use node::{Arena, Link, NodePtr};
use rotate::Retrace;

/// An ordered map implemented with an AVL tree.
///
/// Nodes are kept in an arena and linked by index, parent links included.
/// Every entry is reachable through a [`NodeId`] handle returned by
/// [`insert`](AvlTreeMap::insert) and [`search`](AvlTreeMap::search).
///
/// ```
/// use avl_arena::AvlTreeMap;
/// let mut map = AvlTreeMap::new();
/// map.insert(0, "zero").unwrap();
/// map.insert(1, "one").unwrap();
/// map.insert(2, "two").unwrap();
/// assert!(map.insert(1, "uno").is_err());
///
/// let one = map.search(&1).unwrap();
/// assert_eq!(map.value(one), Some(&"one"));
/// assert_eq!(map.delete(one), Ok((1, "one")));
/// assert!(map.search(&1).is_none());
/// ```
#[derive(Clone)]
pub struct AvlTreeMap<K, V> {
    nodes: Arena<K, V>,
    root: Link,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn delta(self) -> i8 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}

enum Position {
    Root,
    Child(NodePtr, Side),
}

impl<K, V> AvlTreeMap<K, V> {
    /// Creates an empty map.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
        }
    }

    /// Creates an empty map with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            root: None,
        }
    }

    /// Returns the number of nodes the map can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Clears the map. Every handle obtained so far becomes invalid.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Returns the number of levels of the tree, zero if empty.
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    /// Returns the number of levels of the subtree rooted at `id`.
    /// An invalid handle is treated like an absent subtree.
    pub fn subtree_height(&self, id: NodeId) -> usize {
        self.height_of(self.nodes.resolve(id))
    }

    /// Returns the number of nodes in the subtree rooted at `id`.
    /// An invalid handle is treated like an absent subtree.
    pub fn count(&self, id: NodeId) -> usize {
        self.count_of(self.nodes.resolve(id))
    }

    /// Returns true if `id` refers to a live node of this map.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.resolve(id).is_some()
    }

    /// Returns the key held by node `id`, or `None` if the handle is invalid.
    pub fn key(&self, id: NodeId) -> Option<&K> {
        self.nodes.resolve(id).map(|node_ptr| &self.nodes[node_ptr].key)
    }

    /// Returns the value held by node `id`, or `None` if the handle is invalid.
    pub fn value(&self, id: NodeId) -> Option<&V> {
        self.nodes.resolve(id).map(|node_ptr| &self.nodes[node_ptr].value)
    }

    /// Returns a mutable reference to the value held by node `id`,
    /// or `None` if the handle is invalid.
    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut V> {
        let node_ptr = self.nodes.resolve(id)?;
        Some(&mut self.nodes[node_ptr].value)
    }

    /// Returns the entry held by node `id`, or `None` if the handle is invalid.
    pub fn key_value(&self, id: NodeId) -> Option<(&K, &V)> {
        self.nodes.resolve(id).map(|node_ptr| {
            let node = &self.nodes[node_ptr];
            (&node.key, &node.value)
        })
    }

    /// Returns the cached balance factor (right height minus left height).
    pub fn balance_factor(&self, id: NodeId) -> Option<i8> {
        self.nodes.resolve(id).map(|node_ptr| self.nodes[node_ptr].balance)
    }

    /// Returns the root node, or `None` if the map is empty.
    pub fn root(&self) -> Option<NodeId> {
        self.root.map(|node_ptr| self.nodes.id(node_ptr))
    }

    /// Returns the parent of node `id`.
    /// `None` for the root and for an invalid handle.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let node_ptr = self.nodes.resolve(id)?;
        self.nodes[node_ptr].parent.map(|p| self.nodes.id(p))
    }

    /// Returns the left child of node `id`, `None` if absent or the handle is invalid.
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        let node_ptr = self.nodes.resolve(id)?;
        self.nodes[node_ptr].left.map(|l| self.nodes.id(l))
    }

    /// Returns the right child of node `id`, `None` if absent or the handle is invalid.
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        let node_ptr = self.nodes.resolve(id)?;
        self.nodes[node_ptr].right.map(|r| self.nodes.id(r))
    }

    /// Returns the node with the smallest key.
    pub fn minimum(&self) -> Option<NodeId> {
        self.root
            .map(|root_ptr| self.nodes.id(self.subtree_min(root_ptr)))
    }

    /// Returns the node with the largest key.
    pub fn maximum(&self) -> Option<NodeId> {
        self.root
            .map(|root_ptr| self.nodes.id(self.subtree_max(root_ptr)))
    }

    /// Returns the node with the next smaller key.
    pub fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        let node_ptr = self.nodes.resolve(id)?;
        self.prev_ptr(node_ptr).map(|p| self.nodes.id(p))
    }

    /// Returns the node with the next larger key.
    pub fn successor(&self, id: NodeId) -> Option<NodeId> {
        let node_ptr = self.nodes.resolve(id)?;
        self.next_ptr(node_ptr).map(|n| self.nodes.id(n))
    }

    /// Returns the entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.minimum().and_then(|id| self.key_value(id))
    }

    /// Returns the entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.maximum().and_then(|id| self.key_value(id))
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Calls `f` for every entry, level by level from the root down.
    pub fn traverse_level_order<F: FnMut(&K, &V)>(&self, mut f: F) {
        let mut queue: VecDeque<NodePtr> = self.root.into_iter().collect();
        while let Some(node_ptr) = queue.pop_front() {
            let node = &self.nodes[node_ptr];
            f(&node.key, &node.value);
            queue.extend(node.left);
            queue.extend(node.right);
        }
    }

    /// Returns a sideways text rendering of the tree, for debugging.
    pub fn dump(&self) -> Dump<'_, K, V> {
        Dump::new(self)
    }

    /// Removes the node `id` and returns the entry it held.
    ///
    /// A node with two children is not unlinked itself: it takes over the
    /// entry of its in-order predecessor, which is unlinked instead. `id`
    /// stays valid in that case and the predecessor's handle does not.
    pub fn delete(&mut self, id: NodeId) -> Result<(K, V), Error> {
        if self.root.is_none() {
            debug!(?id, "delete from empty map");
            return Err(Error::EmptyTree);
        }
        let Some(node_ptr) = self.nodes.resolve(id) else {
            debug!(?id, "delete of invalid node");
            return Err(Error::InvalidNode);
        };

        let removed_ptr = match (self.nodes[node_ptr].left, self.nodes[node_ptr].right) {
            (Some(left_ptr), Some(_)) => self.subtree_max(left_ptr),
            _ => node_ptr,
        };

        // Shift the sole child (or nothing) into the removed node's slot
        let parent = self.nodes[removed_ptr].parent;
        let child = self.nodes[removed_ptr].left.or(self.nodes[removed_ptr].right);
        let side = parent.map(|parent_ptr| self.side_of(parent_ptr, removed_ptr));
        self.replace_child(parent, removed_ptr, child);
        let removed = self.nodes.destroy(removed_ptr);

        let entry = if removed_ptr == node_ptr {
            (removed.key, removed.value)
        } else {
            let node = &mut self.nodes[node_ptr];
            (
                mem::replace(&mut node.key, removed.key),
                mem::replace(&mut node.value, removed.value),
            )
        };

        if let (Some(parent_ptr), Some(side)) = (parent, side) {
            self.retrace_deletion(parent_ptr, side);
        }
        Ok(entry)
    }

    /// Asserts that the internal tree structure is consistent.
    ///
    /// Balance factors are checked against heights recomputed from scratch.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self)
    where
        K: Ord,
    {
        if let Some(root_ptr) = self.root {
            assert!(self.nodes[root_ptr].parent.is_none());
        }
        let (_, num_nodes) = self.check_subtree(self.root);
        assert_eq!(num_nodes, self.len());
        self.nodes.check_free_list();

        // In-order keys must be strictly increasing
        let mut keys = self.keys();
        if let Some(mut prev) = keys.next() {
            for key in keys {
                assert!(prev < key);
                prev = key;
            }
        }
    }

    // Returns (height, count) of the subtree.
    #[cfg(any(test, feature = "consistency_check"))]
    fn check_subtree(&self, link: Link) -> (usize, usize)
    where
        K: Ord,
    {
        let Some(node_ptr) = link else {
            return (0, 0);
        };
        let node = &self.nodes[node_ptr];
        if let Some(left_ptr) = node.left {
            assert_eq!(self.nodes[left_ptr].parent, Some(node_ptr));
            assert!(self.nodes[left_ptr].key < node.key);
        }
        if let Some(right_ptr) = node.right {
            assert_eq!(self.nodes[right_ptr].parent, Some(node_ptr));
            assert!(self.nodes[right_ptr].key > node.key);
        }
        let (left_height, left_count) = self.check_subtree(node.left);
        let (right_height, right_count) = self.check_subtree(node.right);

        // Check cached balance against recomputed heights
        let balance = right_height as isize - left_height as isize;
        assert_eq!(node.balance as isize, balance);

        // Check AVL condition (nearly balance)
        assert!((-1..=1).contains(&balance));

        (
            1 + cmp::max(left_height, right_height),
            1 + left_count + right_count,
        )
    }

    fn height_of(&self, link: Link) -> usize {
        match link {
            None => 0,
            Some(node_ptr) => {
                let node = &self.nodes[node_ptr];
                1 + cmp::max(self.height_of(node.left), self.height_of(node.right))
            }
        }
    }

    fn count_of(&self, link: Link) -> usize {
        match link {
            None => 0,
            Some(node_ptr) => {
                let node = &self.nodes[node_ptr];
                1 + self.count_of(node.left) + self.count_of(node.right)
            }
        }
    }

    fn subtree_min(&self, mut node_ptr: NodePtr) -> NodePtr {
        while let Some(left_ptr) = self.nodes[node_ptr].left {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    fn subtree_max(&self, mut node_ptr: NodePtr) -> NodePtr {
        while let Some(right_ptr) = self.nodes[node_ptr].right {
            node_ptr = right_ptr;
        }
        node_ptr
    }

    pub(crate) fn first_ptr(&self) -> Link {
        self.root.map(|root_ptr| self.subtree_min(root_ptr))
    }

    pub(crate) fn last_ptr(&self) -> Link {
        self.root.map(|root_ptr| self.subtree_max(root_ptr))
    }

    pub(crate) fn next_ptr(&self, node_ptr: NodePtr) -> Link {
        if let Some(right_ptr) = self.nodes[node_ptr].right {
            return Some(self.subtree_min(right_ptr));
        }
        let mut child = node_ptr;
        let mut current = self.nodes[node_ptr].parent;
        while let Some(parent_ptr) = current {
            if self.nodes[parent_ptr].left == Some(child) {
                return Some(parent_ptr);
            }
            child = parent_ptr;
            current = self.nodes[parent_ptr].parent;
        }
        None
    }

    pub(crate) fn prev_ptr(&self, node_ptr: NodePtr) -> Link {
        if let Some(left_ptr) = self.nodes[node_ptr].left {
            return Some(self.subtree_max(left_ptr));
        }
        let mut child = node_ptr;
        let mut current = self.nodes[node_ptr].parent;
        while let Some(parent_ptr) = current {
            if self.nodes[parent_ptr].right == Some(child) {
                return Some(parent_ptr);
            }
            child = parent_ptr;
            current = self.nodes[parent_ptr].parent;
        }
        None
    }

    pub(crate) fn entry_at(&self, node_ptr: NodePtr) -> (&K, &V) {
        let node = &self.nodes[node_ptr];
        (&node.key, &node.value)
    }

    fn side_of(&self, parent_ptr: NodePtr, child_ptr: NodePtr) -> Side {
        if self.nodes[parent_ptr].left == Some(child_ptr) {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Walks up from a freshly attached leaf, updating balance factors.
    /// At most one rotation is needed; the walk ends there.
    fn retrace_insertion(&mut self, mut child_ptr: NodePtr) {
        while let Some(parent_ptr) = self.nodes[child_ptr].parent {
            let side = self.side_of(parent_ptr, child_ptr);
            let balance = self.nodes[parent_ptr].balance + side.delta();
            self.nodes[parent_ptr].balance = balance;
            match balance {
                0 => {
                    trace!(node = parent_ptr, "insertion retrace absorbed");
                    return;
                }
                -1 | 1 => child_ptr = parent_ptr,
                _ => {
                    debug_assert!(balance.abs() == 2);
                    self.rebalance(child_ptr, parent_ptr, Retrace::Insertion);
                    return;
                }
            }
        }
    }

    /// Walks up from the parent of an unlinked node whose `side` lost one
    /// level, rotating wherever needed while the subtree keeps shrinking.
    fn retrace_deletion(&mut self, mut parent_ptr: NodePtr, mut side: Side) {
        loop {
            let balance = self.nodes[parent_ptr].balance - side.delta();
            self.nodes[parent_ptr].balance = balance;
            let top_ptr = match balance {
                -1 | 1 => {
                    // Height unchanged here, so no ancestor balance changes either
                    trace!(node = parent_ptr, "deletion retrace absorbed");
                    return;
                }
                0 => parent_ptr,
                _ => {
                    debug_assert!(balance.abs() == 2);
                    let heavy = if balance > 0 {
                        self.nodes[parent_ptr].right
                    } else {
                        self.nodes[parent_ptr].left
                    };
                    let Some(x_ptr) = heavy else {
                        unreachable!("node {parent_ptr} leans to an empty side");
                    };
                    let level_child = self.nodes[x_ptr].balance == 0;
                    let top_ptr = self.rebalance(x_ptr, parent_ptr, Retrace::Deletion);
                    if level_child {
                        // Rotating over a level child keeps the subtree height,
                        // so every ancestor's balance factor is already correct
                        trace!(node = top_ptr, "deletion retrace absorbed by rotation");
                        return;
                    }
                    top_ptr
                }
            };
            let Some(grandparent_ptr) = self.nodes[top_ptr].parent else {
                return;
            };
            side = self.side_of(grandparent_ptr, top_ptr);
            parent_ptr = grandparent_ptr;
        }
    }
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Returns the node holding `key`, if any.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn search<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|node_ptr| self.nodes.id(node_ptr))
    }

    /// Returns true if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|node_ptr| &self.nodes[node_ptr].value)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.find(key)?;
        Some(&mut self.nodes[node_ptr].value)
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|node_ptr| self.entry_at(node_ptr))
    }

    /// Inserts a key-value pair into the map and returns the new node.
    ///
    /// An existing key is never overwritten: the insertion is rejected and
    /// the pair is handed back inside the error.
    pub fn insert(&mut self, key: K, value: V) -> Result<NodeId, InsertError<K, V>> {
        let Some(position) = self.find_insert_pos(&key) else {
            debug!("insertion rejected, key already present");
            return Err(InsertError::new(Error::DuplicateKey, key, value));
        };
        let node_ptr = match position {
            Position::Root => {
                let node_ptr = self.nodes.create(None, key, value);
                self.root = Some(node_ptr);
                node_ptr
            }
            Position::Child(parent_ptr, side) => {
                let node_ptr = self.nodes.create(Some(parent_ptr), key, value);
                match side {
                    Side::Left => self.nodes[parent_ptr].left = Some(node_ptr),
                    Side::Right => self.nodes[parent_ptr].right = Some(node_ptr),
                }
                self.retrace_insertion(node_ptr);
                node_ptr
            }
        };
        Ok(self.nodes.id(node_ptr))
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map.
    /// Returns the stored key and value if the key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.search(key)?;
        self.delete(id).ok()
    }

    fn find<Q>(&self, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = &self.nodes[node_ptr];
            current = match key.cmp(node.key.borrow()) {
                Ordering::Equal => break,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        current
    }

    fn find_insert_pos(&self, key: &K) -> Option<Position> {
        let Some(mut node_ptr) = self.root else {
            return Some(Position::Root);
        };
        loop {
            let node = &self.nodes[node_ptr];
            let (side, next) = match key.cmp(&node.key) {
                Ordering::Equal => return None,
                Ordering::Less => (Side::Left, node.left),
                Ordering::Greater => (Side::Right, node.right),
            };
            match next {
                Some(child_ptr) => node_ptr = child_ptr,
                None => return Some(Position::Child(node_ptr, side)),
            }
        }
    }
}

impl<K, V> Default for AvlTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for AvlTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for AvlTreeMap<K, V> {}

impl<'a, K, V> IntoIterator for &'a AvlTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> IntoIterator for AvlTreeMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let mut order = Vec::with_capacity(self.len());
        let mut current = self.first_ptr();
        while let Some(node_ptr) = current {
            order.push(node_ptr);
            current = self.next_ptr(node_ptr);
        }
        IntoIter::new(self.nodes, order)
    }
}
