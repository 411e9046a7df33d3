//! Slot-table storage for tree nodes.
//!
//! Nodes refer to each other by slot index. A freed slot is recycled by a
//! later insertion, and every recycle bumps the slot generation so that an
//! outdated [`NodeId`] never resolves to the node that replaced it. Each
//! arena also carries a tag of its own, so a handle never resolves in a map
//! other than the one that issued it.

use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) type NodePtr = usize;
pub(crate) type Link = Option<NodePtr>;

static NEXT_TAG: AtomicU64 = AtomicU64::new(0);

fn next_tag() -> u64 {
    NEXT_TAG.fetch_add(1, Ordering::Relaxed)
}

/// A stable handle to a node of an [`AvlTreeMap`](crate::AvlTreeMap).
///
/// Handles stay valid until the node they name is physically unlinked.
/// Deleting a node with two children keeps its handle alive (the node takes
/// over its predecessor's entry) and invalidates the predecessor's handle
/// instead. A handle issued by one map is never valid in another one,
/// clones included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    tag: u64,
    index: usize,
    generation: u64,
}

#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Link,
    pub(crate) right: Link,
    pub(crate) parent: Link,
    /// Height of the right subtree minus height of the left subtree.
    pub(crate) balance: i8,
}

#[derive(Clone)]
struct Slot<K, V> {
    generation: u64,
    node: Option<Node<K, V>>,
}

pub(crate) struct Arena<K, V> {
    tag: u64,
    slots: Vec<Slot<K, V>>,
    free: Vec<NodePtr>,
    len: usize,
}

impl<K, V> Arena<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            tag: next_tag(),
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            tag: next_tag(),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Allocates a new leaf below `parent`.
    pub(crate) fn create(&mut self, parent: Link, key: K, value: V) -> NodePtr {
        let node = Node {
            key,
            value,
            left: None,
            right: None,
            parent,
            balance: 0,
        };
        self.len += 1;
        match self.free.pop() {
            Some(node_ptr) => {
                debug_assert!(self.slots[node_ptr].node.is_none());
                self.slots[node_ptr].node = Some(node);
                node_ptr
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    /// Frees the slot of an already unlinked node and hands back its contents.
    pub(crate) fn destroy(&mut self, node_ptr: NodePtr) -> Node<K, V> {
        let slot = &mut self.slots[node_ptr];
        let Some(node) = slot.node.take() else {
            panic!("double free of node slot {node_ptr}");
        };
        slot.generation += 1;
        self.free.push(node_ptr);
        self.len -= 1;
        node
    }

    /// Moves a node out without recycling its slot. Only for consuming iteration.
    pub(crate) fn take(&mut self, node_ptr: NodePtr) -> Option<Node<K, V>> {
        let node = self.slots.get_mut(node_ptr)?.node.take()?;
        self.len -= 1;
        Some(node)
    }

    /// Drops every node. Slots are kept for reuse and all outstanding handles
    /// become invalid.
    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.node.take().is_some() {
                slot.generation += 1;
            }
        }
        self.free.clear();
        self.free.extend((0..self.slots.len()).rev());
        self.len = 0;
    }

    pub(crate) fn id(&self, node_ptr: NodePtr) -> NodeId {
        NodeId {
            tag: self.tag,
            index: node_ptr,
            generation: self.slots[node_ptr].generation,
        }
    }

    pub(crate) fn resolve(&self, id: NodeId) -> Link {
        if id.tag != self.tag {
            return None;
        }
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation && slot.node.is_some())
            .map(|_| id.index)
    }

    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn check_free_list(&self) {
        let occupied = self.slots.iter().filter(|slot| slot.node.is_some()).count();
        assert_eq!(occupied, self.len);
        assert_eq!(occupied + self.free.len(), self.slots.len());
        for &node_ptr in &self.free {
            assert!(self.slots[node_ptr].node.is_none());
        }
    }
}

// Not derived: a clone is a different map and gets a tag of its own
impl<K: Clone, V: Clone> Clone for Arena<K, V> {
    fn clone(&self) -> Self {
        Self {
            tag: next_tag(),
            slots: self.slots.clone(),
            free: self.free.clone(),
            len: self.len,
        }
    }
}

impl<K, V> Index<NodePtr> for Arena<K, V> {
    type Output = Node<K, V>;

    fn index(&self, node_ptr: NodePtr) -> &Self::Output {
        match &self.slots[node_ptr].node {
            Some(node) => node,
            None => panic!("dangling link to node slot {node_ptr}"),
        }
    }
}

impl<K, V> IndexMut<NodePtr> for Arena<K, V> {
    fn index_mut(&mut self, node_ptr: NodePtr) -> &mut Self::Output {
        match &mut self.slots[node_ptr].node {
            Some(node) => node,
            None => panic!("dangling link to node slot {node_ptr}"),
        }
    }
}
