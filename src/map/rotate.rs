//! Rotation primitives and the balance-factor dispatch shared by insertion
//! and deletion.
//!
//! Every rotation takes `x`, the child being pulled up, and `u`, the
//! unbalanced node it is pulled over, and returns the new top of the
//! subtree formerly rooted at `u`.

use tracing::trace;

use super::node::{Link, NodePtr};
use super::AvlTreeMap;

/// Which kind of update the tree is being rebalanced after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Retrace {
    Insertion,
    Deletion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rotation {
    Left,
    Right,
    RightLeft,
    LeftRight,
}

impl Rotation {
    /// Picks the rotation for a child balance `x_bf` below an ancestor
    /// balance `u_bf`. A level child only occurs after a deletion.
    pub(crate) fn classify(x_bf: i8, u_bf: i8, retrace: Retrace) -> Option<Self> {
        match (x_bf, u_bf, retrace) {
            (-1, -2, _) => Some(Rotation::Right),
            (1, 2, _) => Some(Rotation::Left),
            (-1, 2, _) => Some(Rotation::RightLeft),
            (1, -2, _) => Some(Rotation::LeftRight),
            (0, -2, Retrace::Deletion) => Some(Rotation::Right),
            (0, 2, Retrace::Deletion) => Some(Rotation::Left),
            _ => None,
        }
    }
}

impl<K, V> AvlTreeMap<K, V> {
    /// Restores balance at `u` whose balance factor is ±2 with `x` on its
    /// heavy side.
    pub(crate) fn rebalance(&mut self, x: NodePtr, u: NodePtr, retrace: Retrace) -> NodePtr {
        let x_bf = self.nodes[x].balance;
        let u_bf = self.nodes[u].balance;
        match Rotation::classify(x_bf, u_bf, retrace) {
            Some(Rotation::Left) => self.rotate_left(x, u),
            Some(Rotation::Right) => self.rotate_right(x, u),
            Some(Rotation::RightLeft) => self.rotate_right_left(x, u),
            Some(Rotation::LeftRight) => self.rotate_left_right(x, u),
            None => unreachable!(
                "balance factors ({x_bf}, {u_bf}) after {retrace:?} match no rotation"
            ),
        }
    }

    /// Splices `new` into the slot `old` occupied below `parent`, or makes it
    /// the root when `parent` is absent. This is the only place the root moves.
    pub(crate) fn replace_child(&mut self, parent: Link, old: NodePtr, new: Link) {
        if let Some(new_ptr) = new {
            self.nodes[new_ptr].parent = parent;
        }
        match parent {
            None => self.root = new,
            Some(parent_ptr) => {
                let parent_node = &mut self.nodes[parent_ptr];
                if parent_node.left == Some(old) {
                    parent_node.left = new;
                } else {
                    debug_assert_eq!(parent_node.right, Some(old));
                    parent_node.right = new;
                }
            }
        }
    }

    fn relink_left(&mut self, x: NodePtr, u: NodePtr) {
        debug_assert_eq!(self.nodes[u].right, Some(x));
        let parent = self.nodes[u].parent;
        let z = self.nodes[x].left;
        self.nodes[u].right = z;
        if let Some(z) = z {
            self.nodes[z].parent = Some(u);
        }
        self.nodes[x].left = Some(u);
        self.nodes[u].parent = Some(x);
        self.replace_child(parent, u, Some(x));
    }

    fn relink_right(&mut self, x: NodePtr, u: NodePtr) {
        debug_assert_eq!(self.nodes[u].left, Some(x));
        let parent = self.nodes[u].parent;
        let z = self.nodes[x].right;
        self.nodes[u].left = z;
        if let Some(z) = z {
            self.nodes[z].parent = Some(u);
        }
        self.nodes[x].right = Some(u);
        self.nodes[u].parent = Some(x);
        self.replace_child(parent, u, Some(x));
    }

    //   u             x
    //  / \           / \
    // a   x    ->   u   c
    //    / \       / \
    //   z   c     a   z
    pub(crate) fn rotate_left(&mut self, x: NodePtr, u: NodePtr) -> NodePtr {
        trace!(x, u, "rotate left");
        self.relink_left(x, u);
        if self.nodes[x].balance == 0 {
            // Only reachable from deletion; the subtree keeps its height.
            self.nodes[u].balance = 1;
            self.nodes[x].balance = -1;
        } else {
            self.nodes[u].balance = 0;
            self.nodes[x].balance = 0;
        }
        x
    }

    //     u         x
    //    / \       / \
    //   x   c ->  a   u
    //  / \           / \
    // a   z         z   c
    pub(crate) fn rotate_right(&mut self, x: NodePtr, u: NodePtr) -> NodePtr {
        trace!(x, u, "rotate right");
        self.relink_right(x, u);
        if self.nodes[x].balance == 0 {
            self.nodes[u].balance = -1;
            self.nodes[x].balance = 1;
        } else {
            self.nodes[u].balance = 0;
            self.nodes[x].balance = 0;
        }
        x
    }

    /// Double rotation for a right-heavy `u` whose right child `x` leans left.
    pub(crate) fn rotate_right_left(&mut self, x: NodePtr, u: NodePtr) -> NodePtr {
        let Some(y) = self.nodes[x].left else {
            unreachable!("left-leaning node {x} has no left child");
        };
        trace!(x, y, u, "rotate right-left");
        self.relink_right(y, x);
        self.relink_left(y, u);
        let (u_bf, x_bf) = match self.nodes[y].balance {
            1 => (-1, 0),
            0 => (0, 0),
            -1 => (0, 1),
            bf => unreachable!("node {y} inside a double rotation has balance {bf}"),
        };
        self.nodes[u].balance = u_bf;
        self.nodes[x].balance = x_bf;
        self.nodes[y].balance = 0;
        y
    }

    /// Double rotation for a left-heavy `u` whose left child `x` leans right.
    pub(crate) fn rotate_left_right(&mut self, x: NodePtr, u: NodePtr) -> NodePtr {
        let Some(y) = self.nodes[x].right else {
            unreachable!("right-leaning node {x} has no right child");
        };
        trace!(x, y, u, "rotate left-right");
        self.relink_left(y, x);
        self.relink_right(y, u);
        let (x_bf, u_bf) = match self.nodes[y].balance {
            1 => (-1, 0),
            0 => (0, 0),
            -1 => (0, 1),
            bf => unreachable!("node {y} inside a double rotation has balance {bf}"),
        };
        self.nodes[u].balance = u_bf;
        self.nodes[x].balance = x_bf;
        self.nodes[y].balance = 0;
        y
    }
}

#[cfg(test)]
mod tests {
    use super::{Retrace, Rotation};

    #[test]
    fn classify_insertion_cases() {
        assert_eq!(Rotation::classify(-1, -2, Retrace::Insertion), Some(Rotation::Right));
        assert_eq!(Rotation::classify(1, 2, Retrace::Insertion), Some(Rotation::Left));
        assert_eq!(Rotation::classify(-1, 2, Retrace::Insertion), Some(Rotation::RightLeft));
        assert_eq!(Rotation::classify(1, -2, Retrace::Insertion), Some(Rotation::LeftRight));
        assert_eq!(Rotation::classify(0, 2, Retrace::Insertion), None);
        assert_eq!(Rotation::classify(1, 1, Retrace::Insertion), None);
    }

    #[test]
    fn classify_deletion_ties() {
        assert_eq!(Rotation::classify(0, 2, Retrace::Deletion), Some(Rotation::Left));
        assert_eq!(Rotation::classify(0, -2, Retrace::Deletion), Some(Rotation::Right));
        assert_eq!(Rotation::classify(1, -2, Retrace::Deletion), Some(Rotation::LeftRight));
        assert_eq!(Rotation::classify(0, 0, Retrace::Deletion), None);
    }
}
