use std::fmt;

use super::node::Link;
use super::AvlTreeMap;

const INDENT: usize = 4;

/// A sideways rendering of a map's tree shape.
///
/// Each node is printed as `key: value` on its own line, indented by its
/// depth, with the left subtree above and the right subtree below it.
///
/// ```
/// use avl_arena::AvlTreeMap;
/// let mut map = AvlTreeMap::new();
/// for key in [2, 1, 3] {
///     map.insert(key, key * 10).unwrap();
/// }
/// assert_eq!(map.dump().to_string(), "    1: 10\n2: 20\n    3: 30\n");
/// ```
pub struct Dump<'a, K, V> {
    map: &'a AvlTreeMap<K, V>,
}

impl<'a, K, V> Dump<'a, K, V> {
    pub(super) fn new(map: &'a AvlTreeMap<K, V>) -> Self {
        Self { map }
    }
}

impl<K: fmt::Display, V: fmt::Display> Dump<'_, K, V> {
    fn write_subtree(&self, f: &mut fmt::Formatter<'_>, link: Link, level: usize) -> fmt::Result {
        let Some(node_ptr) = link else {
            return Ok(());
        };
        let node = &self.map.nodes[node_ptr];
        self.write_subtree(f, node.left, level + 1)?;
        writeln!(
            f,
            "{:indent$}{}: {}",
            "",
            node.key,
            node.value,
            indent = level * INDENT
        )?;
        self.write_subtree(f, node.right, level + 1)
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Dump<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_subtree(f, self.map.root, 0)
    }
}
