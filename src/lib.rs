//! An ordered map and set implemented with an AVL tree.
//!
//! Nodes live in an arena and are linked by index, including the parent
//! links used to walk back up after an update. Insertion needs at most one
//! single or double rotation; deletion may rotate at every level up to the
//! root. Entries can be reached by key or through [`NodeId`] handles.
//!
//! ```
//! use avl_arena::{AvlTreeMap, Error};
//!
//! let mut map = AvlTreeMap::new();
//! for key in [10, 20, 30] {
//!     map.insert(key, key.to_string()).unwrap();
//! }
//!
//! // Ascending insertion rotated 20 to the top
//! let root = map.root().unwrap();
//! assert_eq!(map.key(root), Some(&20));
//!
//! let err = map.insert(20, String::from("twenty")).unwrap_err();
//! assert_eq!(err.error, Error::DuplicateKey);
//!
//! let keys: Vec<_> = map.keys().copied().collect();
//! assert_eq!(keys, [10, 20, 30]);
//! ```

#![forbid(unsafe_code)]

mod error;
pub mod map;
pub mod set;

pub use error::{Error, InsertError};
pub use map::{AvlTreeMap, NodeId};
pub use set::AvlTreeSet;
