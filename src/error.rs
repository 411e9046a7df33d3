use std::fmt;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("key is already present in the map")]
    DuplicateKey,
    #[error("cannot delete from an empty map")]
    EmptyTree,
    #[error("node handle does not refer to a live node of this map")]
    InvalidNode,
}

////////////////////////////////////////////////////////////////////////////////

/// A rejected insertion. Carries back the key and value that were not stored.
#[derive(Error)]
#[error("{error}")]
pub struct InsertError<K, V> {
    pub error: Error,
    pub key: K,
    pub value: V,
}

impl<K, V> InsertError<K, V> {
    pub fn new(error: Error, key: K, value: V) -> Self {
        Self { error, key, value }
    }

    pub fn into_inner(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> fmt::Debug for InsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
