use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequential counter backing [`Key::fresh`].
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a logical node within a document.
///
/// A key is generated once when a node is created and survives every
/// structural edit, which is what makes it safe to re-resolve a node
/// after its path has shifted. Keys are regenerated only when a subtree
/// is duplicated or split, so they stay unique within one document.
///
/// Keys are process-local: they are never serialized, and deserialized
/// documents get fresh keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(String);

impl Key {
    /// Generate the next sequential key.
    pub fn fresh() -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Key(format!("k{}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}
