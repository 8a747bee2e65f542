use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Id = String;

/// Generate a random identifier.
pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Generate a time-ordered identifier; lexical order follows creation time.
pub fn generate_ordered_id() -> Id {
    Uuid::now_v7().to_string()
}

/// Opaque concurrency token issued by the document store on every write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_ids_sort_by_creation() {
        let first = generate_ordered_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = generate_ordered_id();
        assert!(first < second);
    }

    #[test]
    fn etags_are_unique() {
        assert_ne!(ETag::generate(), ETag::generate());
    }
}
