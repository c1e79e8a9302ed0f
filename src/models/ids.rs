//! Stable group identity derived from member profile ids.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identity of a ranked group, stable across snapshots.
///
/// A group is a solo player or a fixed team. Its key is derived from the
/// set of member profile ids, so the same group maps to the same key on
/// every capture day regardless of the order the document store happens to
/// list its members.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey(String);

impl GroupKey {
    /// Create a GroupKey from an existing key string.
    pub fn new(key: String) -> Self {
        Self(key)
    }

    /// Derive a GroupKey from member profile ids.
    ///
    /// Ids are sorted before hashing so member order never changes the key.
    /// Uses SHA256 and takes the first 16 characters for brevity.
    pub fn from_profile_ids<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<&str> = ids.into_iter().collect();
        sorted.sort_unstable();

        let mut hasher = Sha256::new();
        for (i, id) in sorted.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(id.as_bytes());
        }
        let result = hasher.finalize();
        let hash = hex::encode(result);
        Self(hash[..16].to_string())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupKey({})", self.0)
    }
}

impl From<String> for GroupKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_deterministic() {
        let key1 = GroupKey::from_profile_ids(["8231", "77612"]);
        let key2 = GroupKey::from_profile_ids(["8231", "77612"]);
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_group_key_member_order_irrelevant() {
        let key1 = GroupKey::from_profile_ids(["8231", "77612", "104"]);
        let key2 = GroupKey::from_profile_ids(["104", "77612", "8231"]);
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_group_key_different_members() {
        let key1 = GroupKey::from_profile_ids(["8231"]);
        let key2 = GroupKey::from_profile_ids(["8232"]);
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_group_key_subset_differs() {
        // A solo player and a team containing that player are different groups.
        let solo = GroupKey::from_profile_ids(["8231"]);
        let team = GroupKey::from_profile_ids(["8231", "77612"]);
        assert_ne!(solo, team);
    }

    #[test]
    fn test_group_key_length() {
        let key = GroupKey::from_profile_ids(["8231"]);
        assert_eq!(key.as_str().len(), 16);
    }

    #[test]
    fn test_group_key_hex_format() {
        let key = GroupKey::from_profile_ids(["8231"]);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_group_key_serialization() {
        let key = GroupKey::from_profile_ids(["8231"]);
        let json = serde_json::to_string(&key).unwrap();
        let deserialized: GroupKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, deserialized);
    }

    #[test]
    fn test_group_key_display() {
        let key = GroupKey::new("abc123def456".to_string());
        assert_eq!(format!("{}", key), "abc123def456");
    }

    #[test]
    fn test_group_key_from_str() {
        let key = GroupKey::from("raw-key");
        assert_eq!(key.as_str(), "raw-key");
    }
}
