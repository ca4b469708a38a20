//! Reference-key derivation for tag-scoped operations.
//!
//! A [`TagSet`] turns an ordered list of tag names into a reference
//! namespace: the hex SHA-1 of the tag index keys joined with `|`. Tagged
//! values are stored under `<reference namespace>:<key>` and the
//! caller-visible key is never written to the store directly; it only
//! exists as a member of the tag indexes.

use sha1::{Digest, Sha1};
use std::fmt;

/// Prefix of every tag index key.
pub const TAG_INDEX_PREFIX: &str = "tags:";

/// Separator between index keys in the digest input.
const NAMESPACE_SEPARATOR: &str = "|";

/// Ordered, immutable set of tag names and the reference namespace derived
/// from them.
///
/// Names keep caller order and duplicates. Reordering the names changes
/// the digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagSet {
    names: Vec<String>,
    index_keys: Vec<String>,
    reference_namespace: String,
}

impl TagSet {
    /// Build a tag set from names in the given order.
    ///
    /// ```
    /// use tagcache_core::TagSet;
    ///
    /// let tags = TagSet::new(["users", "active"]);
    /// assert_eq!(tags.index_keys(), ["tags:users", "tags:active"]);
    /// assert!(tags.reference_key("user:1").ends_with(":user:1"));
    /// ```
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let index_keys: Vec<String> = names.iter().map(|name| index_key(name)).collect();
        let digest = Sha1::digest(index_keys.join(NAMESPACE_SEPARATOR).as_bytes());

        Self {
            names,
            index_keys,
            reference_namespace: hex::encode(digest),
        }
    }

    /// Tag names in caller order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// One `tags:<name>` key per name, in the same order.
    pub fn index_keys(&self) -> &[String] {
        &self.index_keys
    }

    /// Index keys joined with `|`; the digest input.
    pub fn namespace(&self) -> String {
        self.index_keys.join(NAMESPACE_SEPARATOR)
    }

    /// Lowercase hex SHA-1 of [`namespace`](Self::namespace).
    pub fn reference_namespace(&self) -> &str {
        &self.reference_namespace
    }

    /// Storage key for `key` under this tag set.
    pub fn reference_key(&self, key: &str) -> String {
        format!("{}:{}", self.reference_namespace, key)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Index key for a single tag name.
pub fn index_key(name: &str) -> String {
    format!("{}{}", TAG_INDEX_PREFIX, name)
}

/// Resolve the storage key for `key`: the reference key when tagged,
/// the key itself otherwise.
pub(crate) fn resolve_key(key: &str, tags: Option<&TagSet>) -> String {
    match tags {
        Some(tags) => tags.reference_key(key),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tag_digest_is_stable() {
        let tags = TagSet::new(["users"]);
        assert_eq!(tags.namespace(), "tags:users");
        assert_eq!(
            tags.reference_namespace(),
            "da052dde179a43f4040e50dd3520caead27a3a27"
        );
        assert_eq!(
            tags.reference_key("user:1"),
            "da052dde179a43f4040e50dd3520caead27a3a27:user:1"
        );
    }

    #[test]
    fn test_order_changes_digest() {
        let ab = TagSet::new(["a", "b"]);
        let ba = TagSet::new(["b", "a"]);

        assert_eq!(ab.namespace(), "tags:a|tags:b");
        assert_eq!(
            ab.reference_namespace(),
            "0d3c9adb7da3a551db822de0da4ee26959767c52"
        );
        assert_eq!(
            ba.reference_namespace(),
            "080c7de7714e4059e7167b3460117b5414f1f382"
        );
        assert_ne!(ab.reference_key("k"), ba.reference_key("k"));
    }

    #[test]
    fn test_same_names_are_interchangeable() {
        let first = TagSet::new(vec!["x".to_string(), "y".to_string()]);
        let second: TagSet = ["x", "y"].into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.reference_key("k"), second.reference_key("k"));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let tags = TagSet::new(["a", "a"]);
        assert_eq!(tags.names().len(), 2);
        assert_eq!(tags.index_keys(), ["tags:a", "tags:a"]);
        assert_ne!(
            tags.reference_namespace(),
            TagSet::new(["a"]).reference_namespace()
        );
    }

    #[test]
    fn test_empty_tag_set() {
        let tags = TagSet::new(Vec::<String>::new());
        assert!(tags.is_empty());
        assert!(tags.index_keys().is_empty());
        assert_eq!(
            tags.reference_namespace(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn test_resolve_key() {
        let tags = TagSet::new(["users"]);
        assert_eq!(resolve_key("k", None), "k");
        assert_eq!(resolve_key("k", Some(&tags)), tags.reference_key("k"));
    }

    #[test]
    fn test_display() {
        assert_eq!(TagSet::new(["a", "b"]).to_string(), "[a, b]");
    }
}
