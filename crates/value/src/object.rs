//! Persistent key-value map.

use crate::value::Value;
use im::HashMap;

/// Persistent key-value map with structural sharing.
///
/// Backed by [`im::HashMap`]: O(log n) access, O(1) clone, and mutators
/// that return a new map sharing unchanged branches with the original.
/// [`Object::ptr_eq`] exposes the identity shortcut the execution context
/// uses for its no-op update fast path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    inner: HashMap<String, Value>,
}

impl Object {
    /// Create an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Number of keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no keys.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Returns `true` if the key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Insert a key-value pair, returning the new object. The original is
    /// unchanged.
    #[must_use]
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            inner: self.inner.update(key.into(), value.into()),
        }
    }

    /// Remove a key, returning the new object. The original is unchanged;
    /// removing an absent key returns an equal object.
    #[must_use]
    pub fn remove(&self, key: &str) -> Self {
        Self {
            inner: self.inner.without(key),
        }
    }

    /// Merge `other` into `self`; `other` wins on conflicting keys.
    #[must_use]
    pub fn merge(&self, other: &Object) -> Self {
        // im's union is left-biased, so other goes on the left.
        Self {
            inner: other.inner.clone().union(self.inner.clone()),
        }
    }

    /// Iterate over keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    /// Iterate over values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.inner.values()
    }

    /// Iterate over entries.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    /// Returns `true` if both objects share the same root node. This
    /// identity check is cheaper than structural equality and sufficient
    /// to prove no update happened.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a Value);
    type IntoIter = im::hashmap::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_leaves_original_unchanged() {
        let a = Object::new();
        let b = a.insert("k", Value::number(1.0));
        assert!(a.is_empty());
        assert_eq!(b.len(), 1);
        assert_eq!(b.get("k"), Some(&Value::number(1.0)));
    }

    #[test]
    fn remove_leaves_original_unchanged() {
        let a = Object::new().insert("k", Value::number(1.0));
        let b = a.remove("k");
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn merge_right_wins() {
        let left = Object::new()
            .insert("a", Value::number(1.0))
            .insert("b", Value::number(2.0));
        let right = Object::new()
            .insert("b", Value::number(20.0))
            .insert("c", Value::number(3.0));

        let merged = left.merge(&right);
        assert_eq!(merged.get("a"), Some(&Value::number(1.0)));
        assert_eq!(merged.get("b"), Some(&Value::number(20.0)));
        assert_eq!(merged.get("c"), Some(&Value::number(3.0)));
    }

    #[test]
    fn ptr_eq_detects_shared_root() {
        let a = Object::new().insert("k", Value::number(1.0));
        let b = a.clone();
        assert!(a.ptr_eq(&b));

        let c = a.insert("other", Value::Null);
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn structural_equality_ignores_identity() {
        let a = Object::new().insert("k", Value::string("v"));
        let b = Object::new().insert("k", Value::string("v"));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn from_iterator() {
        let obj: Object = vec![
            ("a".to_string(), Value::number(1.0)),
            ("b".to_string(), Value::number(2.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(obj.len(), 2);
    }
}
