//! Path parameter storage.
//!
//! A router that matched the request stores the captured path segments here
//! so the `path` operation can look them up by name through
//! [`RequestParams`](crate::RequestParams).

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Path parameters captured by a router for one request.
///
/// Parameters are stored as (name, value) pairs in capture order. Most routes
/// capture only a handful of segments, so the pairs live inline until a fifth
/// one is pushed.
///
/// # Example
///
/// ```rust
/// use inreq::Params;
///
/// let mut params = Params::new();
/// params.push("userId", "123");
/// params.insert("userId", "456");
///
/// assert_eq!(params.get("userId"), Some("456"));
/// assert!(params.contains("userId"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter without checking for an existing one.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Sets a parameter, replacing the first existing value with that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Returns the first value captured under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a parameter named `name` was captured.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, _)| n == name)
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the parameters in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_push_and_get() {
        let mut params = Params::new();
        params.push("id", "123");
        params.push("name", "alice");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.get("name"), Some("alice"));
        assert_eq!(params.get("unknown"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_params_first_value_wins() {
        let mut params = Params::new();
        params.push("id", "1");
        params.push("id", "2");

        assert_eq!(params.get("id"), Some("1"));
    }

    #[test]
    fn test_params_insert_replaces() {
        let mut params = Params::new();
        params.insert("id", "1");
        params.insert("id", "2");
        params.insert("other", "3");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("2"));
    }

    #[test]
    fn test_params_from_iterator() {
        let params: Params = [("a", "1"), ("b", "2")].into_iter().collect();

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
        assert!(params.contains("b"));
        assert!(!params.contains("c"));
    }

    #[test]
    fn test_params_spill_to_heap() {
        let mut params = Params::new();
        for i in 0..10 {
            params.push(format!("key{i}"), format!("value{i}"));
        }

        assert_eq!(params.len(), 10);
        assert_eq!(params.get("key5"), Some("value5"));
    }
}
