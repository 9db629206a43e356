//! Path parameters captured while matching a route.

/// Ordered `(name, value)` pairs bound by `:name` and `*name` segments.
///
/// Pairs appear in the order they were met while descending the route
/// tree, which is the order they are declared in the pattern.
///
/// Values are slices of the request path exactly as received. They are
/// **not** percent-decoded: `/users/a%20b` binds `id` to `"a%20b"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`, if the matched route declared it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.pairs.push((name.to_owned(), value.to_owned()));
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.pairs.truncate(len);
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_first_binding_in_order() {
        let params: Params = [("id", "1"), ("name", "mangga")].into_iter().collect();
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.get("name"), Some("mangga"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(
            params.iter().collect::<Vec<_>>(),
            vec![("id", "1"), ("name", "mangga")]
        );
    }

    #[test]
    fn truncate_drops_later_bindings() {
        let mut params = Params::new();
        params.push("a", "1");
        params.push("b", "2");
        params.truncate(1);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("b"), None);
    }
}
