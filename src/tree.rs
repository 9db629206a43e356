//! Segment trie backing a single HTTP method.
//!
//! Patterns are split on `/` into segments:
//!
//! ```text
//! /product/:id/name/:name     static, param, static, param
//! /product/image/*images      static, static, catch-all
//! ```
//!
//! Each node owns its static children (keyed by the literal segment), at
//! most one `:param` child and at most one terminal `*catch-all` slot.
//! Lookup walks one segment per level and prefers, in order: the static
//! child, the parameter child, the catch-all. If a static branch dead-ends
//! the parameter branch is still tried, so `/users/me` and `/users/:id/posts`
//! coexist without surprises.
//!
//! The tree is only mutated through [`Tree::insert`]. Lookups take `&self`
//! and allocate nothing but the captured parameters.

use std::collections::HashMap;

use crate::error::RouteConflict;
use crate::params::Params;

pub(crate) struct Tree<T> {
    root: Node<T>,
}

struct Node<T> {
    statics: HashMap<String, Node<T>>,
    param: Option<(String, Box<Node<T>>)>,
    // A catch-all always terminates its pattern, so it holds the value directly.
    catch_all: Option<(String, T)>,
    value: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            statics: HashMap::new(),
            param: None,
            catch_all: None,
            value: None,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Segment<'p> {
    Static(&'p str),
    Param(&'p str),
    CatchAll(&'p str),
}

impl<T> Tree<T> {
    pub(crate) fn new() -> Self {
        Self { root: Node::default() }
    }

    /// Registers `value` under `pattern`.
    ///
    /// Conflicts can only be detected on nodes that already exist, and once
    /// a new node is created every node below it is new as well. An error is
    /// therefore always returned before the first node is created, leaving
    /// the tree untouched.
    pub(crate) fn insert(&mut self, pattern: &str, value: T) -> Result<(), RouteConflict> {
        let segments = parse(pattern)?;
        let mut node = &mut self.root;

        for segment in segments {
            node = match segment {
                Segment::Static(literal) => node.statics.entry(literal.to_owned()).or_default(),
                Segment::Param(name) => {
                    if node.catch_all.is_some() {
                        return Err(RouteConflict::Ambiguous { pattern: pattern.to_owned() });
                    }
                    if let Some((existing, _)) = &node.param {
                        if existing != name {
                            return Err(RouteConflict::ParamName {
                                pattern: pattern.to_owned(),
                                existing: format!(":{existing}"),
                                new: format!(":{name}"),
                            });
                        }
                    }
                    let slot = node
                        .param
                        .get_or_insert_with(|| (name.to_owned(), Box::default()));
                    &mut *slot.1
                }
                Segment::CatchAll(name) => {
                    if node.param.is_some() {
                        return Err(RouteConflict::Ambiguous { pattern: pattern.to_owned() });
                    }
                    if let Some((existing, _)) = &node.catch_all {
                        return Err(if existing == name {
                            RouteConflict::Duplicate { pattern: pattern.to_owned() }
                        } else {
                            RouteConflict::ParamName {
                                pattern: pattern.to_owned(),
                                existing: format!("*{existing}"),
                                new: format!("*{name}"),
                            }
                        });
                    }
                    node.catch_all = Some((name.to_owned(), value));
                    return Ok(());
                }
            };
        }

        if node.value.is_some() {
            return Err(RouteConflict::Duplicate { pattern: pattern.to_owned() });
        }
        node.value = Some(value);
        Ok(())
    }

    /// Finds the value registered for `path` and the parameters it binds.
    ///
    /// An empty path is the root. A trailing `/` is ignored unless a
    /// catch-all is waiting for it, in which case it binds `"/"`.
    pub(crate) fn at(&self, path: &str) -> Option<(&T, Params)> {
        let path = if path.is_empty() { "/" } else { path };
        if !path.starts_with('/') {
            return None;
        }
        let mut params = Params::new();
        let value = self.root.find(path, &mut params)?;
        Some((value, params))
    }
}

impl<T> Node<T> {
    // `path` is the unmatched tail: empty, or starting with `/`.
    // On `None` the captured params are restored to their length on entry.
    fn find<'t>(&'t self, path: &str, params: &mut Params) -> Option<&'t T> {
        if path.is_empty() || path == "/" {
            if let Some(value) = &self.value {
                return Some(value);
            }
        }

        let tail = path.strip_prefix('/')?;
        let (segment, rest) = match tail.find('/') {
            Some(i) => tail.split_at(i),
            None => (tail, ""),
        };

        if let Some(child) = self.statics.get(segment) {
            if let Some(value) = child.find(rest, params) {
                return Some(value);
            }
        }

        if let Some((name, child)) = &self.param {
            if !segment.is_empty() {
                let mark = params.len();
                params.push(name, segment);
                if let Some(value) = child.find(rest, params) {
                    return Some(value);
                }
                params.truncate(mark);
            }
        }

        let (name, value) = self.catch_all.as_ref()?;
        params.push(name, path);
        Some(value)
    }
}

fn parse(pattern: &str) -> Result<Vec<Segment<'_>>, RouteConflict> {
    let malformed = |reason| RouteConflict::Malformed {
        pattern: pattern.to_owned(),
        reason,
    };

    let rest = pattern
        .strip_prefix('/')
        .ok_or_else(|| malformed("pattern must start with `/`"))?;
    let trailing_slash = rest.ends_with('/');
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<&str> = rest.split('/').collect();
    let last = raw.len() - 1;
    let mut segments = Vec::with_capacity(raw.len());

    for (i, seg) in raw.into_iter().enumerate() {
        if seg.is_empty() {
            return Err(malformed("empty path segment"));
        }
        let segment = if let Some(name) = seg.strip_prefix(':') {
            Segment::Param(wildcard_name(name).map_err(malformed)?)
        } else if let Some(name) = seg.strip_prefix('*') {
            let name = wildcard_name(name).map_err(malformed)?;
            // `/files/*path/` would leave a segment after the tail.
            if i != last || trailing_slash {
                return Err(RouteConflict::CatchAllNotLast {
                    pattern: pattern.to_owned(),
                    name: name.to_owned(),
                });
            }
            Segment::CatchAll(name)
        } else {
            Segment::Static(seg)
        };
        segments.push(segment);
    }

    Ok(segments)
}

fn wildcard_name(name: &str) -> Result<&str, &'static str> {
    if name.is_empty() {
        Err("wildcard must be named")
    } else if name.contains([':', '*']) {
        Err("wildcard name contains `:` or `*`")
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(routes: &[&'static str]) -> Tree<&'static str> {
        let mut tree = Tree::new();
        for route in routes {
            tree.insert(route, *route).unwrap();
        }
        tree
    }

    fn lookup(tree: &Tree<&'static str>, path: &str) -> Option<(&'static str, Vec<(String, String)>)> {
        tree.at(path).map(|(v, p)| (*v, p.into_iter().collect()))
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_segments() {
        assert_eq!(parse("/").unwrap(), vec![]);
        assert_eq!(
            parse("/product/:id/*rest").unwrap(),
            vec![Segment::Static("product"), Segment::Param("id"), Segment::CatchAll("rest")]
        );
        assert!(matches!(parse("product"), Err(RouteConflict::Malformed { .. })));
        assert!(matches!(parse("/a//b"), Err(RouteConflict::Malformed { .. })));
        assert!(matches!(parse("/a/:"), Err(RouteConflict::Malformed { .. })));
        assert!(matches!(parse("/a/:b:c"), Err(RouteConflict::Malformed { .. })));
        assert!(matches!(parse("/a/*rest/b"), Err(RouteConflict::CatchAllNotLast { .. })));
        assert!(matches!(parse("/a/*rest/"), Err(RouteConflict::CatchAllNotLast { .. })));
        assert_eq!(parse("/a/:id/").unwrap(), vec![Segment::Static("a"), Segment::Param("id")]);
    }

    #[test]
    fn catch_all_with_trailing_slash_is_rejected() {
        let mut t = tree(&["/static/x"]);
        assert_eq!(
            t.insert("/files/*path/", "x"),
            Err(RouteConflict::CatchAllNotLast { pattern: "/files/*path/".into(), name: "path".into() })
        );
        assert!(!t.root.statics.contains_key("files"));
    }

    #[test]
    fn root_and_static_routes() {
        let t = tree(&["/", "/post", "/post/new"]);
        assert_eq!(lookup(&t, "/"), Some(("/", vec![])));
        assert_eq!(lookup(&t, ""), Some(("/", vec![])));
        assert_eq!(lookup(&t, "/post"), Some(("/post", vec![])));
        assert_eq!(lookup(&t, "/post/"), Some(("/post", vec![])));
        assert_eq!(lookup(&t, "/post/new"), Some(("/post/new", vec![])));
        assert_eq!(lookup(&t, "/posts"), None);
        assert_eq!(lookup(&t, "post"), None);
    }

    #[test]
    fn named_params_bind_in_declaration_order() {
        let t = tree(&["/product/:id", "/product/:id/name/:name"]);
        assert_eq!(lookup(&t, "/product/1"), Some(("/product/:id", pairs(&[("id", "1")]))));
        assert_eq!(
            lookup(&t, "/product/1/name/mangga"),
            Some(("/product/:id/name/:name", pairs(&[("id", "1"), ("name", "mangga")])))
        );
        assert_eq!(lookup(&t, "/product/1/name"), None);
        assert_eq!(lookup(&t, "/product//name/x"), None);
    }

    #[test]
    fn params_are_not_decoded() {
        let t = tree(&["/users/:id"]);
        assert_eq!(lookup(&t, "/users/a%20b"), Some(("/users/:id", pairs(&[("id", "a%20b")]))));
    }

    #[test]
    fn catch_all_binds_the_tail_verbatim() {
        let t = tree(&["/product/image/*images"]);
        assert_eq!(
            lookup(&t, "/product/image/name/mangga.jpg"),
            Some(("/product/image/*images", pairs(&[("images", "/name/mangga.jpg")])))
        );
        assert_eq!(
            lookup(&t, "/product/image/"),
            Some(("/product/image/*images", pairs(&[("images", "/")])))
        );
        assert_eq!(lookup(&t, "/product/image"), None);
    }

    #[test]
    fn static_beats_param_and_param_backtracks() {
        let t = tree(&["/users/:id", "/users/me", "/users/:id/posts"]);
        assert_eq!(lookup(&t, "/users/me"), Some(("/users/me", vec![])));
        assert_eq!(lookup(&t, "/users/42"), Some(("/users/:id", pairs(&[("id", "42")]))));
        assert_eq!(
            lookup(&t, "/users/me/posts"),
            Some(("/users/:id/posts", pairs(&[("id", "me")])))
        );
    }

    #[test]
    fn static_beats_catch_all() {
        let t = tree(&["/files/*path", "/files/index"]);
        assert_eq!(lookup(&t, "/files/index"), Some(("/files/index", vec![])));
        assert_eq!(
            lookup(&t, "/files/index/more"),
            Some(("/files/*path", pairs(&[("path", "/index/more")])))
        );
    }

    #[test]
    fn duplicate_is_rejected_and_tree_is_unchanged() {
        let mut t = tree(&["/post", "/users/:id"]);
        assert_eq!(
            t.insert("/post", "again"),
            Err(RouteConflict::Duplicate { pattern: "/post".into() })
        );
        assert_eq!(
            t.insert("/users/:id/", "again"),
            Err(RouteConflict::Duplicate { pattern: "/users/:id/".into() })
        );
        assert_eq!(lookup(&t, "/post"), Some(("/post", vec![])));
        assert_eq!(lookup(&t, "/users/7"), Some(("/users/:id", pairs(&[("id", "7")]))));
    }

    #[test]
    fn conflicting_wildcards_are_rejected() {
        let mut t = tree(&["/users/:id", "/files/*path"]);
        assert!(matches!(
            t.insert("/users/:name/x", "x"),
            Err(RouteConflict::ParamName { .. })
        ));
        assert!(matches!(
            t.insert("/files/*other", "x"),
            Err(RouteConflict::ParamName { .. })
        ));
        assert!(matches!(t.insert("/files/*path", "x"), Err(RouteConflict::Duplicate { .. })));
        assert!(matches!(t.insert("/users/*rest", "x"), Err(RouteConflict::Ambiguous { .. })));
        assert!(matches!(t.insert("/files/:name", "x"), Err(RouteConflict::Ambiguous { .. })));
        // nothing leaked from the failed attempts
        assert_eq!(lookup(&t, "/users/1/x"), None);
        assert!(t.root.statics["users"].catch_all.is_none());
        assert!(t.root.statics["files"].param.is_none());
    }
}
