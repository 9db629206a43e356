//! Randomized matching properties.
//!
//! - Any path built from a pattern by replacing each `:param` with a
//!   non-empty, slash-free value matches that pattern and binds the values in
//!   declaration order.
//! - A catch-all binds the remaining path verbatim, slashes included.
//! - Re-registering a pattern fails and leaves every earlier route matching
//!   as before.

use futures::executor::block_on;
use pathwise::{Match, Method, Request, Router, RouteConflict};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Part {
    Literal(String),
    /// Carries the value a request path substitutes for it.
    Param(String),
}

fn parts(literal: &'static str, max_len: usize) -> impl Strategy<Value = Vec<Part>> {
    let part = prop_oneof![
        literal.prop_map(Part::Literal),
        "[^/]{1,12}".prop_map(Part::Param),
    ];
    prop::collection::vec(part, 0..=max_len)
}

/// `(pattern, path, expected bindings)` for one generated route.
fn concretize(parts: &[Part]) -> (String, String, Vec<(String, String)>) {
    let mut pattern = String::new();
    let mut path = String::new();
    let mut bindings = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        match part {
            Part::Literal(lit) => {
                pattern.push_str(&format!("/{lit}"));
                path.push_str(&format!("/{lit}"));
            }
            Part::Param(value) => {
                let name = format!("p{i}");
                pattern.push_str(&format!("/:{name}"));
                path.push_str(&format!("/{value}"));
                bindings.push((name, value.clone()));
            }
        }
    }
    if pattern.is_empty() {
        pattern.push('/');
        path.push('/');
    }
    (pattern, path, bindings)
}

fn echo_pattern(pattern: &str) -> impl Fn(Request) -> futures::future::Ready<String> + Send + Sync + 'static {
    let pattern = pattern.to_owned();
    move |_req: Request| futures::future::ready(pattern.clone())
}

fn found(router: &Router, path: &str) -> Option<Vec<(String, String)>> {
    match router.lookup(&Method::GET, path) {
        Match::Found { params, .. } => Some(params.into_iter().collect()),
        _ => None,
    }
}

fn served_by(router: &Router, path: &str) -> String {
    let res = block_on(router.dispatch(Request::new(Method::GET, path))).unwrap();
    String::from_utf8(res.body().to_vec()).unwrap()
}

proptest! {
    #[test]
    fn prop_substituted_path_matches_with_ordered_bindings(route in parts("[a-z0-9._-]{1,8}", 6)) {
        let (pattern, path, bindings) = concretize(&route);
        let mut router = Router::new();
        prop_assert_eq!(router.insert(Method::GET, &pattern, echo_pattern(&pattern)), Ok(()));

        prop_assert_eq!(found(&router, &path), Some(bindings.clone()));
        if !route.is_empty() {
            prop_assert_eq!(found(&router, &format!("{path}/")), Some(bindings));
        }
    }

    #[test]
    fn prop_catch_all_binds_the_tail_verbatim(
        prefix in prop::collection::vec("[a-z0-9._-]{1,8}", 0..4),
        tail in "/[a-zA-Z0-9/._~%:*-]{0,24}",
    ) {
        let base: String = prefix.iter().map(|seg| format!("/{seg}")).collect();
        let mut router = Router::new();
        router
            .insert(Method::GET, &format!("{base}/*rest"), echo_pattern("tail"))
            .unwrap();

        let bound = found(&router, &format!("{base}{tail}"));
        prop_assert_eq!(bound, Some(vec![("rest".to_owned(), tail.clone())]));
    }

    #[test]
    fn prop_duplicates_fail_and_earlier_routes_survive(
        routes in prop::collection::vec((parts("[ab]{1,2}", 3), any::<bool>()), 1..8),
    ) {
        let mut router = Router::new();
        let mut accepted = Vec::new();
        for (route, catch_all) in &routes {
            let (mut pattern, _, _) = concretize(route);
            if *catch_all {
                pattern = format!("{}/*rest", pattern.trim_end_matches('/'));
            }
            if router.insert(Method::GET, &pattern, echo_pattern(&pattern)).is_ok() {
                accepted.push(pattern);
            }
        }
        prop_assert!(!accepted.is_empty());

        // A pattern read back as a literal path can only reach its own route:
        // statics never start with `:` or `*`, so every wildcard position
        // falls through to the wildcard child that pattern created.
        for pattern in &accepted {
            prop_assert_eq!(served_by(&router, pattern), pattern.clone());
        }

        for pattern in &accepted {
            prop_assert_eq!(
                router.insert(Method::GET, pattern, echo_pattern("again")),
                Err(RouteConflict::Duplicate { pattern: pattern.clone() })
            );
        }

        for pattern in &accepted {
            prop_assert_eq!(served_by(&router, pattern), pattern.clone());
        }
    }
}
