//! Route lookup.
//!
//! # Responsibilities
//! - Index compiled routes by template, then by method
//! - Match a request path to exactly one route and its positional values
//!
//! # Design Decisions
//! - Literal children take precedence over positional ones at the same depth
//! - A literal branch that dead-ends deeper falls back to positional siblings
//! - Positional siblings are tried in ascending index order, binding the
//!   segment before descending and unbinding it on failure
//! - Duplicate (method, template) pairs are rejected at insertion

use std::collections::{BTreeMap, HashMap};

use axum::http::Method;

use crate::error::ConfigurationError;
use crate::routing::path::{split_path, Segment};
use crate::routing::route::Route;

/// Positional values resolved by a match, keyed by parameter index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams<'a> {
    bound: Vec<(usize, &'a str)>,
}

impl<'a> PathParams<'a> {
    pub fn get(&self, pos: usize) -> Option<&'a str> {
        self.bound
            .iter()
            .find(|(p, _)| *p == pos)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.bound.iter().copied()
    }

    pub(crate) fn push(&mut self, pos: usize, value: &'a str) {
        self.bound.push((pos, value));
    }

    fn pop(&mut self) {
        self.bound.pop();
    }
}

/// A matched route with its positional values.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams<'a>,
}

#[derive(Default)]
struct Node {
    literal: HashMap<String, Node>,
    positional: BTreeMap<usize, Node>,
    routes: HashMap<Method, Route>,
}

impl Node {
    fn insert(&mut self, segments: &[Segment], route: Route) -> Result<(), ConfigurationError> {
        let Some((head, rest)) = segments.split_first() else {
            if self.routes.contains_key(route.method()) {
                return Err(ConfigurationError::DuplicateRoute {
                    route: route.to_string(),
                });
            }
            self.routes.insert(route.method().clone(), route);
            return Ok(());
        };

        let next = match head {
            Segment::Literal(text) => self.literal.entry(text.clone()).or_default(),
            Segment::Positional { index, .. } => self.positional.entry(*index).or_default(),
        };
        next.insert(rest, route)
    }

    fn find<'a>(
        &'a self,
        method: &Method,
        segments: &[&'a str],
        params: &mut PathParams<'a>,
    ) -> Option<&'a Route> {
        let Some((head, rest)) = segments.split_first() else {
            return self.routes.get(method);
        };

        if let Some(route) = self
            .literal
            .get(*head)
            .and_then(|next| next.find(method, rest, params))
        {
            return Some(route);
        }

        for (pos, next) in &self.positional {
            params.push(*pos, *head);
            if let Some(route) = next.find(method, rest, params) {
                return Some(route);
            }
            params.pop();
        }

        None
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Route>) {
        out.extend(self.routes.values());
        for next in self.literal.values() {
            next.collect(out);
        }
        for next in self.positional.values() {
            next.collect(out);
        }
    }
}

/// Routing trie. Built once, then only read.
#[derive(Default)]
pub struct Router {
    root: Node,
    len: usize,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a compiled route.
    pub fn add(&mut self, route: Route) -> Result<(), ConfigurationError> {
        let segments = route.path().segments().to_vec();
        self.root.insert(&segments, route)?;
        self.len += 1;
        Ok(())
    }

    /// Find the route for `method` and `path`.
    pub fn match_route<'a>(&'a self, method: &Method, path: &'a str) -> Option<RouteMatch<'a>> {
        self.match_segments(method, &split_path(path))
    }

    /// Find the route for `method` and an already split path.
    pub fn match_segments<'a>(&'a self, method: &Method, segments: &[&'a str]) -> Option<RouteMatch<'a>> {
        let mut params = PathParams::default();
        self.root
            .find(method, segments, &mut params)
            .map(|route| RouteMatch { route, params })
    }

    /// Every registered route, sorted by path then method.
    pub fn routes(&self) -> Vec<&Route> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out.sort_by_cached_key(|r| (r.path().to_string(), r.method().to_string()));
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h0() {}
    fn h1(_: i64) {}
    fn h2(_: i64, _: i64) {}
    fn h3(_: i64, _: i64, _: i64) {}

    fn add(router: &mut Router, route: Route) -> String {
        let name = route.to_string();
        router.add(route).unwrap_or_else(|e| panic!("{}: {}", name, e));
        name
    }

    fn check(router: &Router, method: Method, path: &str, expected: Option<&str>, args: &[(usize, &str)]) {
        let matched = router.match_route(&method, path);
        assert_eq!(
            matched.as_ref().map(|m| m.route.to_string()),
            expected.map(str::to_string),
            "routing {} {}",
            method,
            path
        );
        if let Some(m) = matched {
            assert_eq!(m.params.len(), args.len(), "args of {} {}", method, path);
            for (pos, value) in args {
                assert_eq!(m.params.get(*pos), Some(*value), "arg {} of {} {}", pos, method, path);
            }
        }
    }

    #[test]
    fn test_router_table() {
        let mut rt = Router::new();

        let r00 = add(&mut rt, Route::post("/", h0).unwrap());
        let r01 = add(&mut rt, Route::post("/a", h0).unwrap());
        let r02 = add(&mut rt, Route::post("/c", h0).unwrap());
        let r03 = add(&mut rt, Route::post("/a/b", h0).unwrap());
        let r04 = add(&mut rt, Route::post("/b/c", h0).unwrap());
        let r05 = add(&mut rt, Route::post("/a/b/c", h0).unwrap());
        rt.add(Route::put("/a/b/c", h0).unwrap()).unwrap();

        let r10 = add(&mut rt, Route::post("/{0:a}/b/c", h1).unwrap());
        let r11 = add(&mut rt, Route::post("/a/{0:b}/c", h1).unwrap());
        let r12 = add(&mut rt, Route::post("/a/b/{0:c}", h1).unwrap());
        let r13 = add(&mut rt, Route::post("/{0:a}/b", h1).unwrap());
        let r14 = add(&mut rt, Route::post("/b/{1:a}", h2).unwrap());
        let r15 = add(&mut rt, Route::post("/{0:a}", h1).unwrap());

        let r20 = add(&mut rt, Route::post("/{0:a}/{1:b}/c", h2).unwrap());
        let r21 = add(&mut rt, Route::post("/{1:a}/{0:b}", h2).unwrap());
        let r22 = add(&mut rt, Route::post("/{0:a}/b/{1:c}", h2).unwrap());
        let r23 = add(&mut rt, Route::post("/a/{1:b}/{0:c}", h2).unwrap());

        let r30 = add(&mut rt, Route::post("/{0:a}/{1:b}/{2:c}", h3).unwrap());

        for (path, route) in [
            ("/a/b/c", Route::post("/a/b/c", h0)),
            ("/{0:a}/b", Route::post("/{0:a}/b", h1)),
            ("/a/b/{0:c}", Route::post("/a/b/{0:c}", h1)),
        ] {
            assert!(
                matches!(rt.add(route.unwrap()), Err(ConfigurationError::DuplicateRoute { .. })),
                "duplicate {} accepted",
                path
            );
        }

        check(&rt, Method::POST, "", Some(r00.as_str()), &[]);
        check(&rt, Method::POST, "/", Some(r00.as_str()), &[]);
        check(&rt, Method::POST, "/a", Some(r01.as_str()), &[]);
        check(&rt, Method::POST, "/c", Some(r02.as_str()), &[]);
        check(&rt, Method::POST, "/a/b", Some(r03.as_str()), &[]);
        check(&rt, Method::POST, "/b/c", Some(r04.as_str()), &[]);
        check(&rt, Method::POST, "/a/b/c", Some(r05.as_str()), &[]);
        check(&rt, Method::PUT, "/a/b/c", Some("{ PUT /a/b/c }"), &[]);

        check(&rt, Method::POST, "/0/b/c", Some(r10.as_str()), &[(0, "0")]);
        check(&rt, Method::POST, "/a/1/c", Some(r11.as_str()), &[(0, "1")]);
        check(&rt, Method::POST, "/a/b/2", Some(r12.as_str()), &[(0, "2")]);
        check(&rt, Method::POST, "/3/b", Some(r13.as_str()), &[(0, "3")]);
        check(&rt, Method::POST, "/b/4", Some(r14.as_str()), &[(1, "4")]);
        check(&rt, Method::POST, "/5", Some(r15.as_str()), &[(0, "5")]);

        check(&rt, Method::POST, "/0/1/c", Some(r20.as_str()), &[(0, "0"), (1, "1")]);
        check(&rt, Method::POST, "/2/3", Some(r21.as_str()), &[(1, "2"), (0, "3")]);
        check(&rt, Method::POST, "/4/b/5", Some(r22.as_str()), &[(0, "4"), (1, "5")]);
        check(&rt, Method::POST, "/a/6/7", Some(r23.as_str()), &[(1, "6"), (0, "7")]);

        check(&rt, Method::POST, "/0/1/2", Some(r30.as_str()), &[(0, "0"), (1, "1"), (2, "2")]);

        check(&rt, Method::POST, "/a/b/c/d", None, &[]);
        check(&rt, Method::POST, "/0/b/c/d", None, &[]);
        check(&rt, Method::POST, "/a/1/c/d", None, &[]);
        check(&rt, Method::POST, "/a/b/2/d", None, &[]);
        check(&rt, Method::POST, "/0/1/2/d", None, &[]);
        check(&rt, Method::PUT, "/b/c", None, &[]);
        check(&rt, Method::DELETE, "/a/b/c", None, &[]);

        assert_eq!(rt.len(), 18);
    }

    #[test]
    fn test_literal_precedence() {
        let mut rt = Router::new();
        rt.add(Route::get("/{0:x}/b", h1).unwrap()).unwrap();
        rt.add(Route::get("/a/b", h0).unwrap()).unwrap();

        check(&rt, Method::GET, "/a/b", Some("{ GET /a/b }"), &[]);
        check(&rt, Method::GET, "/z/b", Some("{ GET /{0:x}/b }"), &[(0, "z")]);
    }

    #[test]
    fn test_literal_dead_end_backtracks() {
        let mut rt = Router::new();
        rt.add(Route::get("/a/b", h0).unwrap()).unwrap();
        rt.add(Route::get("/{0:x}/c", h1).unwrap()).unwrap();

        check(&rt, Method::GET, "/a/c", Some("{ GET /{0:x}/c }"), &[(0, "a")]);
    }

    #[test]
    fn test_positional_branches_by_index() {
        let mut rt = Router::new();
        rt.add(Route::get("/{0:a}/b", h1).unwrap()).unwrap();
        rt.add(Route::get("/{1:a}", h2).unwrap()).unwrap();

        check(&rt, Method::GET, "/5/b", Some("{ GET /{0:a}/b }"), &[(0, "5")]);
        check(&rt, Method::GET, "/5", Some("{ GET /{1:a} }"), &[(1, "5")]);
    }

    #[test]
    fn test_positional_tie_break_is_ascending() {
        let mut rt = Router::new();
        rt.add(Route::get("/{1:b}", h2).unwrap()).unwrap();
        rt.add(Route::get("/{0:a}", h1).unwrap()).unwrap();

        check(&rt, Method::GET, "/7", Some("{ GET /{0:a} }"), &[(0, "7")]);
    }

    #[test]
    fn test_failed_branch_unbinds() {
        let mut rt = Router::new();
        rt.add(Route::get("/{0:a}/x", h2).unwrap()).unwrap();
        rt.add(Route::get("/{1:a}/{0:b}", h2).unwrap()).unwrap();

        check(&rt, Method::GET, "/p/q", Some("{ GET /{1:a}/{0:b} }"), &[(1, "p"), (0, "q")]);
    }

    #[test]
    fn test_duplicate_regardless_of_order() {
        for order in [[0usize, 1], [1, 0]] {
            let mut rt = Router::new();
            let routes = [
                Route::get("/a/{0:x}", h1).unwrap(),
                Route::get("a//:y/", h1).unwrap(),
            ];
            let [first, second] = order.map(|i| routes[i].clone());
            rt.add(first).unwrap();
            assert!(matches!(rt.add(second), Err(ConfigurationError::DuplicateRoute { .. })));
        }
    }

    #[test]
    fn test_unknown_method_or_path() {
        let mut rt = Router::new();
        rt.add(Route::get("/map/{0:key}", |_: String| ()).unwrap()).unwrap();

        assert!(rt.match_route(&Method::POST, "/map/a").is_none());
        assert!(rt.match_route(&Method::GET, "/other/a").is_none());
        assert!(rt.match_route(&Method::GET, "/map").is_none());
        assert!(rt.match_route(&Method::GET, "/map/a").is_some());
    }

    #[test]
    fn test_match_segments_keeps_segment_whole() {
        let mut rt = Router::new();
        rt.add(Route::get("/map/{0:key}", |_: String| ()).unwrap()).unwrap();

        let matched = rt.match_segments(&Method::GET, &["map", "a/b"]).unwrap();
        assert_eq!(matched.params.get(0), Some("a/b"));
        assert!(rt.match_segments(&Method::GET, &["map", "a", "b"]).is_none());
    }

    #[test]
    fn test_routes_sorted() {
        let mut rt = Router::new();
        rt.add(Route::put("/b", h0).unwrap()).unwrap();
        rt.add(Route::get("/b", h0).unwrap()).unwrap();
        rt.add(Route::get("/a/{0:x}", h1).unwrap()).unwrap();

        let listed: Vec<String> = rt.routes().iter().map(|r| r.to_string()).collect();
        assert_eq!(listed, vec!["{ GET /a/{0:x} }", "{ GET /b }", "{ PUT /b }"]);
    }
}
