//! Route listing.
//!
//! Serves a JSON description of every registered route, with paths shown
//! under the endpoint root.

use serde::Serialize;

use crate::routing::route::{ArgSource, Route};
use crate::routing::Endpoint;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RouteDoc {
    pub method: String,
    pub path: String,
    pub params: Vec<ParamDoc>,
    pub returns: ReturnsDoc,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParamDoc {
    pub index: usize,
    pub source: &'static str,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ReturnsDoc {
    pub body: bool,
    pub error: bool,
}

/// Describe every route of `endpoint`, sorted by path then method.
pub fn listing(endpoint: &Endpoint) -> Vec<RouteDoc> {
    endpoint
        .routes()
        .into_iter()
        .map(|route| describe(endpoint.root(), route))
        .collect()
}

fn describe(root: &str, route: &Route) -> RouteDoc {
    let plan = route.plan();
    let path = route.path().to_string();
    let path = match (root, path.as_str()) {
        ("/", _) => path,
        (_, "/") => root.to_string(),
        _ => format!("{}{}", root, path),
    };

    RouteDoc {
        method: route.method().to_string(),
        path,
        params: plan
            .args
            .iter()
            .enumerate()
            .map(|(index, kind)| ParamDoc {
                index,
                source: match plan.source(index) {
                    ArgSource::Path => "path",
                    ArgSource::Body => "body",
                },
                kind: kind.to_string(),
            })
            .collect(),
        returns: ReturnsDoc {
            body: plan.output_body.is_some(),
            error: plan.output_error.is_some(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::routing::Route;

    fn endpoint(root: &str) -> Endpoint {
        let mut builder = Endpoint::builder(root);
        builder
            .add_route(Route::put("/item/{0:id}", |_: u32, _: String| -> Result<(), BoxError> { Ok(()) }).unwrap())
            .unwrap()
            .add_route(Route::get("/", || 1i64).unwrap())
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_listing() {
        let docs = listing(&endpoint("/"));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].path, "/");
        assert_eq!(docs[0].returns, ReturnsDoc { body: true, error: false });

        let put = &docs[1];
        assert_eq!(put.method, "PUT");
        assert_eq!(put.path, "/item/{0:id}");
        assert_eq!(
            put.params,
            vec![
                ParamDoc { index: 0, source: "path", kind: "uint32".into() },
                ParamDoc { index: 1, source: "body", kind: "string".into() },
            ]
        );
        assert_eq!(put.returns, ReturnsDoc { body: false, error: true });
    }

    #[test]
    fn test_listing_under_root() {
        let paths: Vec<String> = listing(&endpoint("api")).into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["/api", "/api/item/{0:id}"]);
    }
}
