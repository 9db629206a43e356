//! Error types.
//!
//! Application-level outcomes (404, 405, 422, …) are expressed as
//! [`Response`](crate::Response) values, not as errors. What lives here is
//! what can go wrong around them: registering a route, a handler panicking,
//! and the server failing to bind or accept.

use http::Method;
use thiserror::Error;

/// Infrastructure failure surfaced by [`Server::serve`](crate::Server::serve).
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot resolve socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A registration that would make the route tree ambiguous or invalid.
///
/// Returned by [`Router::insert`](crate::Router::insert). The tree is left
/// exactly as it was before the failed call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteConflict {
    /// The same pattern is already registered for this method.
    #[error("route `{pattern}` is already registered")]
    Duplicate { pattern: String },

    /// A wildcard at this position is already bound under another name.
    #[error("`{new}` in `{pattern}` conflicts with existing wildcard `{existing}`")]
    ParamName {
        pattern: String,
        existing: String,
        new: String,
    },

    #[error("catch-all `*{name}` must be the last segment of `{pattern}`")]
    CatchAllNotLast { pattern: String, name: String },

    /// A parameter and a catch-all would both claim the same segment.
    #[error("`{pattern}` puts a parameter and a catch-all at the same position")]
    Ambiguous { pattern: String },

    #[error("malformed route `{pattern}`: {reason}")]
    Malformed {
        pattern: String,
        reason: &'static str,
    },
}

/// A panic raised by a handler, caught at the dispatch boundary.
///
/// Passed to the callback set with
/// [`Router::panic_handler`](crate::Router::panic_handler). Without one it is
/// returned from [`Router::dispatch`](crate::Router::dispatch) so the server
/// can log it and answer `500`.
#[derive(Clone, Debug, Error)]
#[error("handler for {method} {path} panicked: {message}")]
pub struct HandlerFault {
    pub method: Method,
    pub path: String,
    /// The panic payload if it was a string, otherwise a placeholder.
    pub message: String,
}
