//! Per-method route trees, 404/405 resolution and the dispatch boundary.
//!
//! One [`Tree`] per HTTP method. You register a path and get a handler back
//! at request time. Build the router once at startup, then hand it to
//! [`Server::serve`](crate::Server::serve), which freezes it behind an `Arc`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::{debug, error, warn};

use crate::error::{HandlerFault, RouteConflict};
use crate::files::ServeDir;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Middleware, Next};
use crate::params::Params;
use crate::request::Request;
use crate::response::Response;
use crate::tree::Tree;

type PanicHandler = Arc<dyn Fn(HandlerFault) -> Response + Send + Sync + 'static>;

/// Outcome of [`Router::lookup`].
pub enum Match<'r> {
    /// A route for this method matched.
    Found { handler: &'r BoxedHandler, params: Params },
    /// No method has a route for this path.
    NotFound,
    /// Other methods have a route for this path. Sorted by name.
    MethodNotAllowed(Vec<Method>),
}

/// The application router.
///
/// Each [`Router::on`] call returns `self` so registrations chain naturally:
///
/// ```rust,no_run
/// # use pathwise::{Request, Response, Router};
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// # async fn assets(_: Request) -> Response { Response::text("") }
/// Router::new()
///     .get("/users/:id", get_user)
///     .post("/users", create_user)
///     .get("/assets/*path", assets);
/// ```
///
/// The chaining methods panic on a [`RouteConflict`], so a bad route table
/// stops the process at startup. Use [`Router::insert`] to handle the
/// conflict yourself.
pub struct Router {
    routes: HashMap<Method, Tree<BoxedHandler>>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
    panic_handler: Option<PanicHandler>,
    middleware: Option<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            not_found: None,
            method_not_allowed: None,
            panic_handler: None,
            middleware: None,
        }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Registers `handler` for `method` + `pattern`.
    ///
    /// Pattern syntax: literal segments match verbatim, `:name` matches one
    /// segment, and a final `*name` matches the rest of the path including
    /// its leading `/`. On error the router is unchanged.
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<(), RouteConflict> {
        self.insert_boxed(method, pattern, handler.into_boxed_handler())
    }

    fn insert_boxed(
        &mut self,
        method: Method,
        pattern: &str,
        handler: BoxedHandler,
    ) -> Result<(), RouteConflict> {
        // A method's tree is only created once something is stored in it, so
        // a failed first registration leaves no empty tree behind.
        match self.routes.get_mut(&method) {
            Some(tree) => tree.insert(pattern, handler),
            None => {
                let mut tree = Tree::new();
                tree.insert(pattern, handler)?;
                self.routes.insert(method, tree);
                Ok(())
            }
        }
    }

    /// Register a handler for a method + pattern pair. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is malformed or conflicts with an existing route.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        if let Err(e) = self.insert(method, pattern, handler) {
            error!(%e, "route registration failed");
            panic!("invalid route `{pattern}`: {e}");
        }
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, pattern, handler)
    }

    pub fn head(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::HEAD, pattern, handler)
    }

    pub fn options(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::OPTIONS, pattern, handler)
    }

    /// Serves files under `root` for GET requests on `pattern`.
    ///
    /// The pattern must end in `/*filepath`, e.g. `/files/*filepath`. A
    /// request for `/files/css/site.css` reads `root/css/site.css`.
    pub fn insert_files(
        &mut self,
        pattern: &str,
        root: impl Into<PathBuf>,
    ) -> Result<(), RouteConflict> {
        if !pattern.ends_with("/*filepath") {
            return Err(RouteConflict::Malformed {
                pattern: pattern.to_owned(),
                reason: "file routes must end with `/*filepath`",
            });
        }
        self.insert_boxed(Method::GET, pattern, BoxedHandler::new(ServeDir::new(root)))
    }

    /// Chaining form of [`Router::insert_files`].
    ///
    /// # Panics
    ///
    /// Panics if the pattern is not a valid file route.
    pub fn serve_files(mut self, pattern: &str, root: impl Into<PathBuf>) -> Self {
        if let Err(e) = self.insert_files(pattern, root) {
            error!(%e, "file route registration failed");
            panic!("invalid file route `{pattern}`: {e}");
        }
        self
    }

    // ── Hooks ─────────────────────────────────────────────────────────────────

    /// Handler for paths no method has a route for. Default: bare `404`.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Handler for paths that exist under other methods only. Default: bare
    /// `405`. The `Allow` header is added to whatever this returns unless the
    /// handler already set one.
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = Some(handler.into_boxed_handler());
        self
    }

    /// Turns a handler panic into a response.
    ///
    /// Without one, [`Router::dispatch`] returns the [`HandlerFault`] as an
    /// error and the server answers `500`.
    pub fn panic_handler<F>(mut self, recover: F) -> Self
    where
        F: Fn(HandlerFault) -> Response + Send + Sync + 'static,
    {
        self.panic_handler = Some(Arc::new(recover));
        self
    }

    /// Wraps the whole router, including 404/405 handling, in `middleware`.
    /// There is one slot; a second call replaces the first.
    pub fn wrap(mut self, middleware: impl Middleware) -> Self {
        if self.middleware.is_some() {
            warn!("replacing previously installed middleware");
        }
        self.middleware = Some(Arc::new(middleware));
        self
    }

    // ── Matching ──────────────────────────────────────────────────────────────

    /// Resolves `method` + `path` against the registered routes.
    ///
    /// Pure lookup: takes `&self`, no locks, no side effects.
    pub fn lookup(&self, method: &Method, path: &str) -> Match<'_> {
        if let Some((handler, params)) = self.routes.get(method).and_then(|t| t.at(path)) {
            return Match::Found { handler, params };
        }

        let mut allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|(m, tree)| *m != method && tree.at(path).is_some())
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            Match::NotFound
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Match::MethodNotAllowed(allowed)
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Routes one request and runs its handler.
    ///
    /// Handlers run inside an unwind boundary. A panic becomes a
    /// [`HandlerFault`], which goes to the [panic handler](Router::panic_handler)
    /// if one is set and is returned as `Err` otherwise. Either way the panic
    /// stops here, and the router is never mutated while serving, so other
    /// requests are unaffected.
    pub async fn dispatch(&self, req: Request) -> Result<Response, HandlerFault> {
        match &self.middleware {
            Some(middleware) => middleware.handle(req, Next::new(self)).await,
            None => self.route(req).await,
        }
    }

    pub(crate) async fn route(&self, mut req: Request) -> Result<Response, HandlerFault> {
        match self.lookup(req.method(), req.path()) {
            Match::Found { handler, params } => {
                req.set_params(params);
                self.invoke(handler, req).await
            }
            Match::NotFound => {
                debug!(method = %req.method(), path = req.path(), "no route");
                match &self.not_found {
                    Some(handler) => self.invoke(handler, req).await,
                    None => Ok(Response::status(StatusCode::NOT_FOUND)),
                }
            }
            Match::MethodNotAllowed(allowed) => {
                debug!(method = %req.method(), path = req.path(), ?allowed, "method not allowed");
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                let mut res = match &self.method_not_allowed {
                    Some(handler) => self.invoke(handler, req).await?,
                    None => Response::status(StatusCode::METHOD_NOT_ALLOWED),
                };
                res.set_header_if_absent("allow", allow);
                Ok(res)
            }
        }
    }

    async fn invoke(&self, handler: &BoxedHandler, req: Request) -> Result<Response, HandlerFault> {
        match handler.invoke(req).await {
            Err(fault) => match &self.panic_handler {
                Some(recover) => {
                    warn!(%fault, "recovered handler panic");
                    Ok(recover(fault))
                }
                None => Err(fault),
            },
            outcome => outcome,
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
