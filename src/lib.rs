//! # pathwise
//!
//! A small HTTP router for Rust services. One segment trie per method,
//! explicit 404/405 handling, and a panic boundary around every handler.
//!
//! ## Route patterns
//!
//! ```text
//! /product/:id/name/:name   :name binds one segment
//! /product/image/*images    *name binds the rest of the path, must be last
//! ```
//!
//! | Pattern | Path | Params |
//! |---|---|---|
//! | `/product/:id` | `/product/1` | `id = "1"` |
//! | `/product/:id` | `/product/1/x` | no match |
//! | `/product/image/*images` | `/product/image/name/mangga.jpg` | `images = "/name/mangga.jpg"` |
//!
//! Static segments win over parameters, and parameters over catch-alls, so
//! `/users/me` and `/users/:id` can be registered side by side. Registering
//! the same pattern twice, or two differently named wildcards at one
//! position, is a [`RouteConflict`]. Parameter values are handed to
//! handlers exactly as they appear in the path, without percent-decoding.
//!
//! ## When nothing matches
//!
//! - No method has the path: the [not-found handler](Router::not_found), or `404`.
//! - Other methods have it: the [method-not-allowed handler](Router::method_not_allowed),
//!   or `405`, with an `Allow` header listing them.
//! - The handler panics: the [panic handler](Router::panic_handler), or `500`
//!   from the server. The process keeps serving.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pathwise::{Request, Response, Router, Server, middleware::Trace};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/product/:id", get_product)
//!         .serve_files("/files/*filepath", "./resources")
//!         .panic_handler(|fault| Response::text(format!("Panic : {}", fault.message)))
//!         .wrap(Trace);
//!
//!     Server::bind("localhost:8000").serve(app).await.unwrap();
//! }
//!
//! async fn get_product(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::text(format!("product {id}"))
//! }
//! ```

mod error;
mod files;
mod handler;
mod params;
mod request;
mod response;
mod router;
mod server;
mod tree;

pub mod middleware;

pub use error::{Error, HandlerFault, RouteConflict};
pub use handler::Handler;
pub use http::{Method, StatusCode};
pub use params::Params;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{Match, Router};
pub use server::Server;
