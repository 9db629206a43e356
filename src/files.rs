//! Static file handler behind [`Router::serve_files`](crate::Router::serve_files).
//!
//! The route's `*filepath` catch-all is joined onto a root directory. Only
//! plain path components are accepted, so `..` cannot climb out of the root.
//!
//! A directory is served through its `index.html`. A directory requested
//! without a trailing slash is first redirected to the slashed path so the
//! page's relative links resolve inside it.

use std::path::{Component, Path, PathBuf};

use futures::future::BoxFuture;
use http::StatusCode;
use tracing::{debug, warn};

use crate::handler::Endpoint;
use crate::request::Request;
use crate::response::{ContentType, Response};

pub(crate) struct ServeDir {
    root: PathBuf,
}

impl ServeDir {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps the captured `filepath` onto the root, or `None` if it tries to
    /// leave it.
    fn resolve(&self, filepath: &str) -> Option<PathBuf> {
        let relative = Path::new(filepath.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }
}

impl Endpoint for ServeDir {
    fn serve(&self, req: Request) -> BoxFuture<'static, Response> {
        let target = req.param("filepath").and_then(|p| self.resolve(p));
        Box::pin(async move {
            let Some(mut path) = target else {
                debug!(path = req.path(), "rejected file path");
                return Response::status(StatusCode::NOT_FOUND);
            };

            if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
                if !req.path().ends_with('/') {
                    let location = format!("{}/", req.path());
                    debug!(%location, "redirecting directory request");
                    return Response::builder()
                        .status(StatusCode::MOVED_PERMANENTLY)
                        .header("location", &location)
                        .no_body();
                }
                path.push("index.html");
            }

            match tokio::fs::read(&path).await {
                Ok(contents) => {
                    let content_type = path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map_or(ContentType::OctetStream, ContentType::from_extension);
                    Response::builder().bytes(content_type, contents)
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Response::status(StatusCode::NOT_FOUND)
                }
                Err(e) => {
                    warn!(path = %path.display(), "file read failed: {e}");
                    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        })
    }
}
