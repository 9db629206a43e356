//! Route handlers and the unwind boundary they run behind.
//!
//! Every handler the router stores, whether a user closure, a 404/405 hook
//! or the file server, is an [`Endpoint`] behind a cloneable
//! [`BoxedHandler`]. [`BoxedHandler::invoke`] is the only way the router
//! runs one, so a panic anywhere in a handler comes back as a
//! [`HandlerFault`] value.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::HandlerFault;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Something that can answer a routed request.
#[doc(hidden)]
pub trait Endpoint: Send + Sync + 'static {
    fn serve(&self, req: Request) -> BoxFuture<'static, Response>;
}

/// Type-erased endpoint, shared by every request that matches its route.
#[doc(hidden)]
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn Endpoint>);

impl BoxedHandler {
    pub(crate) fn new(endpoint: impl Endpoint) -> Self {
        Self(Arc::new(endpoint))
    }

    /// Runs the endpoint to completion. A panic, whether raised while
    /// building the future or while polling it, becomes `Err`.
    pub(crate) async fn invoke(&self, req: Request) -> Result<Response, HandlerFault> {
        let method = req.method().clone();
        let path = req.path().to_owned();
        let endpoint = Arc::clone(&self.0);

        AssertUnwindSafe(async move { endpoint.serve(req).await })
            .catch_unwind()
            .await
            .map_err(|payload| HandlerFault {
                method,
                path,
                message: panic_message(payload.as_ref()),
            })
    }
}

/// Implemented for every valid route handler.
///
/// Any `async fn` or closure with this shape qualifies:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
pub trait Handler: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler::new(AsyncFn(self))
    }
}

struct AsyncFn<F>(F);

impl<F, Fut, R> Endpoint for AsyncFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve(&self, req: Request) -> BoxFuture<'static, Response> {
        (self.0)(req).map(R::into_response).boxed()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;

    fn request() -> Request {
        Request::new(Method::GET, "/boom")
    }

    #[tokio::test]
    async fn invoke_passes_responses_through() {
        let handler = (|_req: Request| async { "fine" }).into_boxed_handler();
        let res = handler.invoke(request()).await.unwrap();
        assert_eq!(res.body(), b"fine");
    }

    #[tokio::test]
    async fn panic_inside_the_future_becomes_a_fault() {
        let handler = (|_req: Request| async {
            if true {
                panic!("ada error");
            }
            "unreachable"
        })
        .into_boxed_handler();

        let fault = handler.invoke(request()).await.unwrap_err();
        assert_eq!(fault.method, Method::GET);
        assert_eq!(fault.path, "/boom");
        assert_eq!(fault.message, "ada error");
    }

    #[tokio::test]
    async fn panic_before_the_first_await_becomes_a_fault() {
        let handler = (|req: Request| -> futures::future::Ready<&'static str> {
            panic!("eager {}", req.path())
        })
        .into_boxed_handler();

        let fault = handler.invoke(request()).await.unwrap_err();
        assert_eq!(fault.message, "eager /boom");
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
