//! Handler trait and type erasure.
//!
//! # Why handlers are erased
//!
//! Every route handler is its own type: each `async fn` and each closure
//! capturing an `Arc<BookService>` is a distinct, unnameable type. The router
//! still has to keep all of them in one table per method, so each handler is
//! wrapped in [`FnHandler`] and stored behind the [`ErasedHandler`] trait
//! object.
//!
//! ```text
//! async fn get_book(books, req) -> Result<Json<Book>, Response>
//!        ↓ with(books, get_book)                       ← closure capturing the service
//! move |req: Request| get_book(Arc::clone(&books), req)
//!        ↓ router.get("/books/{id}", …)
//! closure.into_boxed_handler()                         ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(closure))                         ← stored as BoxedHandler
//!        ↓ per request
//! handler.call(req)                                    ← one vtable dispatch
//!        ↓
//! Box::pin(async { fut.await.into_response() })        ← BoxFuture
//! ```
//!
//! A request costs one `Arc` clone of the matched handler, one virtual call
//! and one boxed future. Nothing here knows about books: any
//! `Fn(Request) -> impl Future<Output = impl IntoResponse>` is a handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` so hyper can poll it from any tokio worker.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler, shared by every connection that routes to it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function or closure of the shape
/// `Fn(Request) -> impl Future<Output = impl IntoResponse>`. The trait is
/// sealed, so the blanket impl below is the only way to get it and a handler
/// with the wrong signature fails at the `router.get(..)` call site.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the trait-object world. The handler's
/// own return type is turned into a [`Response`] inside the boxed future.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
