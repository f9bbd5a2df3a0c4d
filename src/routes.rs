//! The `/books` endpoints and the application router.
//!
//! | Method | Path | Success | Failure |
//! |---|---|---|---|
//! | GET | `/books` | 200, array of books | |
//! | GET | `/books/{id}` | 200, book | 404 |
//! | POST | `/books` | 200, created book | 400, 500 |
//! | PUT | `/books/{id}` | 200, updated book | 400, 404, 500 |
//! | DELETE | `/books/{id}` | 200, empty body | 500 |

use std::future::{Future, ready};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::error;

use crate::book::Book;
use crate::config::Config;
use crate::docs::{self, ApiDocs};
use crate::handler::Handler;
use crate::health;
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response, error_body};
use crate::router::Router;
use crate::service::{BookService, ServiceError};
use crate::status::Status;

/// Builds the full application: book endpoints, docs, and health checks.
pub fn app(books: Arc<BookService>, config: &Config) -> Router {
    let api_docs = ApiDocs::new(&config.public_url());
    let spec = api_docs.clone();

    Router::new()
        .get("/books", with(Arc::clone(&books), list_books))
        .post("/books", with(Arc::clone(&books), create_book))
        .get("/books/{id}", with(Arc::clone(&books), get_book))
        .put("/books/{id}", with(Arc::clone(&books), update_book))
        .delete("/books/{id}", with(Arc::clone(&books), delete_book))
        .get(docs::UI_PATH, move |req: Request| ready(api_docs.ui(req)))
        .get(docs::SPEC_PATH, move |req: Request| ready(spec.spec(req)))
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness)
}

/// Adapts a handler that needs the service into a plain [`Handler`].
fn with<F, Fut, R>(books: Arc<BookService>, handler: F) -> impl Handler
where
    F: Fn(Arc<BookService>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    move |req: Request| handler(Arc::clone(&books), req)
}

fn id_param(req: &Request) -> String {
    req.param("id").unwrap_or_default().to_owned()
}

/// Runs a service call on tokio's blocking pool.
///
/// Mutations write and fsync the datastore while holding its lock; off the
/// runtime workers, other requests keep being polled meanwhile.
async fn blocking<T, F>(books: Arc<BookService>, call: F) -> Result<T, Response>
where
    F: FnOnce(&BookService) -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(move || call(&books)).await {
        Ok(result) => result.map_err(Response::from),
        Err(e) => {
            error!("book service call did not complete: {e}");
            Err(error_body(Status::InternalServerError, "internal error"))
        }
    }
}

async fn list_books(books: Arc<BookService>, _req: Request) -> Result<Json<Vec<Book>>, Response> {
    blocking(books, |books| Ok(books.list_books())).await.map(Json)
}

async fn get_book(books: Arc<BookService>, req: Request) -> Result<Json<Book>, Response> {
    let id = id_param(&req);
    blocking(books, move |books| books.get_book(&id)).await.map(Json)
}

async fn create_book(books: Arc<BookService>, req: Request) -> Result<Json<Book>, Response> {
    let fields: Map<String, Value> = req.json()?;
    blocking(books, move |books| books.create_book(fields)).await.map(Json)
}

async fn update_book(books: Arc<BookService>, req: Request) -> Result<Json<Book>, Response> {
    let id = id_param(&req);
    let fields: Map<String, Value> = req.json()?;
    blocking(books, move |books| books.update_book(&id, fields)).await.map(Json)
}

async fn delete_book(books: Arc<BookService>, req: Request) -> Result<Status, Response> {
    let id = id_param(&req);
    blocking(books, move |books| books.delete_book(&id)).await?;
    Ok(Status::Ok)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => Status::NotFound,
            Self::Validation(_) => Status::BadRequest,
            Self::Store(e) => {
                error!("datastore write failed: {e}");
                Status::InternalServerError
            }
        };
        error_body(status, self)
    }
}

impl From<ServiceError> for Response {
    fn from(e: ServiceError) -> Self {
        e.into_response()
    }
}
