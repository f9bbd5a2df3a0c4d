//! # libris
//!
//! A small library REST API: create, read, update and delete books kept in a
//! single JSON file, with an OpenAPI description and Swagger UI.
//!
//! ## Layers
//!
//! - [`store`]: the in-memory collection and its JSON file, rewritten on
//!   every mutation
//! - [`service`]: request validation and id generation
//! - [`routes`]: the `/books` endpoints, docs, and health checks
//! - an HTTP layer on hyper: [`Router`] (radix-tree routing via
//!   [`matchit`]), [`Server`] (graceful shutdown on SIGTERM / Ctrl-C), and
//!   [`middleware`] for CORS and access logging
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use libris::{BookService, Config, Server, Store, routes};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), libris::Error> {
//!     let config = Config::from_env();
//!     let store = Store::load_all(&config.db_path)?;
//!     let app = routes::app(Arc::new(BookService::new(store)), &config);
//!
//!     Server::bind(config.socket_addr()).await?.serve(app).await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod book;
pub mod config;
pub mod docs;
pub mod health;
pub mod middleware;
pub mod routes;
pub mod service;
pub mod store;

pub use book::Book;
pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use request::{Rejection, Request};
pub use response::{ContentType, IntoResponse, Json, Response};
pub use router::Router;
pub use server::{MAX_BODY_BYTES, Server};
pub use service::{BookService, ServiceError};
pub use status::Status;
pub use store::{Store, StoreError};
