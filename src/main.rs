//! `libris` server binary.
//!
//! ```text
//! PORT=4004 LIBRIS_DB=db.json RUST_LOG=info libris
//! curl -X POST localhost:4004/books -H 'content-type: application/json' \
//!      -d '{"title":"The New Turing Omnibus","author":"Alexander K. Dewdney"}'
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use libris::{BookService, Config, Server, Store, routes};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), libris::Error> {
    let config = Config::from_env();

    let store = Store::load_all(&config.db_path)?;
    info!(path = %config.db_path.display(), books = store.len(), "datastore loaded");

    let app = routes::app(Arc::new(BookService::new(store)), &config);
    let server = Server::bind(config.socket_addr()).await?;
    info!(docs = %format!("{}/api-docs", config.public_url()), "api documentation available");

    server.serve(app).await
}
