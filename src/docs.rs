//! Interactive API documentation.
//!
//! `GET /api-docs/openapi.json` serves an OpenAPI 3.0 description of the
//! book endpoints; `GET /api-docs` serves a Swagger UI page that renders it.
//! Both bodies are built once at startup.

use bytes::Bytes;
use serde_json::{Value, json};

use crate::request::Request;
use crate::response::{ContentType, Response};

pub const UI_PATH: &str = "/api-docs";
pub const SPEC_PATH: &str = "/api-docs/openapi.json";

/// Prebuilt documentation bodies, cloned cheaply per request.
#[derive(Clone)]
pub struct ApiDocs {
    spec: Bytes,
    ui: Bytes,
}

impl ApiDocs {
    pub fn new(server_url: &str) -> Self {
        let spec = openapi_document(server_url).to_string();
        Self { spec: Bytes::from(spec), ui: Bytes::from(swagger_ui_page(SPEC_PATH)) }
    }

    pub fn spec(&self, _req: Request) -> Response {
        Response::json(self.spec.clone())
    }

    pub fn ui(&self, _req: Request) -> Response {
        Response::builder().bytes(ContentType::Html, self.ui.clone())
    }
}

/// The OpenAPI 3.0 document for `/books`.
pub fn openapi_document(server_url: &str) -> Value {
    let book_ref = json!({ "$ref": "#/components/schemas/Book" });
    let id_param = json!({
        "in": "path",
        "name": "id",
        "schema": { "type": "string" },
        "required": true,
        "description": "The book id"
    });
    let error = json!({
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
    });
    let with_description = |description: &str| {
        let mut value = error.clone();
        value["description"] = json!(description);
        value
    };

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Library API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "A simple library API"
        },
        "servers": [{ "url": server_url }],
        "tags": [{ "name": "Books", "description": "The books managing API" }],
        "paths": {
            "/books": {
                "get": {
                    "summary": "Returns the list of all the books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "The list of the books",
                            "content": { "application/json": { "schema": { "type": "array", "items": book_ref } } }
                        }
                    }
                },
                "post": {
                    "summary": "Create a new book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": book_ref } }
                    },
                    "responses": {
                        "200": {
                            "description": "The book was successfully created",
                            "content": { "application/json": { "schema": book_ref } }
                        },
                        "400": with_description("Missing or invalid title/author, or a malformed body"),
                        "500": with_description("The datastore could not be written")
                    }
                }
            },
            "/books/{id}": {
                "get": {
                    "summary": "Get the book by id",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": {
                            "description": "The book description by id",
                            "content": { "application/json": { "schema": book_ref } }
                        },
                        "404": with_description("The book was not found")
                    }
                },
                "put": {
                    "summary": "Update the book by id",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "type": "object" } } }
                    },
                    "responses": {
                        "200": {
                            "description": "The book was updated",
                            "content": { "application/json": { "schema": book_ref } }
                        },
                        "400": with_description("A title or author that is not a string, or a malformed body"),
                        "404": with_description("The book was not found"),
                        "500": with_description("The datastore could not be written")
                    }
                },
                "delete": {
                    "summary": "Remove the book by id",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": { "description": "The book was deleted, or did not exist" },
                        "500": with_description("The datastore could not be written")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "required": ["title", "author"],
                    "additionalProperties": true,
                    "properties": {
                        "id": { "type": "string", "description": "The auto-generated id of the book", "readOnly": true },
                        "title": { "type": "string", "description": "The book title" },
                        "author": { "type": "string", "description": "The book author" }
                    },
                    "example": {
                        "id": "d5fE_asz",
                        "title": "The New Turing Omnibus",
                        "author": "Alexander K. Dewdney"
                    }
                },
                "Error": {
                    "type": "object",
                    "properties": { "error": { "type": "string" } }
                }
            }
        }
    })
}

fn swagger_ui_page(spec_url: &str) -> String {
    format!(
        r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Library API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
  </script>
</body>
</html>
"##
    )
}
