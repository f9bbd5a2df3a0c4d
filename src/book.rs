//! The book record and the validated shapes requests are turned into.
//!
//! A [`Book`] has three typed fields and an `extra` map for anything else the
//! client sent at creation or in a patch. On the wire and on disk the extra
//! fields sit beside `id`, `title` and `author` as ordinary JSON properties.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Length of a generated book id.
pub const ID_LEN: usize = 8;

/// URL-safe id alphabet: `A-Z`, `a-z`, `0-9`, `_` and `-`.
const ID_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// A stored book.
///
/// `title` and `author` default to empty when a stored record lacks them, so
/// a datastore written by a less strict service still loads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Book {
    /// Shallow merge: patch fields overwrite, unknown fields are added.
    pub fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        self.extra.extend(patch.extra);
    }
}

/// Draws a fresh [`ID_LEN`]-character id.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect()
}

/// Fields for a book that does not exist yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub extra: Map<String, Value>,
}

impl NewBook {
    /// Requires string `title` and `author`. A client-supplied `id` is dropped.
    pub fn from_fields(mut fields: Map<String, Value>) -> Result<Self, ValidationError> {
        fields.remove("id");
        let title = take_string(&mut fields, "title")?
            .ok_or_else(|| ValidationError::missing("title"))?;
        let author = take_string(&mut fields, "author")?
            .ok_or_else(|| ValidationError::missing("author"))?;
        Ok(Self { title, author, extra: fields })
    }

    pub fn with_id(self, id: String) -> Book {
        Book { id, title: self.title, author: self.author, extra: self.extra }
    }
}

/// A partial update. `id` is immutable, so a patch never carries one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub extra: Map<String, Value>,
}

impl BookPatch {
    /// `title` and `author`, when present, must be strings.
    pub fn from_fields(mut fields: Map<String, Value>) -> Result<Self, ValidationError> {
        fields.remove("id");
        let title = take_string(&mut fields, "title")?;
        let author = take_string(&mut fields, "author")?;
        Ok(Self { title, author, extra: fields })
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &'static str) -> Result<Option<String>, ValidationError> {
    match fields.remove(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ValidationError::not_a_string(key)),
    }
}

/// A request body that is well-formed JSON but not an acceptable book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    fn missing(field: &'static str) -> Self {
        Self { field, reason: "is required" }
    }

    fn not_a_string(field: &'static str) -> Self {
        Self { field, reason: "must be a string" }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn generated_ids_are_url_safe() {
        for _ in 0..200 {
            let id = generate_id();
            assert_eq!(id.len(), ID_LEN);
            assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)), "bad id {id}");
        }
    }

    #[test]
    fn new_book_requires_title_and_author() {
        let err = NewBook::from_fields(fields(json!({ "author": "A" }))).unwrap_err();
        assert_eq!(err, ValidationError::missing("title"));

        let err = NewBook::from_fields(fields(json!({ "title": "T" }))).unwrap_err();
        assert_eq!(err.to_string(), "`author` is required");

        let err = NewBook::from_fields(fields(json!({ "title": 7, "author": "A" }))).unwrap_err();
        assert_eq!(err.to_string(), "`title` must be a string");
    }

    #[test]
    fn new_book_drops_client_id_and_keeps_extras() {
        let new = NewBook::from_fields(fields(json!({
            "id": "mine",
            "title": "T",
            "author": "A",
            "year": 1993,
        })))
        .unwrap();
        let book = new.with_id("abcdefgh".into());
        assert_eq!(book.id, "abcdefgh");
        assert_eq!(book.extra.get("year"), Some(&json!(1993)));
        assert!(!book.extra.contains_key("id"));
    }

    #[test]
    fn patch_merges_shallowly() {
        let mut book = Book {
            id: "abcdefgh".into(),
            title: "T".into(),
            author: "A".into(),
            extra: fields(json!({ "year": 1993, "tags": ["cs"] })),
        };
        let patch = BookPatch::from_fields(fields(json!({
            "id": "other",
            "author": "B",
            "tags": ["classic"],
            "isbn": "0-7167-8271-5",
        })))
        .unwrap();
        book.apply(patch);

        assert_eq!(book.id, "abcdefgh");
        assert_eq!(book.title, "T");
        assert_eq!(book.author, "B");
        assert_eq!(book.extra["year"], json!(1993));
        assert_eq!(book.extra["tags"], json!(["classic"]));
        assert_eq!(book.extra["isbn"], json!("0-7167-8271-5"));
    }

    #[test]
    fn patch_rejects_non_string_author() {
        let err = BookPatch::from_fields(fields(json!({ "author": null }))).unwrap_err();
        assert_eq!(err, ValidationError::not_a_string("author"));
    }

    #[test]
    fn extras_serialise_beside_typed_fields() {
        let book = Book {
            id: "abcdefgh".into(),
            title: "T".into(),
            author: "A".into(),
            extra: fields(json!({ "year": 1993 })),
        };
        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value, json!({ "id": "abcdefgh", "title": "T", "author": "A", "year": 1993 }));
        let back: Book = serde_json::from_value(value).unwrap();
        assert_eq!(back, book);
    }
}
