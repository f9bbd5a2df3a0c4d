//! JSON-file record store.
//!
//! The whole collection lives in memory and is written back as a single
//! document, `{ "books": [ ... ] }`, after every mutation:
//!
//! ```json
//! {
//!   "books": [
//!     { "id": "d5fE_asz", "title": "The New Turing Omnibus", "author": "Alexander K. Dewdney" }
//!   ]
//! }
//! ```
//!
//! Every mutation runs under one lock: clone the collection, change the
//! clone, flush it, and only then replace the in-memory copy. A failed flush
//! leaves memory exactly as it was and fails that one request.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::book::{Book, BookPatch};

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    books: Vec<Book>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    books: &'a [Book],
}

/// Owner of the book collection and its backing file.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    books: Mutex<Vec<Book>>,
}

impl Store {
    /// Loads the collection from `path`.
    ///
    /// A missing file is an empty collection. A file that exists but does not
    /// parse is [`StoreError::Corrupt`].
    pub fn load_all(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let books = match fs::read(&path) {
            Ok(bytes) => {
                let doc: Document = serde_json::from_slice(&bytes)
                    .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;
                doc.books
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no datastore yet, starting empty");
                Vec::new()
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(Self { path, books: Mutex::new(books) })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The whole collection in insertion order.
    pub fn get_all(&self) -> Vec<Book> {
        self.lock().clone()
    }

    /// First book whose id equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<Book> {
        self.lock().iter().find(|b| b.id == id).cloned()
    }

    /// Adds `book` at the end and flushes.
    pub fn append(&self, book: Book) -> Result<(), StoreError> {
        let mut books = self.lock();
        let mut staged = books.clone();
        staged.push(book);
        write_document(&self.path, &staged)?;
        *books = staged;
        Ok(())
    }

    /// Merges `patch` into the first book with a matching id and flushes.
    /// `Ok(None)` when no book matches; the file is left untouched.
    pub fn update_by_id(&self, id: &str, patch: BookPatch) -> Result<Option<Book>, StoreError> {
        let mut books = self.lock();
        let Some(pos) = books.iter().position(|b| b.id == id) else {
            return Ok(None);
        };
        let mut staged = books.clone();
        staged[pos].apply(patch);
        let updated = staged[pos].clone();
        write_document(&self.path, &staged)?;
        *books = staged;
        Ok(Some(updated))
    }

    /// Removes the first book with a matching id and flushes. Returns whether
    /// a book was removed; a miss is not an error.
    pub fn remove_by_id(&self, id: &str) -> Result<bool, StoreError> {
        let mut books = self.lock();
        let Some(pos) = books.iter().position(|b| b.id == id) else {
            return Ok(false);
        };
        let mut staged = books.clone();
        staged.remove(pos);
        write_document(&self.path, &staged)?;
        *books = staged;
        Ok(true)
    }

    /// Rewrites the file from the in-memory collection, e.g. to recreate a
    /// datastore file that was removed while the service was running.
    pub fn flush(&self) -> Result<(), StoreError> {
        let books = self.lock();
        write_document(&self.path, &books)
    }

    // A panic while holding the lock happens before the staged swap, so the
    // collection behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<Book>> {
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Replaces the file at `path` via a sibling temp file and rename.
///
/// On failure the temp file is removed and `path` keeps its previous
/// contents. After the rename the parent directory is fsynced so the new
/// directory entry survives a crash.
fn write_document(path: &Path, books: &[Book]) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(&DocumentRef { books }).map_err(StoreError::Encode)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = replace_with(&tmp, path, &bytes) {
        // The write error is the one worth reporting.
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::Io(e));
    }
    sync_parent_dir(path);

    debug!(path = %path.display(), books = books.len(), "flushed datastore");
    Ok(())
}

fn replace_with(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(tmp, path)
}

// Best effort: some platforms and filesystems cannot open or sync a directory.
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
}

/// Errors from loading or flushing the datastore.
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Corrupt { path: PathBuf, source: serde_json::Error },
    Encode(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Corrupt { path, source } => {
                write!(f, "datastore {} is not valid: {source}", path.display())
            }
            Self::Encode(e) => write!(f, "failed to encode datastore: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Corrupt { source, .. } => Some(source),
            Self::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
