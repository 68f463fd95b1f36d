//! # Personal Book Catalog
//!
//! This crate provides everything behind a small book-cataloging application:
//! the book model, a SQLite-backed store, the service functions used by the
//! HTTP server and the CLI, and the client-side components (API client,
//! collection view, edit form) that consume the REST API.
//!
//! ## Features
//!
//! - **Catalog management**: Create, edit and delete books with a title, an
//!   author, free-form tags and an optional cover image.
//! - **Search**: Case-insensitive title search, exact tag filtering and
//!   ascending/descending title ordering.
//! - **Tag index**: The distinct, sorted set of tags in use, derived on demand
//!   so it never lists a tag no book carries.
//! - **Inline covers**: Uploaded cover images are embedded as data URIs.
//!
//! ## Usage
//!
//! ```no_run
//! use shelf::prelude::*;
//!
//! async fn catalog(db: &Database) -> Result<(), AppError> {
//!     let draft = BookDraft::new("Dune", "Frank Herbert")
//!         .with_tags(split_tags("sf, classic"));
//!     let book = create_book(db, draft).await?;
//!
//!     let found = query_books(db, &BookQuery::all().with_search("dune")).await?;
//!     assert_eq!(found[0].id, book.id);
//!
//!     println!("tags in use: {:?}", tag_index(db).await?);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod book;
pub mod client;
pub mod config;
pub mod cover;
pub mod database;
mod dialect;
pub mod query;
pub mod telemetry;

pub mod prelude {
    pub use crate::app::{
        AppError, create_book, find_book, query_books, remove_book, tag_index, update_book,
    };
    pub use crate::book::{Book, BookDraft, Field, ValidationErrors, join_tags, split_tags};
    pub use crate::cover::{CoverError, encode_data_uri};
    pub use crate::database::{Database, DatabaseError};
    pub use crate::query::{BookQuery, SortOrder};
}
