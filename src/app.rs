//! # Book Catalog Module
//!
//! This module is the service layer between transports (HTTP handlers, the
//! CLI) and the [`Database`]. Every write goes through draft normalization
//! here, ids and timestamps are assigned here, and rows are assembled into
//! full [`Book`] values with their tags.
//!
//! ## Core Asynchronous Functions
//!
//! - **create_book**: Validates a draft, assigns an id and timestamps, and persists it.
//! - **update_book**: Fully replaces title, author, tags and cover of an existing book.
//! - **remove_book**: Deletes a book and its tag rows.
//! - **find_book**: Loads one book with its tags.
//! - **query_books**: Runs a [`BookQuery`] and loads tags for every match in parallel.
//! - **tag_index**: Lists the distinct tags currently in use.
//!
//! ## Error Handling
//!
//! [`AppError`] separates the three failure kinds callers react to
//! differently: validation, a missing book, and store failures.

use crate::{
    book::{Book, BookDraft, ValidationErrors},
    database::{BookRecord, Database, DatabaseError},
    query::BookQuery,
};
use chrono::Utc;
use std::collections::HashMap;
use tokio::task::JoinSet;

/// Validates and stores a new book.
///
/// # Returns
///
/// The stored `Book` with its server-assigned id and timestamps, or
/// `AppError::Validation` if title or author is blank. Nothing is written
/// when validation fails.
pub async fn create_book(db: &Database, draft: BookDraft) -> Result<Book, AppError> {
    let draft = draft.normalize()?;
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    db.insert_book(&id, &draft, now).await?;

    tracing::info!(id = %id, title = %draft.title, tags = draft.tags.len(), "book created");

    Ok(Book {
        id,
        title: draft.title,
        author: draft.author,
        tags: draft.tags,
        cover_image: draft.cover_image,
        created_at: now,
        updated_at: now,
    })
}

/// Replaces the writable fields of the book with `id`.
///
/// Validation runs before the store is touched, so an invalid draft for a
/// missing id reports the validation failure.
pub async fn update_book(db: &Database, id: &str, draft: BookDraft) -> Result<Book, AppError> {
    let draft = draft.normalize()?;

    if !db.update_book(id, &draft, Utc::now()).await? {
        return Err(AppError::NotFound { id: id.to_string() });
    }

    tracing::info!(id, title = %draft.title, "book updated");

    find_book(db, id).await
}

/// Deletes the book with `id`.
pub async fn remove_book(db: &Database, id: &str) -> Result<(), AppError> {
    if !db.delete_book(id).await? {
        return Err(AppError::NotFound { id: id.to_string() });
    }

    tracing::info!(id, "book removed");

    Ok(())
}

/// Retrieves a full book, tags included.
pub async fn find_book(db: &Database, id: &str) -> Result<Book, AppError> {
    let record = db
        .find_book(id)
        .await?
        .ok_or_else(|| AppError::NotFound { id: id.to_string() })?;

    with_tags(db, record).await
}

/// Runs a search and returns matching books in the query's order.
///
/// Tags are loaded in parallel, one task per matching book.
pub async fn query_books(db: &Database, query: &BookQuery) -> Result<Vec<Book>, AppError> {
    let records = db.query_books(query).await?;
    let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

    let mut set = JoinSet::new();
    for record in records {
        let db = db.clone();
        set.spawn(async move {
            let book = with_tags(&db, record).await?;
            Ok::<Book, AppError>(book)
        });
    }

    let mut map = HashMap::new();
    while let Some(result) = set.join_next().await {
        match result {
            Ok(Ok(book)) => {
                map.insert(book.id.clone(), book);
            }
            Ok(Err(e)) => return Err(e),
            Err(join_err) => panic!("task panicked in book retrieval: {join_err}"),
        }
    }

    let books = ids.into_iter().filter_map(|id| map.remove(&id)).collect();

    Ok(books)
}

/// Distinct tags in use across all books, sorted.
pub async fn tag_index(db: &Database) -> Result<Vec<String>, AppError> {
    db.tag_index().await.map_err(AppError::from)
}

async fn with_tags(db: &Database, record: BookRecord) -> Result<Book, AppError> {
    let tags = db.get_tags(&record.id).await?;

    Ok(Book {
        id: record.id,
        title: record.title,
        author: record.author,
        tags,
        cover_image: record.cover_image,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Error types within the application, encapsulating validation, lookup and database errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("book not found: {id}")]
    NotFound { id: String },

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}
