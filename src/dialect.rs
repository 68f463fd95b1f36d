//! # SQL Dialect Module
//!
//! This module defines the `Dialect` trait, which keeps every piece of SQL text
//! used by the book store in one place. Higher-level code (the query builder and
//! [`crate::database::Database`]) asks the dialect for statements instead of
//! formatting SQL itself.
//!
//! The dialect in use is chosen at compile time by feature flags. When the
//! `sqlite` feature is enabled, `CurrentDialect` is `sqlite::SqliteDialect`.

#[cfg(feature = "sqlite")]
mod sqlite;

use crate::query::SortOrder;

/// The current SQL dialect used at compile time, determined by feature flags.
#[cfg(feature = "sqlite")]
pub type CurrentDialect = sqlite::SqliteDialect;

#[cfg(feature = "sqlite")]
pub type Db = sqlx::Sqlite;

#[cfg(feature = "sqlite")]
pub type CurrentRow = sqlx::sqlite::SqliteRow;

/// A trait for SQL dialects to support database-specific query generation.
pub trait Dialect {
    /// Returns the SQL placeholder syntax for the given 1-based parameter index.
    fn placeholder(idx: usize) -> String;

    /// Condition matching books whose folded title contains the bound text.
    fn title_contains_query(idx: usize) -> String;

    /// Returns a SQL `EXISTS` subquery checking that a book carries a given tag.
    fn exists_tag_query(idx: usize) -> String {
        format!(
            "EXISTS (SELECT 1 FROM book_tags WHERE book_tags.book_id = books.id AND book_tags.tag_name = {})",
            Self::placeholder(idx)
        )
    }

    /// Returns the `ORDER BY` clause for the given direction.
    ///
    /// Books with equal titles must come back in insertion order for
    /// both directions.
    fn order_by_title(sort: SortOrder) -> String;

    fn insert_book_statement() -> String {
        format!(
            r#"INSERT INTO books
            (id, title, title_folded, author, cover_image, created_at, updated_at)
            VALUES ({}, {}, {}, {}, {}, {}, {})"#,
            Self::placeholder(1),
            Self::placeholder(2),
            Self::placeholder(3),
            Self::placeholder(4),
            Self::placeholder(5),
            Self::placeholder(6),
            Self::placeholder(7),
        )
    }

    /// Replaces the writable columns of a book. `created_at` is left untouched.
    fn update_book_statement() -> String {
        format!(
            r#"UPDATE books
            SET title = {}, title_folded = {}, author = {}, cover_image = {}, updated_at = {}
            WHERE id = {}"#,
            Self::placeholder(1),
            Self::placeholder(2),
            Self::placeholder(3),
            Self::placeholder(4),
            Self::placeholder(5),
            Self::placeholder(6),
        )
    }

    fn delete_book_statement() -> String {
        format!("DELETE FROM books WHERE id = {}", Self::placeholder(1))
    }

    /// Inserts one `(book_id, position, tag_name)` row. Positions keep the
    /// submitted order and let the same tag appear twice on one book.
    fn insert_book_tag_statement() -> String {
        format!(
            "INSERT INTO book_tags (book_id, position, tag_name) VALUES ({}, {}, {})",
            Self::placeholder(1),
            Self::placeholder(2),
            Self::placeholder(3),
        )
    }

    fn delete_tags_by_book_statement() -> String {
        format!(
            "DELETE FROM book_tags WHERE book_id = {}",
            Self::placeholder(1)
        )
    }

    /// Returns a full SELECT statement for retrieving books that match
    /// the given condition clause.
    ///
    /// # Parameters
    /// - `condition`: The SQL fragment generated by the query module.
    fn query_book_statement(condition: String) -> String {
        format!(
            "SELECT id, title, author, cover_image, created_at, updated_at FROM books {}",
            condition
        )
    }

    fn find_book_statement() -> String {
        format!(
            "SELECT id, title, author, cover_image, created_at, updated_at FROM books WHERE id = {}",
            Self::placeholder(1)
        )
    }

    /// Returns the SQL statement to retrieve the tags of one book in order.
    fn query_tags_by_book_statement() -> String {
        format!(
            "SELECT tag_name FROM book_tags WHERE book_id = {} ORDER BY position",
            Self::placeholder(1)
        )
    }

    /// Distinct tags in use across all books, sorted.
    fn tag_index_statement() -> &'static str {
        "SELECT DISTINCT tag_name FROM book_tags ORDER BY tag_name"
    }

    /// Creates the schema if it does not exist yet.
    async fn migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error>;
}
