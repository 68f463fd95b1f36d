use crate::{
    book::BookDraft,
    dialect::{CurrentDialect, CurrentRow, Dialect},
    query::{BookQuery, fold_case},
};
use chrono::{DateTime, Utc};
pub use sqlx::Pool;
use sqlx::{Execute, FromRow, Row, migrate::MigrateDatabase};
use std::{path::Path, str::FromStr};
use thiserror::Error;

pub use crate::dialect::Db;

pub async fn run_migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error> {
    CurrentDialect::migration(pool).await
}

/// A book row without its tags.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn parse_timestamp(row: &CurrentRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;

    DateTime::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl FromRow<'_, CurrentRow> for BookRecord {
    fn from_row(row: &CurrentRow) -> Result<Self, sqlx::Error> {
        Ok(BookRecord {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            cover_image: row.try_get("cover_image")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }
}

/// A database abstraction for storing and querying books and their tags.
///
/// This struct wraps an SQLx connection pool and provides high-level methods
/// to insert, replace, remove and search books. Every write touching both
/// `books` and `book_tags` runs in one transaction. The implementation is SQL
/// dialect agnostic and delegates syntax to `Dialect`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Db>,
}

impl Database {
    pub async fn with_migration(pool: sqlx::Pool<Db>) -> Result<Self, sqlx::Error> {
        run_migration(&pool).await?;

        Ok(Self { pool })
    }

    /// Opens the database at `url`, creating the file (and its directory)
    /// when missing, and runs migrations.
    pub async fn open(url: &str) -> Result<Self, sqlx::Error> {
        if let Some(path) = sqlite_file_path(url) {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        if !Db::database_exists(url).await? {
            tracing::info!(url, "creating database");
            Db::create_database(url).await?;
        }

        Self::with_migration(Pool::connect(url).await?).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn retry<F, Fut, T>(&self, mut op: F) -> Result<T, DatabaseError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, DatabaseError>>,
    {
        let max_retries = 3;
        for attempt in 0..max_retries {
            let result = op().await;
            match result {
                Ok(v) => return Ok(v),
                Err(ref e) if e.is_retryable() && attempt + 1 < max_retries => {
                    tracing::warn!(error = %e, attempt, "retrying database operation");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("Retry loop should return before exceeding max_retries")
    }

    /// Inserts a new book together with its tags.
    ///
    /// The draft is expected to be normalized already. `now` is used for both
    /// `created_at` and `updated_at`.
    pub async fn insert_book(
        &self,
        id: &str,
        draft: &BookDraft,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let stmt_book = CurrentDialect::insert_book_statement();
        let timestamp = now.to_rfc3339();

        self.retry(|| async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            sqlx::query(&stmt_book)
                .bind(id)
                .bind(&draft.title)
                .bind(fold_case(&draft.title))
                .bind(&draft.author)
                .bind(draft.cover_image.as_deref())
                .bind(&timestamp)
                .bind(&timestamp)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::InsertBook { id: id.to_string() },
                    sql: stmt_book.to_string(),
                    source: e,
                })?;

            insert_tags(&mut tx, id, &draft.tags).await?;

            tx.commit()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })
        })
        .await?;

        Ok(())
    }

    /// Replaces title, author, cover and tags of an existing book.
    ///
    /// Returns `false` if no book with `id` exists; nothing is written then.
    pub async fn update_book(
        &self,
        id: &str,
        draft: &BookDraft,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let stmt_book = CurrentDialect::update_book_statement();
        let stmt_tags = CurrentDialect::delete_tags_by_book_statement();
        let timestamp = now.to_rfc3339();

        self.retry(|| async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            let updated = sqlx::query(&stmt_book)
                .bind(&draft.title)
                .bind(fold_case(&draft.title))
                .bind(&draft.author)
                .bind(draft.cover_image.as_deref())
                .bind(&timestamp)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::UpdateBook { id: id.to_string() },
                    sql: stmt_book.to_string(),
                    source: e,
                })?
                .rows_affected();

            if updated == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| DatabaseError::TransactionFailed { source: e })?;
                return Ok(false);
            }

            sqlx::query(&stmt_tags)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::DeleteBookTags { id: id.to_string() },
                    sql: stmt_tags.to_string(),
                    source: e,
                })?;

            insert_tags(&mut tx, id, &draft.tags).await?;

            tx.commit()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            Ok(true)
        })
        .await
    }

    /// Removes a book and all its tag rows.
    ///
    /// Returns `false` if no book with `id` existed.
    pub async fn delete_book(&self, id: &str) -> Result<bool, DatabaseError> {
        let stmt_tags = CurrentDialect::delete_tags_by_book_statement();
        let stmt_book = CurrentDialect::delete_book_statement();

        self.retry(|| async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            sqlx::query(&stmt_tags)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::DeleteBookTags { id: id.to_string() },
                    sql: stmt_tags.to_string(),
                    source: e,
                })?;

            let deleted = sqlx::query(&stmt_book)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::DeleteBook { id: id.to_string() },
                    sql: stmt_book.to_string(),
                    source: e,
                })?
                .rows_affected();

            tx.commit()
                .await
                .map_err(|e| DatabaseError::TransactionFailed { source: e })?;

            Ok(deleted > 0)
        })
        .await
    }

    pub async fn find_book(&self, id: &str) -> Result<Option<BookRecord>, DatabaseError> {
        let stmt = CurrentDialect::find_book_statement();

        self.retry(|| async {
            sqlx::query_as(&stmt)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::FindBook { id: id.to_string() },
                    sql: stmt.to_string(),
                    source: e,
                })
        })
        .await
    }

    /// Performs a filtered, ordered search using a [`BookQuery`].
    ///
    /// Returns matching book rows in the requested order; tags are loaded
    /// separately with [`Database::get_tags`].
    pub async fn query_books(&self, query: &BookQuery) -> Result<Vec<BookRecord>, DatabaseError> {
        let (sql, params) = query.to_sql();
        let stmt = CurrentDialect::query_book_statement(sql);

        self.retry(|| async {
            let mut q = sqlx::query_as::<_, BookRecord>(&stmt);

            for param in &params {
                q = q.bind(param);
            }

            let sql = q.sql().to_string();
            q.fetch_all(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::QueryBooks,
                    sql,
                    source: e,
                })
        })
        .await
    }

    /// Returns the tags of the given book in their stored order.
    ///
    /// If no tags exist, returns an empty vector.
    pub async fn get_tags(&self, id: &str) -> Result<Vec<String>, DatabaseError> {
        let stmt = CurrentDialect::query_tags_by_book_statement();

        self.retry(|| async {
            sqlx::query_scalar(&stmt)
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::QueryBookTags { id: id.to_string() },
                    sql: stmt.to_string(),
                    source: e,
                })
        })
        .await
    }

    /// Distinct tags currently attached to at least one book, sorted.
    pub async fn tag_index(&self) -> Result<Vec<String>, DatabaseError> {
        let stmt = CurrentDialect::tag_index_statement();

        self.retry(|| async {
            sqlx::query_scalar(stmt)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DatabaseError::QueryFailed {
                    operation: DbOperation::QueryTagIndex,
                    sql: stmt.to_string(),
                    source: e,
                })
        })
        .await
    }
}

async fn insert_tags(
    tx: &mut sqlx::Transaction<'_, Db>,
    id: &str,
    tags: &[String],
) -> Result<(), DatabaseError> {
    let stmt = CurrentDialect::insert_book_tag_statement();

    for (position, tag) in tags.iter().enumerate() {
        sqlx::query(&stmt)
            .bind(id)
            .bind(position as i64)
            .bind(tag)
            .execute(&mut **tx)
            .await
            .map_err(|e| DatabaseError::QueryFailed {
                operation: DbOperation::InsertBookTag {
                    id: id.to_string(),
                    tag: tag.clone(),
                },
                sql: stmt.to_string(),
                source: e,
            })?;
    }

    Ok(())
}

/// Extracts the file path from a `sqlite:` URL, or `None` for in-memory databases.
fn sqlite_file_path(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

/// Represents errors that can occur during database operations.
///
/// Each variant includes contextual information to assist with debugging and error handling.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A general SQL query failure, with full context including operation and SQL.
    #[error("Query failed during {operation:?}: sql={sql}")]
    QueryFailed {
        operation: DbOperation,
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// A failure to begin or commit a transaction.
    #[error("Failed to operate transaction")]
    TransactionFailed {
        #[source]
        source: sqlx::Error,
    },
}

/// Enum representing the kind of database operation being performed,
/// used for attaching context to [`DatabaseError::QueryFailed`].
#[derive(Debug)]
pub enum DbOperation {
    /// INSERT INTO books
    InsertBook { id: String },
    /// INSERT INTO book_tags
    InsertBookTag { id: String, tag: String },
    /// UPDATE books SET ...
    UpdateBook { id: String },
    /// DELETE FROM books WHERE ...
    DeleteBook { id: String },
    /// DELETE FROM book_tags WHERE book_id = ...
    DeleteBookTags { id: String },
    /// SELECT ... FROM books WHERE id = ...
    FindBook { id: String },
    /// SELECT tag_name FROM book_tags WHERE book_id = ...
    QueryBookTags { id: String },
    /// Book search using dynamic conditions
    QueryBooks,
    /// SELECT DISTINCT tag_name FROM book_tags
    QueryTagIndex,
}

impl DatabaseError {
    fn is_retryable(&self) -> bool {
        let is_retryable_kind = |e: &sqlx::Error| {
            matches!(e, sqlx::Error::Io(_))
                || matches!(e, sqlx::Error::Protocol(_))
                || matches!(e, sqlx::Error::PoolTimedOut)
        };

        match self {
            DatabaseError::QueryFailed {
                sql: _,
                source,
                operation: _,
            } => is_retryable_kind(source),
            DatabaseError::TransactionFailed { source } => is_retryable_kind(source),
        }
    }
}
