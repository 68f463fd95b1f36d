use super::{Db, Dialect};
use crate::query::SortOrder;

/// SQLite dialect implementation of the `Dialect` trait.
#[cfg(feature = "sqlite")]
pub struct SqliteDialect;

#[cfg(feature = "sqlite")]
impl Dialect for SqliteDialect {
    fn placeholder(_idx: usize) -> String {
        "?".to_string()
    }

    fn title_contains_query(idx: usize) -> String {
        format!("instr(books.title_folded, {}) > 0", Self::placeholder(idx))
    }

    fn order_by_title(sort: SortOrder) -> String {
        // default BINARY collation compares bytes, same as `str::cmp`
        match sort {
            SortOrder::Asc => "ORDER BY books.title ASC, books.rowid ASC".to_string(),
            SortOrder::Desc => "ORDER BY books.title DESC, books.rowid ASC".to_string(),
        }
    }

    async fn migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error> {
        let stmts = vec![
            r#"CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                title_folded TEXT NOT NULL,
                author TEXT NOT NULL,
                cover_image TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );"#,
            r#"CREATE TABLE IF NOT EXISTS book_tags (
                book_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                PRIMARY KEY (book_id, position),
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );"#,
            r#"CREATE INDEX IF NOT EXISTS book_tags_tag_name ON book_tags (tag_name);"#,
            r#"CREATE INDEX IF NOT EXISTS books_title ON books (title);"#,
        ];

        for stmt in stmts {
            sqlx::query(stmt).execute(pool).await?;
        }

        Ok(())
    }
}
