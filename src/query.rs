//! Query module for building book searches.
//!
//! A [`BookQuery`] combines an optional title search, an optional tag filter
//! and a sort order. It renders to a SQL fragment (`WHERE … ORDER BY …`)
//! plus the ordered parameters to bind, leaving the surrounding `SELECT` to
//! the dialect.

use crate::dialect::{CurrentDialect, Dialect};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Represents a logical filter over books.
#[derive(Debug, Clone, PartialEq)]
pub enum BookQueryExpr {
    /// Title contains the given text, ignoring case.
    TitleContains(String),

    /// Tag list contains exactly the given tag.
    Tag(String),

    /// Logical AND of two subexpressions.
    And(Box<BookQueryExpr>, Box<BookQueryExpr>),
}

impl BookQueryExpr {
    pub fn title_contains<T: Into<String>>(text: T) -> Self {
        BookQueryExpr::TitleContains(text.into())
    }

    pub fn tag<T: Into<String>>(tag: T) -> Self {
        BookQueryExpr::Tag(tag.into())
    }

    /// Combines two expressions with a logical AND.
    pub fn and(self, other: BookQueryExpr) -> Self {
        BookQueryExpr::And(Box::new(self), Box::new(other))
    }

    /// Converts the expression into an SQL condition and its bound parameters.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let mut params = Vec::new();
        let sql = self.build_sql(&mut params);
        (sql, params)
    }

    fn build_sql(&self, params: &mut Vec<String>) -> String {
        match self {
            BookQueryExpr::TitleContains(text) => {
                // titles are folded on write, so fold the needle the same way
                params.push(fold_case(text));
                CurrentDialect::title_contains_query(params.len())
            }
            BookQueryExpr::Tag(tag) => {
                params.push(tag.clone());
                CurrentDialect::exists_tag_query(params.len())
            }
            BookQueryExpr::And(lhs, rhs) => {
                format!("({} AND {})", lhs.build_sql(params), rhs.build_sql(params))
            }
        }
    }
}

/// Direction of the title ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ParseSortOrderError(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid sort order '{0}', expected asc or desc")]
pub struct ParseSortOrderError(pub String);

/// A complete book search: filters plus ordering.
///
/// Blank search text or a blank tag mean "no filter" on that dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub sort: SortOrder,
}

impl BookQuery {
    /// Matches every book, sorted ascending by title.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_search<T: Into<String>>(mut self, search: T) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_tag<T: Into<String>>(mut self, tag: T) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// The filter expression, or `None` when every book matches.
    pub fn expr(&self) -> Option<BookQueryExpr> {
        let search = non_blank(self.search.as_deref()).map(BookQueryExpr::title_contains);
        let tag = non_blank(self.tag.as_deref()).map(BookQueryExpr::tag);

        match (search, tag) {
            (Some(s), Some(t)) => Some(s.and(t)),
            (s, t) => s.or(t),
        }
    }

    /// Builds the `WHERE` and `ORDER BY` clauses with their parameters.
    ///
    /// Equal titles keep insertion order regardless of direction.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let (mut sql, params) = match self.expr() {
            Some(expr) => {
                let (cond, params) = expr.to_sql();
                (format!("WHERE {}", cond), params)
            }
            None => (String::new(), vec![]),
        };

        if !sql.is_empty() {
            sql.push(' ');
        }
        sql.push_str(&CurrentDialect::order_by_title(self.sort));

        (sql, params)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Case folding used for title search, applied both on write and on query.
///
/// Folds one character at a time. `str::to_lowercase` picks the Greek final
/// sigma from context, which would make a substring fold differently from
/// the same text inside a longer title.
pub fn fold_case(text: &str) -> String {
    text.trim().chars().flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::{BookQuery, BookQueryExpr, CurrentDialect, Dialect, SortOrder, fold_case};

    #[test]
    fn test_fold_case_ignores_word_position() {
        assert_eq!("οδοσα", fold_case("ΟΔΟΣΑ"));
        assert_eq!("οδοσ", fold_case(" ΟΔΟΣ "));
        assert!(fold_case("ΟΔΟΣΑ").contains(&fold_case("ΟΔΟΣ")));
    }

    #[test]
    fn test_build_query() {
        let query = BookQuery::all()
            .with_search("  RuSt ")
            .with_tag("programming")
            .with_sort(SortOrder::Desc);

        let (sql, params) = query.to_sql();

        assert_eq!(
            format!(
                "WHERE ({} AND {}) {}",
                CurrentDialect::title_contains_query(1),
                CurrentDialect::exists_tag_query(2),
                CurrentDialect::order_by_title(SortOrder::Desc),
            ),
            sql
        );
        assert_eq!(vec!["rust", "programming"], params);
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = BookQuery::all().with_search("   ").with_tag("");

        assert_eq!(None, query.expr());
        assert_eq!(
            (CurrentDialect::order_by_title(SortOrder::Asc), vec![]),
            query.to_sql()
        );
    }

    #[test]
    fn test_single_filter() {
        assert_eq!(
            Some(BookQueryExpr::tag("sf")),
            BookQuery::all().with_tag("sf").expr()
        );
        assert_eq!(
            Some(BookQueryExpr::title_contains("dune")),
            BookQuery::all().with_search("dune").expr()
        );
    }

    #[test]
    fn test_parse_sort_order() {
        assert_eq!(Ok(SortOrder::Asc), "asc".parse());
        assert_eq!(Ok(SortOrder::Desc), "DESC".parse());
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!("desc", SortOrder::Desc.to_string());
    }
}
