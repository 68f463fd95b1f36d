//! Book records and the normalization rules every write goes through.
//!
//! A [`Book`] is what the store hands back; a [`BookDraft`] is what callers
//! submit when creating or replacing one. Drafts are validated and
//! normalized with [`BookDraft::normalize`] before they ever reach SQL, so
//! the store can rely on trimmed, non-empty titles and authors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A persisted catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Server-assigned opaque identifier.
    pub id: String,
    pub title: String,
    pub author: String,
    /// Tags in submitted order. Duplicates are kept.
    pub tags: Vec<String>,
    /// Either a URL or an inline `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The writable part of a book, as submitted by a form or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl BookDraft {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<T: IntoIterator<Item = String>>(mut self, tags: T) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_cover_image(mut self, cover: impl Into<String>) -> Self {
        self.cover_image = Some(cover.into());
        self
    }

    /// Validates the draft and returns its normalized form.
    ///
    /// Title and author are trimmed and must be non-empty. Tags are trimmed
    /// and blank ones dropped, keeping order and duplicates. A blank cover
    /// image becomes `None`.
    pub fn normalize(self) -> Result<BookDraft, ValidationErrors> {
        let title = self.title.trim().to_string();
        let author = self.author.trim().to_string();

        let mut errors = ValidationErrors::default();
        if title.is_empty() {
            errors.push(Field::Title, "Title is required");
        }
        if author.is_empty() {
            errors.push(Field::Author, "Author is required");
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let tags = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let cover_image = self
            .cover_image
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(BookDraft {
            title,
            author,
            tags,
            cover_image,
        })
    }
}

/// Splits a comma separated tag string into trimmed, non-empty tags.
///
/// Order and duplicates are preserved: `"a, b, b"` yields `["a", "b", "b"]`.
pub fn split_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Joins tags back into the comma separated form used by text inputs.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

/// Fields of a [`BookDraft`] that carry validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Author,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Title => write!(f, "title"),
            Field::Author => write!(f, "author"),
        }
    }
}

/// Per-field validation failures, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(Vec<(Field, String)>);

impl ValidationErrors {
    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Field, String)> {
        self.0.iter()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|(_, m)| m.as_str()).collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags_keeps_duplicates() {
        assert_eq!(vec!["a", "b", "b"], split_tags("a, b, b"));
        assert_eq!(vec!["sci-fi", "classic"], split_tags(" sci-fi ,, classic ,"));
        assert!(split_tags("  ,  ").is_empty());
    }

    #[test]
    fn test_normalize_trims_fields() {
        let draft = BookDraft::new("  Dune ", " Frank Herbert")
            .with_tags(["  sf ".to_string(), "".to_string(), "sf".to_string()])
            .with_cover_image("   ");

        let normalized = draft.normalize().unwrap();

        assert_eq!("Dune", normalized.title);
        assert_eq!("Frank Herbert", normalized.author);
        assert_eq!(vec!["sf", "sf"], normalized.tags);
        assert_eq!(None, normalized.cover_image);
    }

    #[test]
    fn test_normalize_rejects_blank_required_fields() {
        let errors = BookDraft::new(" ", "").normalize().unwrap_err();

        assert_eq!(Some("Title is required"), errors.get(Field::Title));
        assert_eq!(Some("Author is required"), errors.get(Field::Author));
        assert_eq!("Title is required, Author is required", errors.to_string());
    }

    #[test]
    fn test_book_serializes_camel_case() {
        let now = Utc::now();
        let book = Book {
            id: "1".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            tags: vec![],
            cover_image: Some("https://example.com/dune.jpg".to_string()),
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&book).unwrap();

        assert_eq!("https://example.com/dune.jpg", value["coverImage"]);
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
    }

    #[test]
    fn test_draft_defaults_missing_fields() {
        let draft: BookDraft = serde_json::from_str(r#"{"title":"Dune"}"#).unwrap();

        assert_eq!("", draft.author);
        assert!(draft.tags.is_empty());
        assert_eq!(None, draft.cover_image);
    }
}
