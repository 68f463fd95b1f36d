//! Create/edit form for a single book.
//!
//! The form keeps raw user input (tags as one comma separated string, the
//! cover as a URL or an uploaded file) and turns it into a [`BookDraft`] only
//! at submit time. A failed submit leaves every field untouched so the user
//! can fix the problem and retry.

use super::api::{BookApi, ClientError};
use crate::{
    book::{Book, BookDraft, Field, ValidationErrors, join_tags, split_tags},
    cover::{self, CoverError},
};
use thiserror::Error;

/// Shown when a save fails without a server-provided message.
pub const GENERIC_SUBMIT_ERROR: &str = "Failed to save book";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CoverInput {
    #[default]
    None,
    Url(String),
    /// An uploaded file, already embedded as a data URI.
    Inline {
        file_name: Option<String>,
        data_uri: String,
    },
}

impl CoverInput {
    fn to_value(&self) -> Option<String> {
        match self {
            CoverInput::None => None,
            CoverInput::Url(url) => Some(url.clone()),
            CoverInput::Inline { data_uri, .. } => Some(data_uri.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookForm {
    pub mode: FormMode,
    pub title: String,
    pub author: String,
    /// Comma separated, e.g. `"sf, classic"`.
    pub tags_input: String,
    pub cover: CoverInput,
    errors: ValidationErrors,
    submit_error: Option<String>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ClientError,
    },
}

impl BookForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            author: String::new(),
            tags_input: String::new(),
            cover: CoverInput::None,
            errors: ValidationErrors::default(),
            submit_error: None,
        }
    }

    /// A form prefilled from an existing book.
    pub fn edit(book: &Book) -> Self {
        let cover = match &book.cover_image {
            None => CoverInput::None,
            Some(c) if cover::is_data_uri(c) => CoverInput::Inline {
                file_name: None,
                data_uri: c.clone(),
            },
            Some(c) => CoverInput::Url(c.clone()),
        };

        Self {
            mode: FormMode::Edit {
                id: book.id.clone(),
            },
            title: book.title.clone(),
            author: book.author.clone(),
            tags_input: join_tags(&book.tags),
            cover,
            ..Self::create()
        }
    }

    pub fn set_cover_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.cover = if url.trim().is_empty() {
            CoverInput::None
        } else {
            CoverInput::Url(url)
        };
    }

    /// Embeds an uploaded image file as the cover.
    ///
    /// On error the previous cover is kept.
    pub fn attach_upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), CoverError> {
        let data_uri = cover::encode_data_uri(bytes)?;
        self.cover = CoverInput::Inline {
            file_name: Some(file_name.to_string()),
            data_uri,
        };
        Ok(())
    }

    pub fn clear_cover(&mut self) {
        self.cover = CoverInput::None;
    }

    /// The draft as it would be submitted right now, without validation.
    pub fn draft(&self) -> BookDraft {
        BookDraft {
            title: self.title.clone(),
            author: self.author.clone(),
            tags: split_tags(&self.tags_input),
            cover_image: self.cover.to_value(),
        }
    }

    /// Runs client-side validation, recording per-field errors.
    pub fn validate(&mut self) -> Result<BookDraft, ValidationErrors> {
        match self.draft().normalize() {
            Ok(draft) => {
                self.errors = ValidationErrors::default();
                Ok(draft)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    pub fn field_error(&self, field: Field) -> Option<&str> {
        self.errors.get(field)
    }

    /// Error from the last failed submit, if any.
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Validates and sends the form.
    ///
    /// Invalid input never reaches the API. On any failure the form keeps
    /// its input and remembers the message to display.
    pub async fn submit(&mut self, api: &dyn BookApi) -> Result<Book, SubmitError> {
        let draft = self.validate().map_err(SubmitError::Invalid)?;

        let result = match &self.mode {
            FormMode::Create => api.create_book(&draft).await,
            FormMode::Edit { id } => api.update_book(id, &draft).await,
        };

        match result {
            Ok(book) => {
                self.submit_error = None;
                Ok(book)
            }
            Err(source) => {
                let message = match &source {
                    ClientError::Server {
                        message: Some(message),
                        ..
                    } => message.clone(),
                    _ => GENERIC_SUBMIT_ERROR.to_string(),
                };
                tracing::warn!(error = %source, "book form submit failed");
                self.submit_error = Some(message.clone());
                Err(SubmitError::Failed { message, source })
            }
        }
    }
}

impl Default for BookForm {
    fn default() -> Self {
        Self::create()
    }
}
