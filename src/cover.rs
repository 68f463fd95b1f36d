//! Inline cover images.
//!
//! Uploaded covers are not stored as separate files: their bytes are
//! embedded in the book record as a `data:` URI. The MIME type is guessed
//! from the content rather than trusted from a file name.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Encodes raw image bytes as a `data:<mime>;base64,<payload>` URI.
///
/// # Errors
/// - `CoverError::Empty` if `bytes` is empty.
/// - `CoverError::UnsupportedFile` if the content is not a recognizable image.
pub fn encode_data_uri(bytes: &[u8]) -> Result<String, CoverError> {
    if bytes.is_empty() {
        return Err(CoverError::Empty);
    }

    let kind = infer::get(bytes).ok_or(CoverError::UnsupportedFile { mime: None })?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(CoverError::UnsupportedFile {
            mime: Some(kind.mime_type().to_string()),
        });
    }

    Ok(format!(
        "data:{};base64,{}",
        kind.mime_type(),
        STANDARD.encode(bytes)
    ))
}

/// Returns true if the cover is embedded rather than linked.
pub fn is_data_uri(cover: &str) -> bool {
    cover.starts_with("data:")
}

#[derive(Debug, Error, PartialEq)]
pub enum CoverError {
    #[error("cover image is empty")]
    Empty,

    #[error("unsupported cover image type: {}", mime.as_deref().unwrap_or("unknown"))]
    UnsupportedFile { mime: Option<String> },
}
