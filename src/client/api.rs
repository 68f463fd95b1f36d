use crate::{
    book::{Book, BookDraft},
    query::BookQuery,
};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Message shown when a failure carries no server-provided explanation.
pub const GENERIC_FETCH_ERROR: &str = "Failed to reach the book catalog";

/// The REST surface the client components talk to.
#[async_trait]
pub trait BookApi: Send + Sync {
    /// `GET /api/books?search=&tag=&sort=`
    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>, ClientError>;

    /// `GET /api/books/{id}`
    async fn get_book(&self, id: &str) -> Result<Book, ClientError>;

    /// `POST /api/books`
    async fn create_book(&self, draft: &BookDraft) -> Result<Book, ClientError>;

    /// `PUT /api/books/{id}`
    async fn update_book(&self, id: &str, draft: &BookDraft) -> Result<Book, ClientError>;

    /// `DELETE /api/books/{id}`
    async fn delete_book(&self, id: &str) -> Result<(), ClientError>;

    /// `GET /api/books/tags`
    async fn tags(&self) -> Result<Vec<String>, ClientError>;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server responded {status}: {}", message.as_deref().unwrap_or("no details"))]
    Server { status: u16, message: Option<String> },

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// The text to put in front of a user: the server's own message when it
    /// sent one, a generic line otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_FETCH_ERROR.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Server { status: 404, .. })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`BookApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBookApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBookApi {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn books_url(&self) -> String {
        format!("{}/api/books", self.base_url)
    }

    /// `{base}/api/books/{id}` with `id` percent-encoded as one path segment.
    fn book_url(&self, id: &str) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.books_url())
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .push(id);

        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.error);

        tracing::debug!(status = status.as_u16(), ?message, "book api request failed");

        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl BookApi for HttpBookApi {
    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>, ClientError> {
        let mut params: Vec<(&str, &str)> = vec![("sort", query.sort.as_str())];
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("search", search));
        }
        if let Some(tag) = query.tag.as_deref().filter(|t| !t.trim().is_empty()) {
            params.push(("tag", tag));
        }

        self.send(self.client.get(self.books_url()).query(&params))
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)
    }

    async fn get_book(&self, id: &str) -> Result<Book, ClientError> {
        self.send(self.client.get(self.book_url(id)?))
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)
    }

    async fn create_book(&self, draft: &BookDraft) -> Result<Book, ClientError> {
        self.send(self.client.post(self.books_url()).json(draft))
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)
    }

    async fn update_book(&self, id: &str, draft: &BookDraft) -> Result<Book, ClientError> {
        self.send(self.client.put(self.book_url(id)?).json(draft))
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)
    }

    async fn delete_book(&self, id: &str) -> Result<(), ClientError> {
        self.send(self.client.delete(self.book_url(id)?)).await?;
        Ok(())
    }

    async fn tags(&self) -> Result<Vec<String>, ClientError> {
        self.send(self.client.get(format!("{}/tags", self.books_url())))
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)
    }
}
