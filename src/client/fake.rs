//! In-memory [`BookApi`] for exercising client components without a server.

use super::api::{BookApi, ClientError};
use crate::{
    book::{Book, BookDraft},
    query::{BookQuery, SortOrder, fold_case},
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Default)]
pub struct FakeBookApi {
    books: Mutex<Vec<Book>>,
    delays: HashMap<String, Duration>,
    list_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeBookApi {
    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: Mutex::new(books),
            ..Default::default()
        }
    }

    /// Delays list responses for the given search text.
    pub fn with_delay(mut self, search: &str, delay: Duration) -> Self {
        self.delays.insert(search.to_string(), delay);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn books(&self) -> Vec<Book> {
        self.books.lock().unwrap().clone()
    }

    fn not_found() -> ClientError {
        ClientError::Server {
            status: 404,
            message: Some("Book not found".to_string()),
        }
    }

    fn validate(draft: &BookDraft) -> Result<BookDraft, ClientError> {
        draft.clone().normalize().map_err(|e| ClientError::Server {
            status: 400,
            message: Some(e.to_string()),
        })
    }
}

#[async_trait]
impl BookApi for FakeBookApi {
    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = query.search.as_ref().and_then(|s| self.delays.get(s)) {
            tokio::time::sleep(*delay).await;
        }

        let mut books: Vec<Book> = self
            .books()
            .into_iter()
            .filter(|b| match &query.search {
                Some(s) => fold_case(&b.title).contains(&fold_case(s)),
                None => true,
            })
            .filter(|b| match &query.tag {
                Some(t) => b.tags.contains(t),
                None => true,
            })
            .collect();

        // stable sort: equal titles keep insertion order either way
        match query.sort {
            SortOrder::Asc => books.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOrder::Desc => books.sort_by(|a, b| b.title.cmp(&a.title)),
        }

        Ok(books)
    }

    async fn get_book(&self, id: &str) -> Result<Book, ClientError> {
        self.books()
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(Self::not_found)
    }

    async fn create_book(&self, draft: &BookDraft) -> Result<Book, ClientError> {
        let draft = Self::validate(draft)?;
        let now = Utc::now();
        let book = Book {
            id: format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: draft.title,
            author: draft.author,
            tags: draft.tags,
            cover_image: draft.cover_image,
            created_at: now,
            updated_at: now,
        };

        self.books.lock().unwrap().push(book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: &str, draft: &BookDraft) -> Result<Book, ClientError> {
        let draft = Self::validate(draft)?;
        let mut books = self.books.lock().unwrap();
        let book = books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(Self::not_found)?;

        book.title = draft.title;
        book.author = draft.author;
        book.tags = draft.tags;
        book.cover_image = draft.cover_image;
        book.updated_at = Utc::now();

        Ok(book.clone())
    }

    async fn delete_book(&self, id: &str) -> Result<(), ClientError> {
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|b| b.id != id);

        if books.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    async fn tags(&self) -> Result<Vec<String>, ClientError> {
        let tags: BTreeSet<String> = self
            .books()
            .into_iter()
            .flat_map(|b| b.tags)
            .collect();

        Ok(tags.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, title: &str) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            author: "Someone".to_string(),
            tags: vec![],
            cover_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_equal_titles_keep_insertion_order() {
        let api = FakeBookApi::with_books(vec![
            book("1", "Same"),
            book("2", "Other"),
            book("3", "Same"),
        ]);

        let ids = |books: Vec<Book>| books.into_iter().map(|b| b.id).collect::<Vec<_>>();

        assert_eq!(
            vec!["2", "1", "3"],
            ids(api.list_books(&BookQuery::all()).await.unwrap())
        );
        assert_eq!(
            vec!["1", "3", "2"],
            ids(api
                .list_books(&BookQuery::all().with_sort(SortOrder::Desc))
                .await
                .unwrap())
        );
    }
}
