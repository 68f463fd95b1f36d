//! The book collection view: search box, tag filter, sort toggle and the
//! list of matching books.
//!
//! [`CollectionView`] is a plain state machine. Every change goes through
//! [`CollectionView::update`], which returns the side effects the caller has
//! to run (fetches, deletes, debounce timers). Renderers never see the
//! machine itself, only [`ViewSnapshot`] copies.
//!
//! [`CollectionController`] drives the machine on a tokio task: it executes
//! effects against a [`BookApi`] and publishes snapshots on a `watch` channel.
//!
//! Every list fetch and every tag fetch carries a generation number. A
//! response whose generation is older than the latest request of its kind
//! is dropped, so a slow fetch can never overwrite a newer result.

use super::api::BookApi;
use crate::{
    book::Book,
    query::{BookQuery, SortOrder},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// Filter state as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub search: String,
    pub tag: Option<String>,
    pub sort: SortOrder,
}

impl Filters {
    pub fn to_query(&self) -> BookQuery {
        BookQuery {
            search: Some(self.search.trim().to_string()).filter(|s| !s.is_empty()),
            tag: self.tag.clone().filter(|t| !t.trim().is_empty()),
            sort: self.sort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

/// A transient message shown above the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// An immutable copy of the view state, handed to render code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSnapshot {
    pub phase: Phase,
    pub filters: Filters,
    pub books: Vec<Book>,
    pub tags: Vec<String>,
    /// The query `books` was fetched with. Lags behind `filters` while a
    /// search is debounced or a fetch is in flight.
    pub shown: BookQuery,
    pub notice: Option<Notice>,
    /// Book ids with a delete request in flight.
    pub deleting: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Mounted,
    SearchChanged(String),
    /// The debounce timer for search revision `revision` fired.
    SearchSettled { revision: u64 },
    TagSelected(Option<String>),
    SortChanged(SortOrder),
    /// Reload list and tags with the current filters.
    Refresh,
    BooksLoaded {
        generation: u64,
        result: Result<Vec<Book>, String>,
    },
    TagsLoaded {
        generation: u64,
        result: Result<Vec<String>, String>,
    },
    /// The user confirmed deleting the book with this id.
    DeleteConfirmed(String),
    Deleted {
        id: String,
        result: Result<(), String>,
    },
    /// Shown after a successful create or edit elsewhere.
    NoticeShown(String),
    NoticeDismissed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchBooks { generation: u64, query: BookQuery },
    FetchTags { generation: u64 },
    DeleteBook { id: String },
    /// Send `SearchSettled { revision }` once the debounce delay has passed.
    DebounceSearch { revision: u64 },
}

#[derive(Debug, Default)]
pub struct CollectionView {
    state: ViewSnapshot,
    generation: u64,
    tags_generation: u64,
    search_revision: u64,
    /// Query of the latest list fetch.
    requested: BookQuery,
}

impl CollectionView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.clone()
    }

    /// Applies one event and returns the effects to run.
    pub fn update(&mut self, event: ViewEvent) -> Vec<Effect> {
        match event {
            ViewEvent::Mounted | ViewEvent::Refresh => vec![self.fetch_books(), self.fetch_tags()],
            ViewEvent::SearchChanged(text) => {
                if text == self.state.filters.search {
                    return vec![];
                }
                self.state.filters.search = text;
                self.search_revision += 1;
                vec![Effect::DebounceSearch {
                    revision: self.search_revision,
                }]
            }
            ViewEvent::SearchSettled { revision } => {
                if revision != self.search_revision {
                    return vec![];
                }
                vec![self.fetch_books()]
            }
            ViewEvent::TagSelected(tag) => {
                let tag = tag.filter(|t| !t.is_empty());
                if tag == self.state.filters.tag {
                    return vec![];
                }
                self.state.filters.tag = tag;
                vec![self.fetch_books()]
            }
            ViewEvent::SortChanged(sort) => {
                if sort == self.state.filters.sort {
                    return vec![];
                }
                self.state.filters.sort = sort;
                vec![self.fetch_books()]
            }
            ViewEvent::BooksLoaded { generation, result } => {
                if generation != self.generation {
                    tracing::debug!(
                        generation,
                        latest = self.generation,
                        "discarding superseded book list"
                    );
                    return vec![];
                }
                match result {
                    Ok(books) => {
                        self.state.books = books;
                        self.state.shown = self.requested.clone();
                        self.state.phase = Phase::Loaded;
                    }
                    Err(message) => {
                        self.state.phase = Phase::Error(message);
                    }
                }
                vec![]
            }
            ViewEvent::TagsLoaded { generation, result } => {
                if generation != self.tags_generation {
                    tracing::debug!(
                        generation,
                        latest = self.tags_generation,
                        "discarding superseded tag index"
                    );
                    return vec![];
                }
                match result {
                    Ok(tags) => self.state.tags = tags,
                    Err(message) => self.state.notice = Some(failure(message)),
                }
                vec![]
            }
            ViewEvent::DeleteConfirmed(id) => {
                if self.state.deleting.contains(&id) {
                    return vec![];
                }
                self.state.deleting.push(id.clone());
                vec![Effect::DeleteBook { id }]
            }
            ViewEvent::Deleted { id, result } => {
                self.state.deleting.retain(|d| *d != id);
                match result {
                    Ok(()) => {
                        self.state.notice = Some(Notice {
                            kind: NoticeKind::Success,
                            message: "Book deleted".to_string(),
                        });
                        // the deleted book may have held the last use of a tag
                        vec![self.fetch_books(), self.fetch_tags()]
                    }
                    Err(message) => {
                        self.state.notice = Some(failure(message));
                        vec![]
                    }
                }
            }
            ViewEvent::NoticeShown(message) => {
                self.state.notice = Some(Notice {
                    kind: NoticeKind::Success,
                    message,
                });
                vec![]
            }
            ViewEvent::NoticeDismissed => {
                self.state.notice = None;
                vec![]
            }
        }
    }

    fn fetch_books(&mut self) -> Effect {
        self.generation += 1;
        self.state.phase = Phase::Loading;
        self.requested = self.state.filters.to_query();
        Effect::FetchBooks {
            generation: self.generation,
            query: self.requested.clone(),
        }
    }

    fn fetch_tags(&mut self) -> Effect {
        self.tags_generation += 1;
        Effect::FetchTags {
            generation: self.tags_generation,
        }
    }
}

fn failure(message: String) -> Notice {
    Notice {
        kind: NoticeKind::Failure,
        message,
    }
}

/// Toolbar text such as `3 books` or `1 book matching "rust" tagged "cs"`.
///
/// Describes the books on screen, so it follows [`ViewSnapshot::shown`]
/// rather than the filters being typed.
pub fn toolbar_summary(snapshot: &ViewSnapshot) -> String {
    let count = snapshot.books.len();
    let mut summary = format!("{} {}", count, if count == 1 { "book" } else { "books" });

    if let Some(search) = &snapshot.shown.search {
        summary.push_str(&format!(" matching \"{search}\""));
    }
    if let Some(tag) = &snapshot.shown.tag {
        summary.push_str(&format!(" tagged \"{tag}\""));
    }

    summary
}

/// Options for the tag selector.
///
/// The selected tag stays selectable even after it drops out of the index,
/// otherwise the selector would silently lose the active filter.
pub fn tag_options(snapshot: &ViewSnapshot) -> Vec<String> {
    let mut options = snapshot.tags.clone();

    if let Some(tag) = &snapshot.filters.tag {
        if let Err(pos) = options.binary_search(tag) {
            options.insert(pos, tag.clone());
        }
    }

    options
}

/// Runs a [`CollectionView`] on a background task.
///
/// Dropping the controller stops the task.
pub struct CollectionController {
    events: mpsc::UnboundedSender<ViewEvent>,
    snapshots: watch::Receiver<ViewSnapshot>,
    task: JoinHandle<()>,
}

impl CollectionController {
    /// Starts the controller and mounts the view, which triggers the
    /// initial list and tag fetches.
    pub fn spawn(api: Arc<dyn BookApi>, debounce: Duration) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let (publish, snapshots) = watch::channel(ViewSnapshot::default());

        let task = tokio::spawn(run(api, debounce, events.clone(), rx, publish));

        let controller = Self {
            events,
            snapshots,
            task,
        };
        controller.send(ViewEvent::Mounted);
        controller
    }

    pub fn send(&self, event: ViewEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("collection view task has stopped");
        }
    }

    pub fn set_search(&self, text: impl Into<String>) {
        self.send(ViewEvent::SearchChanged(text.into()));
    }

    pub fn select_tag(&self, tag: Option<String>) {
        self.send(ViewEvent::TagSelected(tag));
    }

    pub fn set_sort(&self, sort: SortOrder) {
        self.send(ViewEvent::SortChanged(sort));
    }

    pub fn confirm_delete(&self, id: impl Into<String>) {
        self.send(ViewEvent::DeleteConfirmed(id.into()));
    }

    pub fn show_notice(&self, message: impl Into<String>) {
        self.send(ViewEvent::NoticeShown(message.into()));
    }

    pub fn dismiss_notice(&self) {
        self.send(ViewEvent::NoticeDismissed);
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.clone()
    }
}

impl Drop for CollectionController {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    api: Arc<dyn BookApi>,
    debounce: Duration,
    events: mpsc::UnboundedSender<ViewEvent>,
    mut rx: mpsc::UnboundedReceiver<ViewEvent>,
    publish: watch::Sender<ViewSnapshot>,
) {
    let mut view = CollectionView::new();

    while let Some(event) = rx.recv().await {
        let effects = view.update(event);
        publish.send_replace(view.snapshot());

        for effect in effects {
            tokio::spawn(execute(api.clone(), debounce, effect, events.clone()));
        }
    }
}

async fn execute(
    api: Arc<dyn BookApi>,
    debounce: Duration,
    effect: Effect,
    events: mpsc::UnboundedSender<ViewEvent>,
) {
    let event = match effect {
        Effect::FetchBooks { generation, query } => ViewEvent::BooksLoaded {
            generation,
            result: api.list_books(&query).await.map_err(|e| e.user_message()),
        },
        Effect::FetchTags { generation } => ViewEvent::TagsLoaded {
            generation,
            result: api.tags().await.map_err(|e| e.user_message()),
        },
        Effect::DeleteBook { id } => {
            let result = api.delete_book(&id).await.map_err(|e| e.user_message());
            ViewEvent::Deleted { id, result }
        }
        Effect::DebounceSearch { revision } => {
            tokio::time::sleep(debounce).await;
            ViewEvent::SearchSettled { revision }
        }
    };

    // the controller may already be gone
    let _ = events.send(event);
}
