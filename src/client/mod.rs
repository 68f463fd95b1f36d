//! Client-side components that talk to the book API: the HTTP client, the
//! collection view and the create/edit form.

pub mod api;
#[cfg(test)]
pub(crate) mod fake;
pub mod form;
pub mod view;

pub use api::{BookApi, ClientError, HttpBookApi};
pub use form::{BookForm, CoverInput, FormMode, SubmitError};
pub use view::{CollectionController, CollectionView, ViewEvent, ViewSnapshot};
