use crate::{AppState, error::ApiError};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use shelf::prelude::*;

#[derive(Deserialize)]
pub struct BookListQuery {
    search: Option<String>, // e.g. "rust"
    tag: Option<String>,
    sort: Option<String>, // "asc" | "desc"
}

impl BookListQuery {
    fn into_query(self) -> Result<BookQuery, ApiError> {
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => SortOrder::default(),
            Some(raw) => raw.parse()?,
        };

        Ok(BookQuery {
            search: self.search,
            tag: self.tag,
            sort,
        })
    }
}

pub async fn list_books(
    State(app): State<AppState>,
    params: Result<Query<BookListQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;

    let books = query_books(&app.db, &query).await?;

    Ok(Json(books))
}

pub async fn get_book(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(find_book(&app.db, &id).await?))
}

pub async fn post_book(
    State(app): State<AppState>,
    payload: Result<Json<BookDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let Json(draft) = payload?;

    let book = create_book(&app.db, draft).await?;

    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn put_book(
    State(app): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BookDraft>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let Json(draft) = payload?;

    Ok(Json(update_book(&app.db, &id, draft).await?))
}

pub async fn delete_book(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    remove_book(&app.db, &id).await?;

    Ok(Json(json!({ "ok": true })))
}

pub async fn get_tags(State(app): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(tag_index(&app.db).await?))
}

#[cfg(test)]
mod tests {
    use crate::{AppState, router};
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use shelf::{config::ServerSettings, database::Database};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db = Database::with_migration(pool).await.unwrap();
        let settings = ServerSettings {
            bind: "127.0.0.1:0".parse().unwrap(),
            request_timeout_ms: 5_000,
            max_body_bytes: 1024 * 1024,
        };

        router(AppState { db: Arc::new(db) }, &settings)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    async fn create(app: &Router, title: &str, tags: &[&str]) -> Value {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/books",
            Some(json!({ "title": title, "author": "Someone", "tags": tags })),
        )
        .await;
        assert_eq!(StatusCode::CREATED, status);
        body
    }

    fn titles(body: &Value) -> Vec<&str> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|b| b["title"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let app = test_app().await;

        let created = create(&app, "Dune", &["a", "b", "b"]).await;
        assert_eq!(json!(["a", "b", "b"]), created["tags"]);
        assert!(created["createdAt"].is_string());

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = call(&app, Method::GET, &format!("/api/books/{id}"), None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(created, fetched);

        let (_, tags) = call(&app, Method::GET, "/api/books/tags", None).await;
        assert_eq!(json!(["a", "b"]), tags);
    }

    #[tokio::test]
    async fn test_create_requires_title_and_author() {
        let app = test_app().await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/books",
            Some(json!({ "title": "  ", "author": "Someone" })),
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("Title is required", body["error"]);

        let (status, body) = call(&app, Method::POST, "/api/books", Some(json!({ "title": "Dune" }))).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("Author is required", body["error"]);

        let (_, list) = call(&app, Method::GET, "/api/books", None).await;
        assert_eq!(json!([]), list);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/books")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let app = test_app().await;
        create(&app, "The Rust Book", &["rust", "cs"]).await;
        create(&app, "Dune", &["sf"]).await;
        create(&app, "Programming Rust", &["rust"]).await;

        let (_, body) = call(&app, Method::GET, "/api/books", None).await;
        assert_eq!(vec!["Dune", "Programming Rust", "The Rust Book"], titles(&body));

        let (_, body) = call(&app, Method::GET, "/api/books?sort=desc", None).await;
        assert_eq!(vec!["The Rust Book", "Programming Rust", "Dune"], titles(&body));

        let (_, body) = call(&app, Method::GET, "/api/books?search=RUST&tag=cs", None).await;
        assert_eq!(vec!["The Rust Book"], titles(&body));

        let (_, body) = call(&app, Method::GET, "/api/books?search=&tag=&sort=", None).await;
        assert_eq!(3, titles(&body).len());

        let (status, body) = call(&app, Method::GET, "/api/books?sort=sideways", None).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert!(body["error"].as_str().unwrap().contains("sideways"));
    }

    #[tokio::test]
    async fn test_update_book() {
        let app = test_app().await;
        let created = create(&app, "Dune", &["sf"]).await;
        let id = created["id"].as_str().unwrap();

        let (status, updated) = call(
            &app,
            Method::PUT,
            &format!("/api/books/{id}"),
            Some(json!({
                "title": "Dune Messiah",
                "author": "Frank Herbert",
                "tags": ["sf", "sequel"],
                "coverImage": "https://example.com/messiah.jpg"
            })),
        )
        .await;

        assert_eq!(StatusCode::OK, status);
        assert_eq!("Dune Messiah", updated["title"]);
        assert_eq!("https://example.com/messiah.jpg", updated["coverImage"]);
        assert_eq!(created["createdAt"], updated["createdAt"]);

        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/books/missing",
            Some(json!({ "title": "X", "author": "Y" })),
        )
        .await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("Book not found", body["error"]);

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/api/books/{id}"),
            Some(json!({ "title": "", "author": "Y" })),
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
    }

    #[tokio::test]
    async fn test_delete_book_prunes_tag_index() {
        let app = test_app().await;
        create(&app, "Keep", &["shared"]).await;
        let gone = create(&app, "Gone", &["shared", "unique"]).await;
        let uri = format!("/api/books/{}", gone["id"].as_str().unwrap());

        let (status, body) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!({ "ok": true }), body);

        let (_, list) = call(&app, Method::GET, "/api/books", None).await;
        assert_eq!(vec!["Keep"], titles(&list));

        let (_, tags) = call(&app, Method::GET, "/api/books/tags", None).await;
        assert_eq!(json!(["shared"]), tags);

        let (status, body) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!("Book not found", body["error"]);
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(StatusCode::OK, response.status());
    }
}
