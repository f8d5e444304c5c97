//! Request handlers for `/api/books`.

use std::sync::Arc;

use atlas_authz::Principal;
use atlas_cache::TagAwareCache;
use atlas_db::{Author, AuthorRepository, Book, BookRepository, NewBook, Page};
use atlas_http::{
    serializer::{to_json_string, ApiVersion, Normalize, SerializationContext},
    versioning::Versioning,
    AppError, AppResult,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_TYPE, HOST, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::models::{violations, BookPayload, BookView, GET_BOOKS};

/// Tag shared by every cached listing page.
pub const BOOKS_CACHE_TAG: &str = "booksCache";

/// Schema version used for cached listings, independent of the request.
const LIST_VERSION: ApiVersion = ApiVersion::new(1, 0);

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 3;

/// Shared handler dependencies.
#[derive(Clone)]
pub struct BooksState {
    pub books: Arc<dyn BookRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub cache: TagAwareCache<String>,
    pub versioning: Versioning,
    pub max_page_size: u64,
    /// Base URL for `Location` headers; the `Host` header is used when unset.
    pub public_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    limit: Option<String>,
}

pub async fn health() -> &'static str {
    "books module is healthy"
}

/// `GET /api/books?page=&limit=`
pub async fn list_books(
    State(state): State<BooksState>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let page = requested_page(&params, state.max_page_size)?;

    let cache_key = format!("getAllBooks-{}-{}", page.number, page.size);
    let body = state
        .cache
        .get_or_compute(&cache_key, &[BOOKS_CACHE_TAG], || async {
            let books = state.books.list_books(page).await?;
            let mut views = Vec::with_capacity(books.len());
            for book in books {
                views.push(resolve_view(&state, book).await?);
            }

            let ctx = SerializationContext::new()
                .with_groups(&[GET_BOOKS])
                .with_version(LIST_VERSION);
            tracing::debug!(
                page = page.number,
                limit = page.size,
                books = views.len(),
                "listing page rendered"
            );
            to_json_string(&views, &ctx).map_err(|err| AppError::Internal(err.into()))
        })
        .await?;

    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

/// `GET /api/books/{id}`, serialized for the version the client negotiated.
pub async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    let book = find_book_or_404(&state, &id).await?;
    let version = state.versioning.resolve(&headers);

    let ctx = SerializationContext::new()
        .with_groups(&[GET_BOOKS])
        .with_version(version);
    let view = resolve_view(&state, book).await?;
    Ok(Json(view.normalize(&ctx)))
}

/// `DELETE /api/books/{id}` (admin only)
pub async fn delete_book(
    State(state): State<BooksState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let book = find_book_or_404(&state, &id).await?;

    state.books.delete_book(book.id).await?;
    state.cache.invalidate_tags(&[BOOKS_CACHE_TAG]).await;

    tracing::info!(book_id = book.id, admin = %principal.email, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/books` (admin only)
pub async fn create_book(
    State(state): State<BooksState>,
    principal: Principal,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let payload = parse_payload(&body)?;
    payload
        .validate()
        .map_err(|errors| AppError::validation(violations(&errors), "The book is invalid."))?;

    let author = resolve_author(&state, &payload).await?;
    let book = state
        .books
        .insert_book(NewBook {
            title: payload.title.unwrap_or_default(),
            cover_text: payload.cover_text.unwrap_or_default(),
            comment: payload.comment,
            author_id: author.as_ref().map(|a| a.id),
        })
        .await?;
    state.cache.invalidate_tags(&[BOOKS_CACHE_TAG]).await;

    tracing::info!(
        book_id = book.id,
        author_id = ?book.author_id,
        admin = %principal.email,
        "book created"
    );

    let location = book_location(&state, &headers, book.id);
    let ctx = SerializationContext::new().with_groups(&[GET_BOOKS]);
    let view = BookView { book, author };

    let mut response = (StatusCode::CREATED, Json(view.normalize(&ctx))).into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(LOCATION, value);
    }
    Ok(response)
}

/// `PUT /api/books/{id}` (admin only). Only title and cover text are copied
/// onto the stored book; the author is re-resolved from `idAuthor`.
pub async fn update_book(
    State(state): State<BooksState>,
    principal: Principal,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<StatusCode> {
    let mut book = find_book_or_404(&state, &id).await?;

    let payload = parse_payload(&body)?;
    payload
        .validate()
        .map_err(|errors| AppError::validation(violations(&errors), "The book is invalid."))?;

    let author = resolve_author(&state, &payload).await?;
    book.title = payload.title.unwrap_or_default();
    book.cover_text = payload.cover_text.unwrap_or_default();
    book.author_id = author.map(|a| a.id);

    state.books.update_book(&book).await?;
    state.cache.invalidate_tags(&[BOOKS_CACHE_TAG]).await;

    tracing::info!(
        book_id = book.id,
        author_id = ?book.author_id,
        admin = %principal.email,
        "book updated"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Non-numeric ids cannot name a book and are reported as missing.
async fn find_book_or_404(state: &BooksState, raw_id: &str) -> AppResult<Book> {
    let not_found = || AppError::not_found(format!("book '{raw_id}' not found"));
    let id = raw_id.parse().map_err(|_| not_found())?;
    state.books.find_book(id).await?.ok_or_else(not_found)
}

async fn resolve_view(state: &BooksState, book: Book) -> AppResult<BookView> {
    let author = match book.author_id {
        Some(author_id) => state.authors.find_author(author_id).await?,
        None => None,
    };
    Ok(BookView { book, author })
}

/// Unknown or unusable author ids resolve to no author.
async fn resolve_author(state: &BooksState, payload: &BookPayload) -> AppResult<Option<Author>> {
    match payload.author_id() {
        Some(author_id) => Ok(state.authors.find_author(author_id).await?),
        None => Ok(None),
    }
}

/// `page < 1` becomes 1 and `limit` is clamped to `1..=max_page_size`.
fn requested_page(params: &ListParams, max_page_size: u64) -> AppResult<Page> {
    let page = parse_number("page", params.page.as_deref(), DEFAULT_PAGE)?;
    let limit = parse_number("limit", params.limit.as_deref(), DEFAULT_LIMIT)?;
    let max_limit = i64::try_from(max_page_size).unwrap_or(i64::MAX).max(1);
    Ok(Page::new(page.max(1) as u64, limit.clamp(1, max_limit) as u64))
}

fn parse_payload(body: &[u8]) -> AppResult<BookPayload> {
    serde_json::from_slice(body)
        .map_err(|err| AppError::bad_request(format!("invalid JSON body: {err}")))
}

fn parse_number(name: &str, raw: Option<&str>, default: u64) -> AppResult<i64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default as i64),
        Some(value) => value.parse().map_err(|_| {
            AppError::bad_request(format!("query parameter '{name}' must be an integer"))
        }),
    }
}

fn book_location(state: &BooksState, headers: &HeaderMap, id: u64) -> String {
    let path = format!("/api/books/{id}");
    if let Some(base) = &state.public_url {
        return format!("{}{path}", base.trim_end_matches('/'));
    }
    match headers.get(HOST).and_then(|host| host.to_str().ok()) {
        Some(host) => format!("http://{host}{path}"),
        None => path,
    }
}
