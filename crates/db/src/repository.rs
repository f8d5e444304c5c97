//! Repository traits consumed by the API layer.
//!
//! Implementations must be thread-safe (Send + Sync) and support async
//! operations. Method names are prefixed with the entity so a single backend
//! can implement every trait without ambiguity.

use async_trait::async_trait;

use crate::error::DbResult;
use crate::models::{
    Author, AuthorId, Book, BookId, NewAuthor, NewBook, NewUser, Page, User,
};

#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    /// Gets a book by id.
    async fn find_book(&self, id: BookId) -> DbResult<Option<Book>>;

    /// Lists one page of books in insertion order.
    async fn list_books(&self, page: Page) -> DbResult<Vec<Book>>;

    /// Persists a new book and returns it with its assigned id.
    async fn insert_book(&self, book: NewBook) -> DbResult<Book>;

    /// Overwrites every field of an existing book.
    async fn update_book(&self, book: &Book) -> DbResult<()>;

    /// Removes a book.
    async fn delete_book(&self, id: BookId) -> DbResult<()>;

    async fn count_books(&self) -> DbResult<u64>;
}

#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn find_author(&self, id: AuthorId) -> DbResult<Option<Author>>;

    async fn insert_author(&self, author: NewAuthor) -> DbResult<Author>;

    async fn count_authors(&self) -> DbResult<u64>;
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Looks a user up by email, case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>>;

    /// Fails with [`crate::DbError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: NewUser) -> DbResult<User>;

    async fn count_users(&self) -> DbResult<u64>;
}
