//! Catalog persistence for ATLAS applications.
//!
//! Entities, async repository traits, and an in-memory store that
//! implements all of them. The `db` core module seeds the demo catalog.

pub mod error;
pub mod fixtures;
pub mod memory;
pub mod models;
pub mod module;
pub mod repository;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use models::{
    Author, AuthorId, Book, BookId, NewAuthor, NewBook, NewUser, Page, User, UserId, ROLE_ADMIN,
    ROLE_USER,
};
pub use module::DbModule;
pub use repository::{AuthorRepository, BookRepository, UserRepository};
