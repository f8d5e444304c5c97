//! In-memory store backing every repository trait.
//!
//! Tables are `BTreeMap`s keyed by a monotonically increasing id, so
//! iteration order is insertion order. A single `RwLock` guards all tables,
//! which keeps the author reference check and the book write atomic.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::error::{DbError, DbResult};
use crate::models::{
    Author, AuthorId, Book, BookId, NewAuthor, NewBook, NewUser, Page, User, UserId,
};
use crate::repository::{AuthorRepository, BookRepository, UserRepository};

#[derive(Debug)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    authors: BTreeMap<AuthorId, Author>,
    users: BTreeMap<UserId, User>,
    next_book_id: BookId,
    next_author_id: AuthorId,
    next_user_id: UserId,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            books: BTreeMap::new(),
            authors: BTreeMap::new(),
            users: BTreeMap::new(),
            next_book_id: 1,
            next_author_id: 1,
            next_user_id: 1,
        }
    }
}

impl Tables {
    fn check_author(&self, author_id: Option<AuthorId>) -> DbResult<()> {
        match author_id {
            Some(id) if !self.authors.contains_key(&id) => Err(DbError::MissingReference {
                entity: "author",
                id,
                referrer: "book",
            }),
            _ => Ok(()),
        }
    }
}

/// In-memory implementation of the catalog and account repositories.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn find_book(&self, id: BookId) -> DbResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_books(&self, page: Page) -> DbResult<Vec<Book>> {
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(page.size).unwrap_or(usize::MAX);

        let tables = self.tables.read().await;
        Ok(tables
            .books
            .values()
            .skip(offset)
            .take(size)
            .cloned()
            .collect())
    }

    async fn insert_book(&self, book: NewBook) -> DbResult<Book> {
        let mut tables = self.tables.write().await;
        tables.check_author(book.author_id)?;

        let id = tables.next_book_id;
        tables.next_book_id += 1;

        let stored = Book {
            id,
            title: book.title,
            cover_text: book.cover_text,
            comment: book.comment,
            author_id: book.author_id,
        };
        tables.books.insert(id, stored.clone());
        tracing::debug!(book_id = id, "book inserted");
        Ok(stored)
    }

    async fn update_book(&self, book: &Book) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.check_author(book.author_id)?;

        match tables.books.get_mut(&book.id) {
            Some(existing) => {
                *existing = book.clone();
                tracing::debug!(book_id = book.id, "book updated");
                Ok(())
            }
            None => Err(DbError::NotFound {
                entity: "book",
                id: book.id,
            }),
        }
    }

    async fn delete_book(&self, id: BookId) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.books.remove(&id).is_none() {
            return Err(DbError::NotFound { entity: "book", id });
        }
        tracing::debug!(book_id = id, "book deleted");
        Ok(())
    }

    async fn count_books(&self) -> DbResult<u64> {
        Ok(self.tables.read().await.books.len() as u64)
    }
}

#[async_trait]
impl AuthorRepository for MemoryStore {
    async fn find_author(&self, id: AuthorId) -> DbResult<Option<Author>> {
        Ok(self.tables.read().await.authors.get(&id).cloned())
    }

    async fn insert_author(&self, author: NewAuthor) -> DbResult<Author> {
        let mut tables = self.tables.write().await;
        let id = tables.next_author_id;
        tables.next_author_id += 1;

        let stored = Author {
            id,
            first_name: author.first_name,
            last_name: author.last_name,
        };
        tables.authors.insert(id, stored.clone());
        Ok(stored)
    }

    async fn count_authors(&self) -> DbResult<u64> {
        Ok(self.tables.read().await.authors.len() as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> DbResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(DbError::Duplicate {
                entity: "user",
                key: user.email,
            });
        }

        let id = tables.next_user_id;
        tables.next_user_id += 1;

        let stored = User::new(id, user.email, user.password_hash, user.roles);
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn count_users(&self) -> DbResult<u64> {
        Ok(self.tables.read().await.users.len() as u64)
    }
}
