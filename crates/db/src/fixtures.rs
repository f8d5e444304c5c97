//! Demo catalog seeded into an empty store.

use rand::Rng;

use crate::error::DbResult;
use crate::models::{NewAuthor, NewBook};
use crate::repository::{AuthorRepository, BookRepository};

pub const FIXTURE_AUTHORS: usize = 10;
pub const FIXTURE_BOOKS: usize = 20;

/// Counts of what a fixture run inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSummary {
    pub authors: usize,
    pub books: usize,
}

/// Insert 10 authors and 20 books, each book assigned a random author.
pub async fn load_catalog<S>(store: &S) -> DbResult<CatalogSummary>
where
    S: AuthorRepository + BookRepository,
{
    let mut author_ids = Vec::with_capacity(FIXTURE_AUTHORS);
    for i in 0..FIXTURE_AUTHORS {
        let author = store
            .insert_author(NewAuthor {
                first_name: format!("FirstName-{i}"),
                last_name: format!("LastName-{i}"),
            })
            .await?;
        author_ids.push(author.id);
    }

    for i in 0..FIXTURE_BOOKS {
        let author_id = author_ids[rand::thread_rng().gen_range(0..author_ids.len())];
        store
            .insert_book(NewBook {
                title: format!("Title-{i}"),
                cover_text: format!("CoverText-{i}"),
                comment: None,
                author_id: Some(author_id),
            })
            .await?;
    }

    Ok(CatalogSummary {
        authors: FIXTURE_AUTHORS,
        books: FIXTURE_BOOKS,
    })
}
