use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use atlas_kernel::{InitCtx, Module};

use crate::fixtures;
use crate::memory::MemoryStore;
use crate::repository::{AuthorRepository, BookRepository};

/// Core module owning the catalog store: seeds fixtures on init.
pub struct DbModule {
    store: Arc<MemoryStore>,
}

impl DbModule {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if !ctx.settings.database.seed_fixtures {
            tracing::info!(module = self.name(), "fixture seeding disabled");
            return Ok(());
        }

        if self.store.count_books().await? > 0 {
            tracing::info!(module = self.name(), "store already populated, skipping fixtures");
            return Ok(());
        }

        let summary = fixtures::load_catalog(self.store.as_ref())
            .await
            .context("failed to load catalog fixtures")?;
        tracing::info!(
            module = self.name(),
            authors = summary.authors,
            books = summary.books,
            "catalog fixtures loaded"
        );
        Ok(())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let authors = self.store.count_authors().await?;
        let books = self.store.count_books().await?;
        tracing::info!(
            module = self.name(),
            authors = authors,
            books = books,
            "db module started"
        );
        Ok(())
    }
}
