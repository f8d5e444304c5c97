pub mod books;

use std::sync::Arc;

use atlas_kernel::{ModuleRegistry, Settings};

use crate::Services;
use books::{handlers::BooksState, BooksModule};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings, services: &Services) {
    registry.register_custom(Arc::new(create_books_module(settings, services)));
}

pub fn create_books_module(settings: &Settings, services: &Services) -> BooksModule {
    let state = BooksState {
        books: services.store.clone(),
        authors: services.store.clone(),
        cache: services.cache.clone(),
        versioning: services.versioning,
        max_page_size: settings.api.max_page_size,
        public_url: settings.server.public_url.clone(),
    };
    BooksModule::new(state, services.tokens.clone())
}
