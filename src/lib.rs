//! Bookshelf API: a book catalog served by the ATLAS framework.
//!
//! [`Services`] owns the shared state (store, response cache, token service,
//! versioning). [`build_registry`] wires the core `db` and `auth` modules and
//! the `books` module on top of it, and [`run`] drives the whole lifecycle.

pub mod modules;

use std::sync::Arc;

use anyhow::Context;
use atlas_authz::{AuthModule, TokenService};
use atlas_cache::TagAwareCache;
use atlas_db::{DbModule, MemoryStore};
use atlas_http::versioning::Versioning;
use atlas_kernel::{InitCtx, ModuleRegistry, Settings};

/// Long-lived state shared by every module.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<MemoryStore>,
    /// Serialized listing pages keyed by page and limit.
    pub cache: TagAwareCache<String>,
    pub tokens: TokenService,
    pub versioning: Versioning,
}

impl Services {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            store: MemoryStore::new_shared(),
            cache: TagAwareCache::from_settings(&settings.cache),
            tokens: TokenService::from_settings(&settings.auth),
            versioning: Versioning::from_settings(&settings.api)?,
        })
    }
}

/// Registers core and application modules against `services`.
pub fn build_registry(settings: &Settings, services: &Services) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_core(Arc::new(DbModule::new(services.store.clone())));
    registry.register_core(Arc::new(AuthModule::new(
        services.store.clone(),
        services.tokens.clone(),
    )));
    modules::register_all(&mut registry, settings, services);
    registry
}

/// Boots every module, serves HTTP until a shutdown signal, then stops
/// modules in reverse order.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    atlas_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        host = %settings.server.host,
        port = settings.server.port,
        "bookshelf-api bootstrap starting"
    );

    let services = Services::from_settings(&settings)?;
    let registry = build_registry(&settings, &services);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .boot(&ctx)
        .await
        .context("failed to boot modules")?;

    let served = atlas_http::start_server(&registry, &settings).await;

    registry
        .shutdown()
        .await
        .context("failed to stop modules")?;

    served
}
