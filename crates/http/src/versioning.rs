//! Response schema version negotiation through the `Accept` header.
//!
//! Clients ask for a version with a media type parameter:
//! `Accept: application/json; version=2.0`. Anything missing or unparsable
//! falls back to the configured default.

use anyhow::Context;
use atlas_kernel::settings::ApiSettings;
use axum::http::{header::ACCEPT, HeaderMap};

use crate::serializer::ApiVersion;

#[derive(Debug, Clone, Copy)]
pub struct Versioning {
    default_version: ApiVersion,
}

impl Versioning {
    pub fn new(default_version: ApiVersion) -> Self {
        Self { default_version }
    }

    pub fn from_settings(settings: &ApiSettings) -> anyhow::Result<Self> {
        let default_version = settings
            .default_version
            .parse::<ApiVersion>()
            .with_context(|| "invalid api.default_version")?;
        Ok(Self::new(default_version))
    }

    pub fn default_version(&self) -> ApiVersion {
        self.default_version
    }

    /// Version requested by the client, or the default.
    pub fn resolve(&self, headers: &HeaderMap) -> ApiVersion {
        headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(requested_version)
            .unwrap_or(self.default_version)
    }
}

/// Extracts the `version` parameter from an `Accept` header value.
fn requested_version(accept: &str) -> Option<ApiVersion> {
    accept
        .split(',')
        .flat_map(|media_range| media_range.split(';').skip(1))
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("version"))
        .and_then(|(_, value)| value.trim().trim_matches('"').parse().ok())
}
