//! Base URL lookup for WMS layers.

use std::collections::HashMap;

use async_trait::async_trait;
use map_common::{MapError, MapResult};

/// Resolves the WMS endpoint that serves a given layer.
///
/// Resolution may need an external lookup (a catalog service, a capabilities
/// document), hence async.
#[async_trait]
pub trait BaseUrlResolver: Send + Sync {
    async fn resolve(&self, layer: &str) -> MapResult<String>;
}

/// Every layer is served by the same endpoint.
#[derive(Debug, Clone)]
pub struct StaticBaseUrl(pub String);

#[async_trait]
impl BaseUrlResolver for StaticBaseUrl {
    async fn resolve(&self, _layer: &str) -> MapResult<String> {
        Ok(self.0.clone())
    }
}

/// Per-layer endpoints with an optional fallback.
#[derive(Debug, Clone, Default)]
pub struct LayerUrlTable {
    urls: HashMap<String, String>,
    fallback: Option<String>,
}

impl LayerUrlTable {
    pub fn new(fallback: Option<String>) -> Self {
        Self {
            urls: HashMap::new(),
            fallback,
        }
    }

    pub fn insert(&mut self, layer: impl Into<String>, url: impl Into<String>) {
        self.urls.insert(layer.into(), url.into());
    }
}

#[async_trait]
impl BaseUrlResolver for LayerUrlTable {
    async fn resolve(&self, layer: &str) -> MapResult<String> {
        self.urls
            .get(layer)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| MapError::LayerNotFound(layer.to_string()))
    }
}
