use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::RwLock;
use serde_json::Value;

use super::bucket::Bucket;
use super::config::LoaderConfig;
use super::error::{FetchFailure, LoaderError};
use super::request::build_url;
use super::store::CacheStore;
use super::upstream::BundleClient;
use crate::constants::BUNDLES_FIELD;

/// Raw records of one bucket together with the URL they were resolved from.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub url: String,
    pub records: Arc<Vec<Value>>,
}

/// Cache-first bucket resolution: memory, then the durable store, then the network.
#[derive(Clone)]
pub struct FetchOrchestrator {
    store: CacheStore,
    client: BundleClient,
    memory: Arc<RwLock<HashMap<String, Arc<Vec<Value>>>>>,
    max_concurrency: usize,
}

impl FetchOrchestrator {
    pub fn new(store: CacheStore, client: BundleClient, max_concurrency: usize) -> Self {
        Self {
            store,
            client,
            memory: Arc::new(RwLock::new(HashMap::new())),
            max_concurrency,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn resolve(
        &self,
        cfg: &LoaderConfig,
        bucket: &Bucket,
    ) -> Result<Resolved, LoaderError> {
        let url = build_url(cfg, bucket)?;

        if let Some(records) = self.memory.read().get(&url).cloned() {
            log::debug!("memory hit {url}");
            return Ok(Resolved { url, records });
        }

        if let Some(cached) = self.store.get(&url).await {
            match bundles_of(&cached) {
                Some(records) => {
                    log::debug!("store hit {url}");
                    let records = self.memoize(&url, records);
                    return Ok(Resolved { url, records });
                }
                None => log::warn!("cached body for {url} has no {BUNDLES_FIELD} array, refetching"),
            }
        }

        log::debug!("cache miss {url}");
        let body = self
            .client
            .get_json(&url)
            .await
            .map_err(|e| LoaderError::fetch(&url, e))?;
        let Some(records) = bundles_of(&body) else {
            return Err(LoaderError::fetch(
                &url,
                FetchFailure::Decode(format!("response has no {BUNDLES_FIELD} array")),
            ));
        };
        if !self.store.put(&url, &body).await {
            log::warn!("response for {url} was not persisted");
        }
        let records = self.memoize(&url, records);
        Ok(Resolved { url, records })
    }

    /// Resolves every bucket, preserving order. Any failure fails the batch, but every
    /// bucket still runs to completion so successful siblings reach the store.
    pub async fn resolve_all(
        &self,
        cfg: &LoaderConfig,
        buckets: &[Bucket],
    ) -> Result<Vec<Resolved>, LoaderError> {
        let cap = match self.max_concurrency {
            0 => buckets.len().max(1),
            n => n,
        };
        let outcomes: Vec<Result<Resolved, LoaderError>> =
            futures_util::stream::iter(buckets.iter())
                .map(|bucket| self.resolve(cfg, bucket))
                .buffered(cap)
                .collect()
                .await;
        outcomes.into_iter().collect()
    }

    /// Drops the in-memory view. The durable store is untouched.
    pub fn flush_memory(&self) {
        let mut memory = self.memory.write();
        if !memory.is_empty() {
            log::debug!("flushing {} memoized responses", memory.len());
        }
        memory.clear();
    }

    pub fn memoized(&self) -> usize {
        self.memory.read().len()
    }

    fn memoize(&self, url: &str, records: Vec<Value>) -> Arc<Vec<Value>> {
        let records = Arc::new(records);
        self.memory.write().insert(url.to_string(), records.clone());
        records
    }
}

fn bundles_of(body: &Value) -> Option<Vec<Value>> {
    body.get(BUNDLES_FIELD)?.as_array().cloned()
}
