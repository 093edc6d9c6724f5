use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::bucket::{plan_period, plan_relative, Bucket, RelativeWindow};
use super::config::{LoaderConfig, LoaderSettings};
use super::enrich::{enrich_all, Enricher, NoopEnricher};
use super::error::{FetchFailure, LoaderError};
use super::fetch::FetchOrchestrator;
use super::filter::filter_result;
use super::models::{BucketChunk, Bundle, RangeResult};
use super::store::CacheStore;
use super::upstream::BundleClient;

/// Entry point for callers: owns the request configuration, the fetch pipeline and the
/// enrichment pass, and turns time-range queries into [`RangeResult`]s.
pub struct DataLoader {
    config: LoaderConfig,
    fetcher: FetchOrchestrator,
    enricher: Arc<dyn Enricher>,
}

impl DataLoader {
    pub fn new(config: LoaderConfig, fetcher: FetchOrchestrator) -> Self {
        Self {
            config,
            fetcher,
            enricher: Arc::new(NoopEnricher),
        }
    }

    /// Builds a loader from on-disk settings, caching under `cache_dir`.
    pub fn from_settings(
        settings: &LoaderSettings,
        cache_dir: &Path,
        api_key: &str,
    ) -> Result<Self, LoaderError> {
        let config = LoaderConfig::new(&settings.endpoint, &settings.domain, api_key)?;
        let client = BundleClient::new(settings.request_timeout_seconds)?;
        let fetcher = FetchOrchestrator::new(
            CacheStore::new(cache_dir),
            client,
            settings.max_concurrency,
        );
        Ok(Self::new(config, fetcher))
    }

    pub fn with_enricher(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enricher = Arc::new(enricher);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &FetchOrchestrator {
        &self.fetcher
    }

    pub fn set_domain_key(&mut self, key: &str) {
        self.config = self.config.with_api_key(key);
        self.flush();
    }

    pub fn set_domain(&mut self, domain: &str) {
        self.config = self.config.with_domain(domain);
        log::debug!(
            "scope set to {} ({})",
            self.config.scope.name(),
            if self.config.scope.is_org() { "org" } else { "domain" }
        );
        self.flush();
    }

    /// Validates before applying; on error the previous endpoint stays in effect.
    pub fn set_api_endpoint(&mut self, endpoint: &str) -> Result<(), LoaderError> {
        self.config = self.config.with_endpoint(endpoint)?;
        self.flush();
        Ok(())
    }

    /// Forgets memoized responses. Persisted ones remain and are served on the next
    /// request for the same URL.
    pub fn flush(&self) {
        self.fetcher.flush_memory();
    }

    /// Forgets memoized and persisted responses alike.
    pub async fn clear_cache(&self) -> bool {
        self.fetcher.flush_memory();
        self.fetcher.store().clear().await
    }

    pub async fn fetch_hour(&self, t: DateTime<Utc>) -> Result<RangeResult, LoaderError> {
        self.load(vec![Bucket::hour(t)], None, None).await
    }

    pub async fn fetch_day(&self, t: DateTime<Utc>) -> Result<RangeResult, LoaderError> {
        self.load(vec![Bucket::day(t)], None, None).await
    }

    pub async fn fetch_month(&self, t: DateTime<Utc>) -> Result<RangeResult, LoaderError> {
        self.load(vec![Bucket::month(t)], None, None).await
    }

    pub async fn fetch_last_week(
        &self,
        end: Option<DateTime<Utc>>,
    ) -> Result<RangeResult, LoaderError> {
        self.load_relative(RelativeWindow::LastWeek, end).await
    }

    pub async fn fetch_previous_31_days(
        &self,
        end: Option<DateTime<Utc>>,
    ) -> Result<RangeResult, LoaderError> {
        self.load_relative(RelativeWindow::Previous31Days, end).await
    }

    pub async fn fetch_previous_12_months(
        &self,
        end: Option<DateTime<Utc>>,
    ) -> Result<RangeResult, LoaderError> {
        self.load_relative(RelativeWindow::Previous12Months, end).await
    }

    /// Records with `start <= timeSlot <= end`. A missing end means now.
    pub async fn fetch_period(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<RangeResult, LoaderError> {
        let end = end.unwrap_or_else(Utc::now);
        let buckets = plan_period(start, end)?;
        self.load(buckets, Some(start), Some(end)).await
    }

    async fn load_relative(
        &self,
        window: RelativeWindow,
        end: Option<DateTime<Utc>>,
    ) -> Result<RangeResult, LoaderError> {
        let buckets = plan_relative(window, end.unwrap_or_else(Utc::now));
        self.load(buckets, None, None).await
    }

    async fn load(
        &self,
        buckets: Vec<Bucket>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<RangeResult, LoaderError> {
        let resolved = self.fetcher.resolve_all(&self.config, &buckets).await?;

        let mut chunks = Vec::with_capacity(resolved.len());
        for (bucket, r) in buckets.into_iter().zip(resolved) {
            let mut bundles = r
                .records
                .iter()
                .cloned()
                .map(Bundle::from_raw)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| LoaderError::fetch(&r.url, FetchFailure::Decode(e)))?;
            enrich_all(self.enricher.as_ref(), &mut bundles).map_err(|source| {
                LoaderError::Enrich {
                    url: r.url.clone(),
                    source,
                }
            })?;
            chunks.push(BucketChunk::new(bucket, bundles));
        }

        let result = filter_result(RangeResult { start, end, chunks });
        log::info!(
            "loaded {} bundles from {} buckets for {}",
            result.len(),
            result.chunks.len(),
            self.config.scope.name()
        );
        Ok(result)
    }
}
