//! Media service client
//!
//! Resolves media ids with a single `POST {api_url}/v1/media/batch` call.
//! Records are cached in Redis per id; only cache misses go over the wire.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::MediaRecord,
    services::media::MediaResolver,
};

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    ids: &'a [Uuid],
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    records: Vec<MediaRecord>,
}

#[derive(Clone)]
pub struct HttpMediaResolver {
    http_client: HttpClient,
    api_url: String,
    api_key: Option<String>,
    cache: Option<Cache>,
    cache_ttl: u64,
    cache_timeout: Duration,
}

impl HttpMediaResolver {
    pub fn new(
        cache: Option<Cache>,
        api_url: String,
        api_key: Option<String>,
        cache_ttl: u64,
        cache_timeout: Duration,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            api_key,
            cache,
            cache_ttl,
            cache_timeout,
        }
    }

    fn batch_url(&self) -> String {
        format!("{}/v1/media/batch", self.api_url.trim_end_matches('/'))
    }

    /// Splits ids into cached records and misses with one bounded cache read.
    /// A cache error or a read slower than `cache_timeout` counts as all misses.
    async fn lookup_cached(&self, ids: &[Uuid]) -> (HashMap<Uuid, MediaRecord>, Vec<Uuid>) {
        let Some(cache) = &self.cache else {
            return (HashMap::new(), ids.to_vec());
        };

        let keys: Vec<CacheKey> = ids.iter().map(|id| CacheKey::Media(*id)).collect();
        let mut cached = match tokio::time::timeout(
            self.cache_timeout,
            cache.get_many::<MediaRecord>(&keys),
        )
        .await
        {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, requested = ids.len(), "Media cache read failed");
                HashMap::new()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.cache_timeout.as_millis() as u64,
                    requested = ids.len(),
                    "Media cache read timed out"
                );
                HashMap::new()
            }
        };

        let mut hits = HashMap::new();
        let mut misses = Vec::new();
        for (id, key) in ids.iter().zip(&keys) {
            match cached.remove(key) {
                Some(record) => {
                    hits.insert(*id, record);
                }
                None => misses.push(*id),
            }
        }

        (hits, misses)
    }

    async fn fetch_batch(&self, ids: &[Uuid]) -> AppResult<Vec<MediaRecord>> {
        let mut request = self
            .http_client
            .post(self.batch_url())
            .json(&BatchRequest { ids });

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                requested = ids.len(),
                "Media service request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Media service returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        parse_batch_response(&body)
    }
}

fn parse_batch_response(body: &str) -> AppResult<Vec<MediaRecord>> {
    serde_json::from_str::<BatchResponse>(body)
        .map(|response| response.records)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse media response: {}", e)))
}

#[async_trait::async_trait]
impl MediaResolver for HttpMediaResolver {
    async fn resolve_media(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, MediaRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let (mut resolved, misses) = self.lookup_cached(ids).await;

        tracing::debug!(
            requested = ids.len(),
            cache_hits = resolved.len(),
            misses = misses.len(),
            "Resolving media"
        );

        if misses.is_empty() {
            return Ok(resolved);
        }

        for record in self.fetch_batch(&misses).await? {
            // The service may echo ids we did not ask for
            if !misses.contains(&record.id) {
                continue;
            }
            if let Some(cache) = &self.cache {
                cache.set_in_background(&CacheKey::Media(record.id), &record, self.cache_ttl);
            }
            resolved.insert(record.id, record);
        }

        tracing::info!(
            requested = ids.len(),
            resolved = resolved.len(),
            provider = self.name(),
            "Media resolved"
        );

        Ok(resolved)
    }

    fn name(&self) -> &'static str {
        "media_service"
    }
}
