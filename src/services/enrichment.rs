use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    db::CatalogStore,
    error::AppResult,
    models::{MediaRecord, ProductCandidate},
    services::media::MediaResolver,
};

/// Attaches display payloads and resolved media to an accepted list.
///
/// Enrichment never fails the request: on error or timeout the candidates
/// come back with whatever was attached so far.
#[derive(Clone)]
pub struct Enricher {
    catalog: Arc<dyn CatalogStore>,
    media: Arc<dyn MediaResolver>,
    timeout: Duration,
}

impl Enricher {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        media: Arc<dyn MediaResolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            media,
            timeout,
        }
    }

    pub async fn enrich(&self, mut candidates: Vec<ProductCandidate>) -> Vec<ProductCandidate> {
        if candidates.is_empty() {
            return candidates;
        }

        match tokio::time::timeout(self.timeout, self.attach_displays(&mut candidates)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    products = candidates.len(),
                    "Display lookup failed, returning unenriched products"
                );
                return candidates;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Display lookup timed out, returning unenriched products"
                );
                return candidates;
            }
        }

        let media_ids: BTreeSet<Uuid> = candidates
            .iter()
            .filter_map(|candidate| candidate.display.as_ref())
            .flat_map(|display| display.media_ids())
            .collect();

        if media_ids.is_empty() {
            return candidates;
        }

        let ids: Vec<Uuid> = media_ids.into_iter().collect();
        let records = match tokio::time::timeout(self.timeout, self.media.resolve_media(&ids)).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    provider = self.media.name(),
                    media = ids.len(),
                    "Media resolution failed, returning products without media"
                );
                return candidates;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    provider = self.media.name(),
                    "Media resolution timed out, returning products without media"
                );
                return candidates;
            }
        };

        let unresolved = ids.len().saturating_sub(records.len());
        if unresolved > 0 {
            tracing::debug!(unresolved, "Some media ids were not resolved");
        }

        attach_media(&mut candidates, &records);
        candidates
    }

    async fn attach_displays(&self, candidates: &mut [ProductCandidate]) -> AppResult<()> {
        let ids: Vec<Uuid> = candidates.iter().map(|candidate| candidate.id).collect();
        let mut displays = self.catalog.product_displays(&ids).await?;

        for candidate in candidates.iter_mut() {
            candidate.display = displays.remove(&candidate.id);
        }

        Ok(())
    }
}

fn attach_media(candidates: &mut [ProductCandidate], records: &HashMap<Uuid, MediaRecord>) {
    for display in candidates.iter_mut().filter_map(|c| c.display.as_mut()) {
        for attachment in display.attachments_mut() {
            attachment.record = records.get(&attachment.media_id).cloned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{CatalogQuery, MockCatalogStore};
    use crate::error::AppError;
    use crate::models::{MediaAttachment, ProductDisplay, ProductPolicy, VariantDisplay};
    use crate::services::media::MockMediaResolver;
    use chrono::Utc;

    fn candidate() -> ProductCandidate {
        ProductCandidate {
            id: Uuid::new_v4(),
            name: "Desk".to_string(),
            slug: "desk".to_string(),
            category_id: Uuid::new_v4(),
            sub_category_id: None,
            product_type_id: None,
            brand_id: None,
            is_best_seller: false,
            created_at: Utc::now(),
            display: None,
        }
    }

    fn display(image: Uuid, variant_image: Uuid, certificate: Uuid) -> ProductDisplay {
        ProductDisplay {
            price_cents: 25000,
            currency: "USD".to_string(),
            images: vec![MediaAttachment::unresolved(image)],
            variants: vec![VariantDisplay {
                id: Uuid::new_v4(),
                sku: "DESK-OAK".to_string(),
                name: "Oak".to_string(),
                price_cents: 27000,
                images: vec![MediaAttachment::unresolved(variant_image)],
            }],
            certificates: vec![MediaAttachment::unresolved(certificate)],
            policy: ProductPolicy::default(),
        }
    }

    fn record(id: Uuid) -> MediaRecord {
        MediaRecord {
            id,
            url: format!("https://cdn.example.com/{}.jpg", id),
            mime_type: "image/jpeg".to_string(),
            alt_text: None,
            width: None,
            height: None,
        }
    }

    /// Catalog whose display lookup outlives any enrichment budget
    struct StalledDisplays;

    #[async_trait::async_trait]
    impl CatalogStore for StalledDisplays {
        async fn eligible_products(&self, _: &CatalogQuery) -> AppResult<Vec<ProductCandidate>> {
            Ok(Vec::new())
        }

        async fn product_displays(&self, _: &[Uuid]) -> AppResult<HashMap<Uuid, ProductDisplay>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(HashMap::new())
        }
    }

    struct StalledMedia;

    #[async_trait::async_trait]
    impl MediaResolver for StalledMedia {
        async fn resolve_media(&self, _: &[Uuid]) -> AppResult<HashMap<Uuid, MediaRecord>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(HashMap::new())
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_one_batched_call_with_deduplicated_ids() {
        let shared_image = Uuid::new_v4();
        let (variant_a, variant_b, cert) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let first = candidate();
        let second = candidate();
        let (first_id, second_id) = (first.id, second.id);

        let mut catalog = MockCatalogStore::new();
        catalog.expect_product_displays().times(1).returning(move |_| {
            Ok(HashMap::from([
                (first_id, display(shared_image, variant_a, cert)),
                (second_id, display(shared_image, variant_b, cert)),
            ]))
        });

        let mut media = MockMediaResolver::new();
        media
            .expect_resolve_media()
            .withf(|ids| ids.len() == 4)
            .times(1)
            .returning(move |ids| {
                // The certificate stays unresolved
                Ok(ids
                    .iter()
                    .filter(|id| **id != cert)
                    .map(|id| (*id, record(*id)))
                    .collect())
            });
        media.expect_name().return_const("mock");

        let enricher = Enricher::new(Arc::new(catalog), Arc::new(media), Duration::from_secs(1));
        let enriched = enricher.enrich(vec![first, second]).await;

        let display = enriched[0].display.as_ref().unwrap();
        assert_eq!(display.images[0].record, Some(record(shared_image)));
        assert_eq!(display.variants[0].images[0].record, Some(record(variant_a)));
        assert_eq!(display.certificates[0].record, None);
        assert_eq!(
            enriched[1].display.as_ref().unwrap().variants[0].images[0].record,
            Some(record(variant_b))
        );
    }

    #[tokio::test]
    async fn test_media_failure_keeps_displays() {
        let product = candidate();
        let product_id = product.id;

        let mut catalog = MockCatalogStore::new();
        catalog.expect_product_displays().returning(move |_| {
            Ok(HashMap::from([(
                product_id,
                display(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()),
            )]))
        });

        let mut media = MockMediaResolver::new();
        media
            .expect_resolve_media()
            .returning(|_| Err(AppError::ExternalApi("media service down".to_string())));
        media.expect_name().return_const("mock");

        let enricher = Enricher::new(Arc::new(catalog), Arc::new(media), Duration::from_secs(1));
        let enriched = enricher.enrich(vec![product]).await;

        assert_eq!(enriched.len(), 1);
        let display = enriched[0].display.as_ref().unwrap();
        assert!(display.images.iter().all(|a| a.record.is_none()));
    }

    #[tokio::test]
    async fn test_display_failure_returns_unenriched() {
        let product = candidate();

        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_product_displays()
            .returning(|_| Err(AppError::Internal("pool closed".to_string())));

        let media = MockMediaResolver::new();

        let enricher = Enricher::new(Arc::new(catalog), Arc::new(media), Duration::from_secs(1));
        let enriched = enricher.enrich(vec![product.clone()]).await;

        assert_eq!(enriched, vec![product]);
    }

    #[tokio::test]
    async fn test_empty_list_issues_no_reads() {
        let enricher = Enricher::new(
            Arc::new(MockCatalogStore::new()),
            Arc::new(MockMediaResolver::new()),
            Duration::from_secs(1),
        );
        assert!(enricher.enrich(Vec::new()).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_timeout_returns_unenriched() {
        let product = candidate();
        let enricher = Enricher::new(
            Arc::new(StalledDisplays),
            Arc::new(MockMediaResolver::new()),
            Duration::from_millis(200),
        );

        let enriched = enricher.enrich(vec![product.clone()]).await;

        assert_eq!(enriched, vec![product]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_timeout_keeps_displays() {
        let product = candidate();
        let product_id = product.id;
        let image = Uuid::new_v4();

        let mut catalog = MockCatalogStore::new();
        catalog.expect_product_displays().returning(move |_| {
            Ok(HashMap::from([(
                product_id,
                display(image, Uuid::new_v4(), Uuid::new_v4()),
            )]))
        });

        let enricher = Enricher::new(
            Arc::new(catalog),
            Arc::new(StalledMedia),
            Duration::from_millis(200),
        );
        let enriched = enricher.enrich(vec![product]).await;

        let display = enriched[0].display.as_ref().unwrap();
        assert_eq!(display.images[0].media_id, image);
        assert!(display.images.iter().all(|a| a.record.is_none()));
    }
}
