use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{CatalogQuery, CatalogStore, SignalStore};
use crate::{
    error::AppResult,
    models::{
        BrowsingEventKind, MediaAttachment, MediaRecord, OrderStatus, ProductCandidate,
        ProductDisplay, ProductPolicy, SearchMatch, SignalProduct, VerificationStatus,
    },
    services::{media::MediaResolver, ranker},
};

/// A catalog row with the flags that decide eligibility
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub product: ProductCandidate,
    pub display: ProductDisplay,
    pub is_published: bool,
    pub is_active: bool,
    pub is_available: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub verification_status: VerificationStatus,
}

impl CatalogEntry {
    /// An eligible product with one image, created now
    pub fn new(name: &str, category_id: Uuid) -> Self {
        Self {
            product: ProductCandidate {
                id: Uuid::new_v4(),
                name: name.to_string(),
                slug: name.to_lowercase().replace(' ', "-"),
                category_id,
                sub_category_id: None,
                product_type_id: None,
                brand_id: None,
                is_best_seller: false,
                created_at: Utc::now(),
                display: None,
            },
            display: ProductDisplay {
                price_cents: 1000,
                currency: "USD".to_string(),
                images: vec![MediaAttachment::unresolved(Uuid::new_v4())],
                variants: Vec::new(),
                certificates: Vec::new(),
                policy: ProductPolicy::default(),
            },
            is_published: true,
            is_active: true,
            is_available: true,
            deleted_at: None,
            verification_status: VerificationStatus::Approved,
        }
    }

    pub fn id(&self) -> Uuid {
        self.product.id
    }

    pub fn with_brand(mut self, brand_id: Uuid) -> Self {
        self.product.brand_id = Some(brand_id);
        self
    }

    pub fn with_product_type(mut self, product_type_id: Uuid) -> Self {
        self.product.product_type_id = Some(product_type_id);
        self
    }

    pub fn best_seller(mut self) -> Self {
        self.product.is_best_seller = true;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.product.created_at = created_at;
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted_at = Some(Utc::now());
        self
    }

    pub fn with_verification(mut self, status: VerificationStatus) -> Self {
        self.verification_status = status;
        self
    }

    pub fn without_media(mut self) -> Self {
        self.display.images.clear();
        self
    }

    pub fn is_eligible(&self) -> bool {
        self.is_published
            && self.is_active
            && self.is_available
            && self.deleted_at.is_none()
            && self.verification_status == VerificationStatus::Approved
            && !self.display.images.is_empty()
    }

    fn signal_product(&self) -> SignalProduct {
        SignalProduct {
            product_id: self.product.id,
            category_id: self.product.category_id,
            sub_category_id: self.product.sub_category_id,
            product_type_id: self.product.product_type_id,
            brand_id: self.product.brand_id,
        }
    }
}

#[derive(Debug, Clone)]
struct OrderRecord {
    user_id: Uuid,
    status: OrderStatus,
    product_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ProductEvent {
    user_id: Uuid,
    product_id: Uuid,
    kind: Option<BrowsingEventKind>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SearchRecord {
    user_id: Uuid,
    matched: SearchMatch,
    created_at: DateTime<Utc>,
}

/// Catalog, signal sources and media held in memory.
///
/// Implements every store trait the engine consumes; used by tests and for
/// running the service without a database.
#[derive(Default)]
pub struct InMemoryStore {
    products: RwLock<Vec<CatalogEntry>>,
    orders: RwLock<Vec<OrderRecord>>,
    wishlist: RwLock<Vec<ProductEvent>>,
    browsing: RwLock<Vec<ProductEvent>>,
    searches: RwLock<Vec<SearchRecord>>,
    media: RwLock<HashMap<Uuid, MediaRecord>>,
}

/// Newest first; among equal timestamps, the later insert first
fn most_recent_first<T>(mut rows: Vec<(usize, T)>, at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|(ia, a), (ib, b)| at(b).cmp(&at(a)).then(ib.cmp(ia)));
    rows.into_iter().map(|(_, row)| row).collect()
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, entry: CatalogEntry) -> Uuid {
        let id = entry.id();
        self.products.write().await.push(entry);
        id
    }

    pub async fn record_order(
        &self,
        user_id: Uuid,
        status: OrderStatus,
        product_ids: Vec<Uuid>,
        created_at: DateTime<Utc>,
    ) {
        self.orders.write().await.push(OrderRecord {
            user_id,
            status,
            product_ids,
            created_at,
        });
    }

    pub async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid, created_at: DateTime<Utc>) {
        let mut wishlist = self.wishlist.write().await;
        if wishlist
            .iter()
            .any(|row| row.user_id == user_id && row.product_id == product_id)
        {
            return;
        }
        wishlist.push(ProductEvent {
            user_id,
            product_id,
            kind: None,
            created_at,
        });
    }

    pub async fn record_browsing_event(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        kind: BrowsingEventKind,
        created_at: DateTime<Utc>,
    ) {
        self.browsing.write().await.push(ProductEvent {
            user_id,
            product_id,
            kind: Some(kind),
            created_at,
        });
    }

    pub async fn record_search(&self, user_id: Uuid, matched: SearchMatch, created_at: DateTime<Utc>) {
        self.searches.write().await.push(SearchRecord {
            user_id,
            matched,
            created_at,
        });
    }

    pub async fn insert_media(&self, record: MediaRecord) {
        self.media.write().await.insert(record.id, record);
    }

    /// Joins product events with the catalog, dropping unknown products
    async fn join_products(&self, events: Vec<ProductEvent>, limit: usize) -> Vec<SignalProduct> {
        let products = self.products.read().await;
        events
            .into_iter()
            .filter_map(|event| {
                products
                    .iter()
                    .find(|entry| entry.id() == event.product_id)
                    .map(CatalogEntry::signal_product)
            })
            .take(limit)
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn eligible_products(&self, query: &CatalogQuery) -> AppResult<Vec<ProductCandidate>> {
        let products = self.products.read().await;

        let candidates: Vec<ProductCandidate> = products
            .iter()
            .filter(|entry| entry.is_eligible())
            .filter(|entry| query.filter.matches(&entry.product))
            .filter(|entry| !query.exclude.contains(&entry.id()))
            .map(|entry| entry.product.clone())
            .collect();

        let mut ranked = ranker::rank(candidates, &query.hints, &query.order);
        ranked.truncate(query.limit);
        Ok(ranked)
    }

    async fn product_displays(
        &self,
        product_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, ProductDisplay>> {
        let products = self.products.read().await;
        Ok(products
            .iter()
            .filter(|entry| product_ids.contains(&entry.id()))
            .map(|entry| (entry.id(), entry.display.clone()))
            .collect())
    }
}

#[async_trait::async_trait]
impl SignalStore for InMemoryStore {
    async fn has_qualifying_orders(
        &self,
        user_id: Uuid,
        statuses: &[OrderStatus],
    ) -> AppResult<bool> {
        let orders = self.orders.read().await;
        Ok(orders.iter().any(|order| {
            order.user_id == user_id
                && statuses.contains(&order.status)
                && !order.product_ids.is_empty()
        }))
    }

    async fn recent_order_items(
        &self,
        user_id: Uuid,
        statuses: &[OrderStatus],
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>> {
        let orders: Vec<(usize, OrderRecord)> = self
            .orders
            .read()
            .await
            .iter()
            .filter(|order| order.user_id == user_id && statuses.contains(&order.status))
            .cloned()
            .enumerate()
            .collect();

        let items: Vec<ProductEvent> = most_recent_first(orders, |order| order.created_at)
            .into_iter()
            .flat_map(|order| {
                order.product_ids.into_iter().map(move |product_id| ProductEvent {
                    user_id,
                    product_id,
                    kind: None,
                    created_at: order.created_at,
                })
            })
            .collect();

        Ok(self.join_products(items, limit).await)
    }

    async fn recent_wishlist_items(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>> {
        let rows: Vec<(usize, ProductEvent)> = self
            .wishlist
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .enumerate()
            .collect();

        let rows = most_recent_first(rows, |row| row.created_at);
        Ok(self.join_products(rows, limit).await)
    }

    async fn recent_browsing_events(
        &self,
        user_id: Uuid,
        kinds: &[BrowsingEventKind],
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>> {
        let rows: Vec<(usize, ProductEvent)> = self
            .browsing
            .read()
            .await
            .iter()
            .filter(|row| {
                row.user_id == user_id && row.kind.is_some_and(|kind| kinds.contains(&kind))
            })
            .cloned()
            .enumerate()
            .collect();

        let rows = most_recent_first(rows, |row| row.created_at);
        Ok(self.join_products(rows, limit).await)
    }

    async fn recent_search_matches(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<SearchMatch>> {
        let rows: Vec<(usize, SearchRecord)> = self
            .searches
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && !row.matched.is_empty())
            .cloned()
            .enumerate()
            .collect();

        Ok(most_recent_first(rows, |row| row.created_at)
            .into_iter()
            .take(limit)
            .map(|row| row.matched)
            .collect())
    }
}

#[async_trait::async_trait]
impl MediaResolver for InMemoryStore {
    async fn resolve_media(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, MediaRecord>> {
        let media = self.media.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| media.get(id).map(|record| (*id, record.clone())))
            .collect())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
