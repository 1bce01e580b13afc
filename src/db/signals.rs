use sqlx::PgPool;
use uuid::Uuid;

use super::store::SignalStore;
use crate::{
    error::AppResult,
    models::{BrowsingEventKind, OrderStatus, SearchMatch, SignalProduct},
};

#[derive(Debug, sqlx::FromRow)]
struct SignalProductRow {
    product_id: Uuid,
    category_id: Uuid,
    sub_category_id: Option<Uuid>,
    product_type_id: Option<Uuid>,
    brand_id: Option<Uuid>,
}

impl From<SignalProductRow> for SignalProduct {
    fn from(row: SignalProductRow) -> Self {
        SignalProduct {
            product_id: row.product_id,
            category_id: row.category_id,
            sub_category_id: row.sub_category_id,
            product_type_id: row.product_type_id,
            brand_id: row.brand_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SearchMatchRow {
    matched_category_id: Option<Uuid>,
    matched_sub_category_id: Option<Uuid>,
    matched_product_type_id: Option<Uuid>,
    matched_brand_id: Option<Uuid>,
}

impl From<SearchMatchRow> for SearchMatch {
    fn from(row: SearchMatchRow) -> Self {
        SearchMatch {
            category_id: row.matched_category_id,
            sub_category_id: row.matched_sub_category_id,
            product_type_id: row.matched_product_type_id,
            brand_id: row.matched_brand_id,
        }
    }
}

/// Order, wishlist, browsing and search-log reads against PostgreSQL
#[derive(Clone)]
pub struct PgSignalStore {
    pool: PgPool,
}

impl PgSignalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn status_names(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait::async_trait]
impl SignalStore for PgSignalStore {
    async fn has_qualifying_orders(
        &self,
        user_id: Uuid,
        statuses: &[OrderStatus],
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders o
                JOIN order_items oi ON oi.order_id = o.id
                WHERE o.user_id = $1 AND o.status = ANY($2)
            )
            "#,
        )
        .bind(user_id)
        .bind(status_names(statuses))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn recent_order_items(
        &self,
        user_id: Uuid,
        statuses: &[OrderStatus],
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>> {
        let rows: Vec<SignalProductRow> = sqlx::query_as(
            r#"
            SELECT oi.product_id, p.category_id, p.sub_category_id, p.product_type_id, p.brand_id
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.user_id = $1 AND o.status = ANY($2)
            ORDER BY o.created_at DESC, oi.id
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(status_names(statuses))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SignalProduct::from).collect())
    }

    async fn recent_wishlist_items(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>> {
        let rows: Vec<SignalProductRow> = sqlx::query_as(
            r#"
            SELECT w.product_id, p.category_id, p.sub_category_id, p.product_type_id, p.brand_id
            FROM wishlist_items w
            JOIN products p ON p.id = w.product_id
            WHERE w.user_id = $1
            ORDER BY w.created_at DESC, w.id
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SignalProduct::from).collect())
    }

    async fn recent_browsing_events(
        &self,
        user_id: Uuid,
        kinds: &[BrowsingEventKind],
        limit: usize,
    ) -> AppResult<Vec<SignalProduct>> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();

        let rows: Vec<SignalProductRow> = sqlx::query_as(
            r#"
            SELECT e.product_id, p.category_id, p.sub_category_id, p.product_type_id, p.brand_id
            FROM browsing_events e
            JOIN products p ON p.id = e.product_id
            WHERE e.user_id = $1 AND e.event_type = ANY($2)
            ORDER BY e.created_at DESC, e.id
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(kinds)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SignalProduct::from).collect())
    }

    async fn recent_search_matches(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<SearchMatch>> {
        let rows: Vec<SearchMatchRow> = sqlx::query_as(
            r#"
            SELECT matched_category_id, matched_sub_category_id,
                   matched_product_type_id, matched_brand_id
            FROM search_logs
            WHERE user_id = $1
              AND (matched_category_id IS NOT NULL
                   OR matched_sub_category_id IS NOT NULL
                   OR matched_product_type_id IS NOT NULL
                   OR matched_brand_id IS NOT NULL)
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SearchMatch::from).collect())
    }
}
