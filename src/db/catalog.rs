use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::{CandidateFilter, CatalogQuery, CatalogStore};
use crate::{
    error::AppResult,
    models::{
        MediaAttachment, ProductCandidate, ProductDisplay, ProductPolicy, VariantDisplay,
        VerificationStatus,
    },
    services::ranker::TieBreakPredicate,
};

const CANDIDATE_COLUMNS: &str = "SELECT p.id, p.name, p.slug, p.category_id, p.sub_category_id, \
     p.product_type_id, p.brand_id, p.is_best_seller, p.created_at FROM products p";

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    name: String,
    slug: String,
    category_id: Uuid,
    sub_category_id: Option<Uuid>,
    product_type_id: Option<Uuid>,
    brand_id: Option<Uuid>,
    is_best_seller: bool,
    created_at: DateTime<Utc>,
}

impl From<CandidateRow> for ProductCandidate {
    fn from(row: CandidateRow) -> Self {
        ProductCandidate {
            id: row.id,
            name: row.name,
            slug: row.slug,
            category_id: row.category_id,
            sub_category_id: row.sub_category_id,
            product_type_id: row.product_type_id,
            brand_id: row.brand_id,
            is_best_seller: row.is_best_seller,
            created_at: row.created_at,
            display: None,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DisplayRow {
    id: Uuid,
    price_cents: i64,
    currency: String,
    media_ids: Vec<Uuid>,
    certificate_media_ids: Vec<Uuid>,
    returnable: bool,
    return_window_days: Option<i32>,
    warranty_months: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    sku: String,
    name: String,
    price_cents: i64,
    media_ids: Vec<Uuid>,
}

/// Catalog reads against PostgreSQL
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds the eligible-products statement for a catalog query
fn build_eligible_query(query: &CatalogQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(CANDIDATE_COLUMNS);

    builder
        .push(
            " WHERE p.is_published AND p.is_active AND p.is_available \
             AND p.deleted_at IS NULL AND cardinality(p.media_ids) > 0 \
             AND p.verification_status = ",
        )
        .push_bind(VerificationStatus::Approved.as_str());

    let restriction = match &query.filter {
        CandidateFilter::Unrestricted => None,
        CandidateFilter::Categories(ids) => Some(("p.category_id", ids)),
        CandidateFilter::SubCategories(ids) => Some(("p.sub_category_id", ids)),
        CandidateFilter::ProductTypes(ids) => Some(("p.product_type_id", ids)),
        CandidateFilter::Brands(ids) => Some(("p.brand_id", ids)),
    };
    if let Some((column, ids)) = restriction {
        builder
            .push(format!(" AND {} = ANY(", column))
            .push_bind(ids.clone())
            .push(")");
    }

    if !query.exclude.is_empty() {
        builder
            .push(" AND NOT (p.id = ANY(")
            .push_bind(query.exclude.clone())
            .push("))");
    }

    builder.push(" ORDER BY ");
    for predicate in &query.order {
        push_order_term(&mut builder, *predicate, query);
    }
    builder.push("p.id ASC LIMIT ").push_bind(query.limit as i64);

    builder
}

fn push_order_term(
    builder: &mut QueryBuilder<'static, Postgres>,
    predicate: TieBreakPredicate,
    query: &CatalogQuery,
) {
    let membership = match predicate {
        TieBreakPredicate::SameCategory => Some(("p.category_id", &query.hints.category_ids)),
        TieBreakPredicate::SameBrand => Some(("p.brand_id", &query.hints.brand_ids)),
        TieBreakPredicate::SameProductType => {
            Some(("p.product_type_id", &query.hints.product_type_ids))
        }
        TieBreakPredicate::BestSeller => {
            builder.push("CASE WHEN p.is_best_seller THEN 0 ELSE 1 END, ");
            None
        }
        TieBreakPredicate::Newest => {
            builder.push("p.created_at DESC, ");
            None
        }
    };

    // An empty hint axis carries no ordering information
    if let Some((column, ids)) = membership {
        if !ids.is_empty() {
            builder
                .push(format!("CASE WHEN {} = ANY(", column))
                .push_bind(ids.clone())
                .push(") THEN 0 ELSE 1 END, ");
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn eligible_products(&self, query: &CatalogQuery) -> AppResult<Vec<ProductCandidate>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<CandidateRow> = build_eligible_query(query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            filter = ?query.filter,
            excluded = query.exclude.len(),
            rows = rows.len(),
            "Eligible products fetched"
        );

        Ok(rows.into_iter().map(ProductCandidate::from).collect())
    }

    async fn product_displays(
        &self,
        product_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, ProductDisplay>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let products: Vec<DisplayRow> = sqlx::query_as(
            r#"
            SELECT id, price_cents, currency, media_ids, certificate_media_ids,
                   returnable, return_window_days, warranty_months
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        let variants: Vec<VariantRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, sku, name, price_cents, media_ids
            FROM product_variants
            WHERE product_id = ANY($1) AND deleted_at IS NULL
            ORDER BY product_id, position, id
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut variants_by_product: HashMap<Uuid, Vec<VariantDisplay>> = HashMap::new();
        for variant in variants {
            variants_by_product
                .entry(variant.product_id)
                .or_default()
                .push(VariantDisplay {
                    id: variant.id,
                    sku: variant.sku,
                    name: variant.name,
                    price_cents: variant.price_cents,
                    images: attachments(variant.media_ids),
                });
        }

        let displays = products
            .into_iter()
            .map(|row| {
                let display = ProductDisplay {
                    price_cents: row.price_cents,
                    currency: row.currency,
                    images: attachments(row.media_ids),
                    variants: variants_by_product.remove(&row.id).unwrap_or_default(),
                    certificates: attachments(row.certificate_media_ids),
                    policy: ProductPolicy {
                        returnable: row.returnable,
                        return_window_days: row.return_window_days,
                        warranty_months: row.warranty_months,
                    },
                };
                (row.id, display)
            })
            .collect();

        Ok(displays)
    }
}

fn attachments(media_ids: Vec<Uuid>) -> Vec<MediaAttachment> {
    media_ids.into_iter().map(MediaAttachment::unresolved).collect()
}
