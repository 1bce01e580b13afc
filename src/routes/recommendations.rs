use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{RecommendationParams, RecommendationResult},
    routes::AppState,
};

/// Query string of `GET /api/v1/recommendations`; parsed by hand so that
/// malformed values produce the JSON error body
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub user_id: Option<String>,
    pub limit: Option<String>,
    /// Comma-separated product ids
    pub exclude: Option<String>,
}

fn parse_uuid(field: &str, raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidInput(format!("{} is not a valid identifier: {}", field, raw)))
}

impl TryFrom<RecommendationQuery> for RecommendationParams {
    type Error = AppError;

    fn try_from(query: RecommendationQuery) -> AppResult<Self> {
        let user_id = match query.user_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_uuid("user_id", raw)?),
        };

        let limit = match query.limit.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                AppError::InvalidInput(format!("limit must be an integer, got {}", raw))
            })?),
        };

        let exclude_product_ids = query
            .exclude
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_uuid("exclude", raw))
            .collect::<AppResult<Vec<Uuid>>>()?;

        Ok(Self {
            user_id,
            limit,
            exclude_product_ids,
        })
    }
}

/// `GET /api/v1/recommendations?user_id=..&limit=..&exclude=a,b`
pub async fn recommend_query(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResult>> {
    let params = RecommendationParams::try_from(query)?;
    run(&state, &request_id, params).await
}

/// `POST /api/v1/recommendations` with a JSON body
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<RecommendationParams>, JsonRejection>,
) -> AppResult<Json<RecommendationResult>> {
    let Json(params) = body.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    run(&state, &request_id, params).await
}

async fn run(
    state: &AppState,
    request_id: &RequestId,
    params: RecommendationParams,
) -> AppResult<Json<RecommendationResult>> {
    tracing::info!(
        request_id = %request_id,
        user_id = ?params.user_id,
        limit = ?params.limit,
        exclude_count = params.exclude_product_ids.len(),
        "Processing recommendation request"
    );

    let result = state.engine.get_recommendations(params).await?;

    tracing::info!(
        request_id = %request_id,
        source = %result.source,
        count = result.products.len(),
        "Recommendation request completed"
    );

    Ok(Json(result))
}
