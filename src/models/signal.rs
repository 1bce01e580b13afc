use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a recorded browsing event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BrowsingEventKind {
    View,
    Click,
    AddToCart,
}

impl BrowsingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowsingEventKind::View => "view",
            BrowsingEventKind::Click => "click",
            BrowsingEventKind::AddToCart => "add_to_cart",
        }
    }
}

/// A product referenced by a behavioural signal (order line, wishlist row,
/// browsing event) together with the catalog attributes hints are built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalProduct {
    pub product_id: Uuid,
    pub category_id: Uuid,
    pub sub_category_id: Option<Uuid>,
    pub product_type_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
}

/// Interpretation recorded for a past search query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchMatch {
    pub category_id: Option<Uuid>,
    pub sub_category_id: Option<Uuid>,
    pub product_type_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
}

impl SearchMatch {
    /// True when the query matched nothing in the catalog taxonomy
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.sub_category_id.is_none()
            && self.product_type_id.is_none()
            && self.brand_id.is_none()
    }
}

/// Affinity hints derived from one signal source.
///
/// Each axis holds unique identifiers. Insertion order is kept (most recent
/// signal first) so the first influencing identifier can be reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AffinityHints {
    pub category_ids: Vec<Uuid>,
    pub sub_category_ids: Vec<Uuid>,
    pub product_type_ids: Vec<Uuid>,
    pub brand_ids: Vec<Uuid>,
}

fn push_unique(ids: &mut Vec<Uuid>, id: Uuid) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

impl AffinityHints {
    pub fn add_category(&mut self, id: Uuid) {
        push_unique(&mut self.category_ids, id);
    }

    pub fn add_sub_category(&mut self, id: Uuid) {
        push_unique(&mut self.sub_category_ids, id);
    }

    pub fn add_product_type(&mut self, id: Uuid) {
        push_unique(&mut self.product_type_ids, id);
    }

    pub fn add_brand(&mut self, id: Uuid) {
        push_unique(&mut self.brand_ids, id);
    }

    pub fn is_empty(&self) -> bool {
        self.category_ids.is_empty()
            && self.sub_category_ids.is_empty()
            && self.product_type_ids.is_empty()
            && self.brand_ids.is_empty()
    }
}

/// Output of a signal extractor for one user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalExtraction {
    pub hints: AffinityHints,
    /// Products already tied to the signal; never recommended back
    pub implicated: Vec<Uuid>,
    pub sufficient_evidence: bool,
}

impl SignalExtraction {
    pub fn empty() -> Self {
        Self::default()
    }
}
