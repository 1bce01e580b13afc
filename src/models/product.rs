use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog verification state of a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// Read-only projection of a catalog product used for ranking and display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductCandidate {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub sub_category_id: Option<Uuid>,
    pub product_type_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub is_best_seller: bool,
    pub created_at: DateTime<Utc>,
    /// Attached once a tier has been accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<ProductDisplay>,
}

/// Display payload of a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDisplay {
    pub price_cents: i64,
    pub currency: String,
    pub images: Vec<MediaAttachment>,
    pub variants: Vec<VariantDisplay>,
    pub certificates: Vec<MediaAttachment>,
    pub policy: ProductPolicy,
}

impl ProductDisplay {
    /// Every media reference of the product, its variants and certificates
    pub fn media_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.images
            .iter()
            .chain(self.variants.iter().flat_map(|v| v.images.iter()))
            .chain(self.certificates.iter())
            .map(|attachment| attachment.media_id)
    }

    pub fn attachments_mut(&mut self) -> impl Iterator<Item = &mut MediaAttachment> {
        self.images
            .iter_mut()
            .chain(self.variants.iter_mut().flat_map(|v| v.images.iter_mut()))
            .chain(self.certificates.iter_mut())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantDisplay {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub images: Vec<MediaAttachment>,
}

/// A media reference and, once resolved, its record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaAttachment {
    pub media_id: Uuid,
    pub record: Option<MediaRecord>,
}

impl MediaAttachment {
    pub fn unresolved(media_id: Uuid) -> Self {
        Self {
            media_id,
            record: None,
        }
    }
}

/// Media record returned by the media service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRecord {
    pub id: Uuid,
    pub url: String,
    pub mime_type: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Return and warranty policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductPolicy {
    pub returnable: bool,
    pub return_window_days: Option<i32>,
    pub warranty_months: Option<i32>,
}
