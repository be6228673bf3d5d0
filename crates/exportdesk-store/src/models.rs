//! Domain records persisted by every [`Store`](crate::Store) backend.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be written to
//! the memory backend's snapshot and handed directly to the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exportdesk_shared::{
    MessageId, ProductCategory, ProductId, RfqId, RfqStatus, Role, SenderType, UserId,
};

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A catalog entry buyers can request quotes for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// URL-safe key derived from `name`, unique across the catalog.
    pub slug: String,
    pub category: ProductCategory,
    pub short_description: String,
    pub full_description: String,
    /// Image URLs; the first one is the main image.
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub featured: bool,
    /// Minimum order quantity.
    pub moq: u32,
    pub export_highlight: String,
    pub payment_terms: Vec<String>,
    pub customization_note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn main_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Identity-side data about a user, read by the core for authorization and
/// display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub company_name: Option<String>,
    pub country: String,
    pub state: String,
    pub city: String,
    /// Two-digit display code.
    pub user_code: String,
    pub role: Role,
    /// Deactivated users can no longer act.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The contact fields a user may change on their own profile.  `None`
/// leaves a field as it is; an empty `company_name` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the contact fields present in this update.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if let Some(email) = &self.email {
            profile.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            profile.phone = phone.clone();
        }
        if let Some(company) = &self.company_name {
            profile.company_name = Some(company.clone()).filter(|c| !c.is_empty());
        }
        if let Some(country) = &self.country {
            profile.country = country.clone();
        }
        if let Some(state) = &self.state {
            profile.state = state.clone();
        }
        if let Some(city) = &self.city {
            profile.city = city.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// RFQ
// ---------------------------------------------------------------------------

/// A buyer's Request For Quotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rfq {
    pub id: RfqId,
    /// Owning buyer.  Never changes after creation.
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub target_price: Option<String>,
    /// Destination country.
    pub country: String,
    /// Buyer's requirements.
    pub message: String,
    pub status: RfqStatus,
    /// Starts at 1 and increases with every status write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for an RFQ.  The store assigns id, status, version and
/// timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRfq {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub target_price: Option<String>,
    pub country: String,
    pub message: String,
}

/// Row filter for [`Store::list_rfqs`](crate::Store::list_rfqs).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RfqQuery {
    pub owner: Option<UserId>,
    pub status: Option<RfqStatus>,
    pub product: Option<ProductId>,
}

impl RfqQuery {
    pub fn matches(&self, rfq: &Rfq) -> bool {
        self.owner.map_or(true, |owner| rfq.user_id == owner)
            && self.status.map_or(true, |status| rfq.status == status)
            && self.product.map_or(true, |product| rfq.product_id == product)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One entry in an RFQ thread.  Messages are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub rfq_id: RfqId,
    pub sender_type: SenderType,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub rfq_id: RfqId,
    pub sender_type: SenderType,
    pub sender_id: UserId,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

/// What a user purge removed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurgeReport {
    pub rfqs_deleted: u64,
    pub messages_deleted: u64,
    pub profile_deleted: bool,
}
