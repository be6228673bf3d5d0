use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseEnumError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Authenticated identity issued by the identity provider.
    UserId
);
uuid_id!(
    /// Catalog product identifier.
    ProductId
);
uuid_id!(
    /// Request For Quotation identifier.
    RfqId
);
uuid_id!(
    /// Thread message identifier.
    MessageId
);

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Role assigned to an actor by the identity provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Sender type
// ---------------------------------------------------------------------------

/// Which side of the conversation wrote a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Admin,
    User,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Admin => "admin",
            SenderType::User => "user",
        }
    }
}

impl From<Role> for SenderType {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => SenderType::Admin,
            Role::User => SenderType::User,
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(SenderType::Admin),
            "user" => Ok(SenderType::User),
            other => Err(ParseEnumError::new("sender type", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// RFQ status
// ---------------------------------------------------------------------------

/// Lifecycle status of an RFQ.  The wire form is case-sensitive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RfqStatus {
    #[default]
    Pending,
    #[serde(rename = "In Discussion")]
    InDiscussion,
    Closed,
}

impl RfqStatus {
    pub const ALL: [RfqStatus; 3] = [
        RfqStatus::Pending,
        RfqStatus::InDiscussion,
        RfqStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RfqStatus::Pending => "Pending",
            RfqStatus::InDiscussion => "In Discussion",
            RfqStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for RfqStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RfqStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RfqStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("rfq status", s))
    }
}

// ---------------------------------------------------------------------------
// Product category
// ---------------------------------------------------------------------------

/// Fixed catalog taxonomy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProductCategory {
    #[serde(rename = "Agricultural Products")]
    AgriculturalProducts,
    #[serde(rename = "Spices & Herbs")]
    SpicesAndHerbs,
    #[serde(rename = "Textiles & Fabrics")]
    TextilesAndFabrics,
    #[serde(rename = "Handicrafts & Decor")]
    HandicraftsAndDecor,
    #[serde(rename = "Food Products")]
    FoodProducts,
    #[serde(rename = "Leather Goods")]
    LeatherGoods,
    #[serde(rename = "Gems & Jewelry")]
    GemsAndJewelry,
    #[serde(rename = "Chemicals & Pharmaceuticals")]
    ChemicalsAndPharmaceuticals,
    #[serde(rename = "Machinery & Equipment")]
    MachineryAndEquipment,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 10] = [
        ProductCategory::AgriculturalProducts,
        ProductCategory::SpicesAndHerbs,
        ProductCategory::TextilesAndFabrics,
        ProductCategory::HandicraftsAndDecor,
        ProductCategory::FoodProducts,
        ProductCategory::LeatherGoods,
        ProductCategory::GemsAndJewelry,
        ProductCategory::ChemicalsAndPharmaceuticals,
        ProductCategory::MachineryAndEquipment,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::AgriculturalProducts => "Agricultural Products",
            ProductCategory::SpicesAndHerbs => "Spices & Herbs",
            ProductCategory::TextilesAndFabrics => "Textiles & Fabrics",
            ProductCategory::HandicraftsAndDecor => "Handicrafts & Decor",
            ProductCategory::FoodProducts => "Food Products",
            ProductCategory::LeatherGoods => "Leather Goods",
            ProductCategory::GemsAndJewelry => "Gems & Jewelry",
            ProductCategory::ChemicalsAndPharmaceuticals => "Chemicals & Pharmaceuticals",
            ProductCategory::MachineryAndEquipment => "Machinery & Equipment",
            ProductCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("product category", s))
    }
}
