use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatepass_core::{DomainError, DomainResult, Entity, ProductId};

/// Destination facility assumed when intake does not name one.
pub const DEFAULT_DESTINATION: &str = "Vemagiri GIS";

macro_rules! string_enum {
    ($t:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $t {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($t::$variant => $text),+
                }
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($t::$variant),)+
                    other => Err(DomainError::validation(format!(
                        "{} must be one of: {} (got {:?})",
                        $field,
                        [$($text),+].join(", "),
                        other
                    ))),
                }
            }
        }
    };
}

/// How a product is moved between facilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    Road,
    Rail,
    Air,
    Sea,
    #[serde(rename = "Multi-modal")]
    MultiModal,
}

string_enum!(TransportMode, "transport", {
    Road => "Road",
    Rail => "Rail",
    Air => "Air",
    Sea => "Sea",
    MultiModal => "Multi-modal",
});

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    Electronics,
    Clothing,
    Food,
    Accessories,
    Healthcare,
    Industrial,
    Books,
    Furniture,
    Sports,
    Beauty,
}

string_enum!(ProductType, "type", {
    Electronics => "Electronics",
    Clothing => "Clothing",
    Food => "Food",
    Accessories => "Accessories",
    Healthcare => "Healthcare",
    Industrial => "Industrial",
    Books => "Books",
    Furniture => "Furniture",
    Sports => "Sports",
    Beauty => "Beauty",
});

fn default_destination() -> String {
    DEFAULT_DESTINATION.to_string()
}

/// A stocked product: units of one (name, type, origin) identity available at `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub transport: TransportMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: i64,
    #[serde(rename = "from")]
    pub origin: String,
    #[serde(rename = "to", default = "default_destination")]
    pub destination: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }
}

impl Product {
    /// Add received units to this product's stock.
    pub fn receive(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
        self.updated_at = now;
        Ok(())
    }

    /// Administrative override of the stored quantity.
    pub fn override_quantity(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        self.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    /// Record the stock left after a shipment was deducted.
    pub fn ship(&mut self, remaining: i64, now: DateTime<Utc>) {
        self.quantity = remaining;
        self.updated_at = now;
    }
}

/// Candidate product for intake (create or replenish).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub transport: TransportMode,
    pub description: Option<String>,
    pub quantity: i64,
    pub origin: String,
    pub destination: String,
    pub product_type: ProductType,
    pub remarks: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.origin.trim().is_empty() {
            return Err(DomainError::validation("from cannot be empty"));
        }
        if self.destination.trim().is_empty() {
            return Err(DomainError::validation("to cannot be empty"));
        }
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        Ok(())
    }

    /// Whether `product` is the same stock identity: name (case-insensitive),
    /// type and origin.
    pub fn matches(&self, product: &Product) -> bool {
        product.product_type == self.product_type
            && product.origin == self.origin
            && product.name.to_lowercase() == self.name.to_lowercase()
    }

    pub fn into_product(self, product_id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            product_id,
            name: self.name,
            transport: self.transport,
            description: self.description,
            quantity: self.quantity,
            origin: self.origin,
            destination: self.destination,
            product_type: self.product_type,
            remarks: self.remarks,
            created_at: now,
            updated_at: now,
        }
    }
}
