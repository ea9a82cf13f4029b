//! Default products written into a fresh file store.

use chrono::{DateTime, Utc};

use gatepass_core::ProductId;
use gatepass_inventory::{DEFAULT_DESTINATION, Product, ProductType, TransportMode};

struct SeedProduct {
    product_id: &'static str,
    name: &'static str,
    transport: TransportMode,
    description: &'static str,
    quantity: i64,
    origin: &'static str,
    product_type: ProductType,
    remarks: &'static str,
}

const DEFAULTS: [SeedProduct; 3] = [
    SeedProduct {
        product_id: "PRD-001-2025",
        name: "Wireless Headphones",
        transport: TransportMode::Air,
        description: "Bluetooth 5.0 wireless headphones with noise cancellation",
        quantity: 150,
        origin: "Mumbai GIS",
        product_type: ProductType::Electronics,
        remarks: "Fragile - Handle with care",
    },
    SeedProduct {
        product_id: "PRD-002-2025",
        name: "Cotton T-Shirts",
        transport: TransportMode::Road,
        description: "100% cotton casual t-shirts in various sizes",
        quantity: 500,
        origin: "Bangalore GIS",
        product_type: ProductType::Clothing,
        remarks: "Bulk order for retail chain",
    },
    SeedProduct {
        product_id: "PRD-003-2025",
        name: "Organic Rice",
        transport: TransportMode::Rail,
        description: "Premium basmati rice, organically grown",
        quantity: 1000,
        origin: "Punjab GIS",
        product_type: ProductType::Food,
        remarks: "Temperature controlled storage required",
    },
];

pub fn default_products(now: DateTime<Utc>) -> Vec<Product> {
    DEFAULTS
        .iter()
        .map(|seed| Product {
            product_id: ProductId::from_static(seed.product_id),
            name: seed.name.to_string(),
            transport: seed.transport,
            description: Some(seed.description.to_string()),
            quantity: seed.quantity,
            origin: seed.origin.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            product_type: seed.product_type,
            remarks: Some(seed.remarks.to_string()),
            created_at: now,
            updated_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_distinct() {
        let products = default_products(Utc::now());
        assert_eq!(products.len(), 3);
        assert!(products.iter().all(|p| p.quantity > 0));

        let mut ids: Vec<_> = products.iter().map(|p| p.product_id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids, vec!["PRD-001-2025", "PRD-002-2025", "PRD-003-2025"]);
    }
}
