use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatepass_core::{DomainError, DomainResult, Entity, GatePassNumber, ProductId};

use crate::product::{ProductType, TransportMode};

/// Facility a gate pass ships from when the caller does not name one.
pub const DEFAULT_GATE_PASS_ORIGIN: &str = "VEMAGIRI GIS";

/// One product entry on a gate pass.
///
/// Descriptive fields are a frozen copy of what the caller submitted; they are
/// never refreshed from the product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentLineItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub selected_quantity: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Gate pass payload before a number and issuance time are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePassDraft {
    pub date: String,
    pub origin: String,
    pub destination: String,
    pub products: Vec<ShipmentLineItem>,
    pub prepared_by: String,
    pub checked_by: Option<String>,
    pub authorized_by: Option<String>,
}

impl GatePassDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.date.trim().is_empty() {
            return Err(DomainError::validation("date cannot be empty"));
        }
        if self.origin.trim().is_empty() {
            return Err(DomainError::validation("from cannot be empty"));
        }
        if self.destination.trim().is_empty() {
            return Err(DomainError::validation("to cannot be empty"));
        }
        if self.prepared_by.trim().is_empty() {
            return Err(DomainError::validation("preparedBy cannot be empty"));
        }
        if self.products.is_empty() {
            return Err(DomainError::validation("a gate pass needs at least one product"));
        }
        for (idx, item) in self.products.iter().enumerate() {
            if item.selected_quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "products[{idx}].selectedQuantity must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Validate and stamp the draft into an immutable gate pass.
    pub fn issue(self, number: GatePassNumber, now: DateTime<Utc>) -> DomainResult<GatePass> {
        self.validate()?;
        Ok(GatePass::rehydrate(number, self, now))
    }
}

/// An issued gate pass. Immutable: there are no setters and no way back to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePass {
    gate_pass_number: GatePassNumber,
    date: String,
    #[serde(rename = "from")]
    origin: String,
    #[serde(rename = "to")]
    destination: String,
    products: Vec<ShipmentLineItem>,
    prepared_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authorized_by: Option<String>,
    generated_at: DateTime<Utc>,
}

impl Entity for GatePass {
    type Id = GatePassNumber;

    fn id(&self) -> &Self::Id {
        &self.gate_pass_number
    }
}

impl GatePass {
    /// Rebuild a gate pass from stored parts (storage adapters only; no validation).
    pub fn rehydrate(number: GatePassNumber, draft: GatePassDraft, generated_at: DateTime<Utc>) -> Self {
        Self {
            gate_pass_number: number,
            date: draft.date,
            origin: draft.origin,
            destination: draft.destination,
            products: draft.products,
            prepared_by: draft.prepared_by,
            checked_by: draft.checked_by,
            authorized_by: draft.authorized_by,
            generated_at,
        }
    }

    pub fn gate_pass_number(&self) -> &GatePassNumber {
        &self.gate_pass_number
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn products(&self) -> &[ShipmentLineItem] {
        &self.products
    }

    pub fn prepared_by(&self) -> &str {
        &self.prepared_by
    }

    pub fn checked_by(&self) -> Option<&str> {
        self.checked_by.as_deref()
    }

    pub fn authorized_by(&self) -> Option<&str> {
        self.authorized_by.as_deref()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Total units shipped across all line items.
    pub fn total_units(&self) -> i64 {
        self.products.iter().map(|p| p.selected_quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, qty: i64) -> ShipmentLineItem {
        ShipmentLineItem {
            product_id: id.parse().unwrap(),
            name: "Wireless Headphones".to_string(),
            transport: Some(TransportMode::Air),
            description: None,
            selected_quantity: qty,
            product_type: Some(ProductType::Electronics),
            remarks: Some("Fragile".to_string()),
        }
    }

    fn draft(products: Vec<ShipmentLineItem>) -> GatePassDraft {
        GatePassDraft {
            date: "2025-01-15".to_string(),
            origin: DEFAULT_GATE_PASS_ORIGIN.to_string(),
            destination: "Rajahmundry".to_string(),
            products,
            prepared_by: "Store Keeper".to_string(),
            checked_by: None,
            authorized_by: Some("Manager".to_string()),
        }
    }

    #[test]
    fn issue_stamps_number_and_time() {
        let now = Utc::now();
        let pass = draft(vec![line("PRD-001", 50)])
            .issue(GatePassNumber::from_millis(1_735_689_600_123), now)
            .unwrap();

        assert_eq!(pass.gate_pass_number().as_str(), "GP-600123");
        assert_eq!(pass.generated_at(), now);
        assert_eq!(pass.products(), &[line("PRD-001", 50)]);
        assert_eq!(pass.total_units(), 50);
    }

    #[test]
    fn issue_rejects_non_positive_selection() {
        let err = draft(vec![line("PRD-001", 0)])
            .issue(GatePassNumber::from_millis(1), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("products[0]")));
    }

    #[test]
    fn issue_rejects_missing_required_fields() {
        let mut no_preparer = draft(vec![line("PRD-001", 1)]);
        no_preparer.prepared_by = " ".to_string();
        assert!(no_preparer.validate().is_err());

        let mut no_destination = draft(vec![line("PRD-001", 1)]);
        no_destination.destination = String::new();
        assert!(no_destination.validate().is_err());

        assert!(draft(vec![]).validate().is_err());
    }

    #[test]
    fn gate_pass_json_uses_wire_field_names() {
        let pass = draft(vec![line("PRD-001", 5)])
            .issue(GatePassNumber::from_millis(42), Utc::now())
            .unwrap();
        let json = serde_json::to_value(&pass).unwrap();

        assert_eq!(json["gatePassNumber"], "GP-000042");
        assert_eq!(json["from"], "VEMAGIRI GIS");
        assert_eq!(json["preparedBy"], "Store Keeper");
        assert_eq!(json["products"][0]["selectedQuantity"], 5);
        assert_eq!(json["products"][0]["type"], "Electronics");
        assert!(json.get("checkedBy").is_none());

        let back: GatePass = serde_json::from_value(json).unwrap();
        assert_eq!(back, pass);
    }
}
