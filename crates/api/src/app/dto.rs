use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use gatepass_core::{DomainError, DomainResult, ProductId};
use gatepass_inventory::{
    DEFAULT_DESTINATION, DEFAULT_GATE_PASS_ORIGIN, GatePassDraft, NewProduct, ShipmentLineItem,
};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/products`.
///
/// Fields stay loose here so that missing or malformed values surface as
/// validation errors naming the field, rather than as generic body rejections.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIntakeRequest {
    #[serde(default)]
    pub name: String,
    pub transport: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Value,
    #[serde(rename = "from", default)]
    pub origin: String,
    #[serde(rename = "to")]
    pub destination: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub remarks: Option<String>,
}

impl ProductIntakeRequest {
    pub fn into_intake(self) -> DomainResult<NewProduct> {
        let intake = NewProduct {
            name: self.name.trim().to_string(),
            transport: required_enum("transport", self.transport)?,
            description: non_blank(self.description),
            quantity: parse_quantity("quantity", &self.quantity)?,
            origin: self.origin.trim().to_string(),
            destination: non_blank(self.destination)
                .unwrap_or_else(|| DEFAULT_DESTINATION.to_string()),
            product_type: required_enum("type", self.product_type)?,
            remarks: non_blank(self.remarks),
        };
        intake.validate()?;
        Ok(intake)
    }
}

/// Body of `PATCH /api/products/:id/quantity`.
#[derive(Debug, Deserialize)]
pub struct QuantityOverrideRequest {
    #[serde(default)]
    pub quantity: Value,
}

impl QuantityOverrideRequest {
    pub fn quantity(&self) -> DomainResult<i64> {
        let quantity = parse_quantity("quantity", &self.quantity)?;
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        Ok(quantity)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub transport: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub selected_quantity: Value,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub remarks: Option<String>,
}

/// Body of `POST /api/gatepasses`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePassRequest {
    #[serde(default)]
    pub date: String,
    #[serde(rename = "from")]
    pub origin: Option<String>,
    #[serde(rename = "to", default)]
    pub destination: String,
    #[serde(default)]
    pub products: Vec<LineItemRequest>,
    #[serde(default)]
    pub prepared_by: String,
    pub checked_by: Option<String>,
    pub authorized_by: Option<String>,
}

impl GatePassRequest {
    pub fn into_draft(self) -> DomainResult<GatePassDraft> {
        let products = self
            .products
            .into_iter()
            .enumerate()
            .map(|(idx, item)| item.into_line_item(idx))
            .collect::<DomainResult<Vec<_>>>()?;

        let draft = GatePassDraft {
            date: self.date.trim().to_string(),
            origin: non_blank(self.origin).unwrap_or_else(|| DEFAULT_GATE_PASS_ORIGIN.to_string()),
            destination: self.destination.trim().to_string(),
            products,
            prepared_by: self.prepared_by.trim().to_string(),
            checked_by: non_blank(self.checked_by),
            authorized_by: non_blank(self.authorized_by),
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl LineItemRequest {
    fn into_line_item(self, idx: usize) -> DomainResult<ShipmentLineItem> {
        let product_id = ProductId::from_str(&self.product_id).map_err(|_| {
            DomainError::validation(format!("products[{idx}].productId is required"))
        })?;
        Ok(ShipmentLineItem {
            product_id,
            name: self.name,
            transport: optional_enum(self.transport)?,
            description: non_blank(self.description),
            selected_quantity: parse_quantity(
                &format!("products[{idx}].selectedQuantity"),
                &self.selected_quantity,
            )?,
            product_type: optional_enum(self.product_type)?,
            remarks: non_blank(self.remarks),
        })
    }
}

// -------------------------
// Field helpers
// -------------------------

/// Accept a JSON integer or a string holding one (`5`, `"5"`, `" 5 "`).
pub fn parse_quantity(field: &str, value: &Value) -> DomainResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| DomainError::validation(format!("{field} must be an integer")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_enum<T>(field: &str, value: Option<String>) -> DomainResult<T>
where
    T: FromStr<Err = DomainError>,
{
    match non_blank(value) {
        Some(raw) => raw.parse(),
        None => Err(DomainError::validation(format!("{field} is required"))),
    }
}

fn optional_enum<T>(value: Option<String>) -> DomainResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    non_blank(value).map(|raw| raw.parse()).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatepass_inventory::{ProductType, TransportMode};
    use serde_json::json;

    #[test]
    fn quantity_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_quantity("quantity", &json!(5)).unwrap(), 5);
        assert_eq!(parse_quantity("quantity", &json!(" 12 ")).unwrap(), 12);
        assert!(parse_quantity("quantity", &json!("five")).is_err());
        assert!(parse_quantity("quantity", &json!(2.5)).is_err());
        assert!(parse_quantity("quantity", &Value::Null).is_err());
    }

    #[test]
    fn intake_request_maps_wire_names_and_defaults() {
        let body: ProductIntakeRequest = serde_json::from_value(json!({
            "name": "Widget",
            "transport": "Multi-modal",
            "quantity": "5",
            "from": "X",
            "type": "Industrial",
            "remarks": "  "
        }))
        .unwrap();

        let intake = body.into_intake().unwrap();
        assert_eq!(intake.transport, TransportMode::MultiModal);
        assert_eq!(intake.product_type, ProductType::Industrial);
        assert_eq!(intake.quantity, 5);
        assert_eq!(intake.destination, DEFAULT_DESTINATION);
        assert_eq!(intake.remarks, None);
    }

    #[test]
    fn intake_request_reports_missing_type() {
        let body: ProductIntakeRequest = serde_json::from_value(json!({
            "name": "Widget", "transport": "Road", "quantity": 1, "from": "X"
        }))
        .unwrap();
        let err = body.into_intake().unwrap_err();
        assert_eq!(err, DomainError::validation("type is required"));
    }

    #[test]
    fn gate_pass_request_defaults_origin_and_names_bad_line() {
        let body: GatePassRequest = serde_json::from_value(json!({
            "date": "2025-05-05",
            "to": "Eluru",
            "preparedBy": "Clerk",
            "products": [{ "productId": "PRD-001-2025", "selectedQuantity": "3", "type": "Food" }]
        }))
        .unwrap();
        let draft = body.into_draft().unwrap();
        assert_eq!(draft.origin, DEFAULT_GATE_PASS_ORIGIN);
        assert_eq!(draft.products[0].selected_quantity, 3);
        assert_eq!(draft.products[0].product_type, Some(ProductType::Food));

        let body: GatePassRequest = serde_json::from_value(json!({
            "date": "2025-05-05",
            "to": "Eluru",
            "preparedBy": "Clerk",
            "products": [
                { "productId": "PRD-001-2025", "selectedQuantity": 1 },
                { "productId": "PRD-002-2025", "selectedQuantity": "lots" }
            ]
        }))
        .unwrap();
        let err = body.into_draft().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("products[1].selectedQuantity must be an integer")
        );
    }
}
