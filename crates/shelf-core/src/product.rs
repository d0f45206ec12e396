//! # Product Types
//!
//! The catalog entity and its create/update body.
//!
//! ## Identity
//! `id` is server-assigned, stable, and unique. The client never invents
//! ids and never reuses one for a different product instance within a
//! session. `ProductDraft` is the write body: a product with the `id`
//! stripped, used for creates (including undo restores) and updates.

use serde::{Deserialize, Serialize};

/// Server-assigned product identifier.
pub type ProductId = i64;

// =============================================================================
// Product
// =============================================================================

/// A catalog product as the server represents it.
///
/// Wire format is camelCase JSON (`imageUrl`); `stock` and `imageUrl`
/// are optional and may be absent entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (server-assigned).
    pub id: ProductId,

    /// Display name.
    pub name: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Category label.
    pub category: String,

    /// Units on hand, when the catalog tracks stock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,

    /// Optional product image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Returns the write body for this product: every field except `id`.
    ///
    /// Used by the undo flow, which re-creates a deleted product and
    /// must let the server assign a fresh id.
    pub fn draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            sku: self.sku.clone(),
            category: self.category.clone(),
            stock: self.stock,
            image_url: self.image_url.clone(),
        }
    }
}

// =============================================================================
// Product Draft
// =============================================================================

/// Create/update request body: product fields minus `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    /// Display name.
    pub name: String,

    /// Stock Keeping Unit.
    pub sku: String,

    /// Category label.
    pub category: String,

    /// Units on hand, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,

    /// Optional product image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductDraft {
    /// Convenience constructor for the common three-field case.
    pub fn new(name: impl Into<String>, sku: impl Into<String>, category: impl Into<String>) -> Self {
        ProductDraft {
            name: name.into(),
            sku: sku.into(),
            category: category.into(),
            stock: None,
            image_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        Product {
            id: 7,
            name: "Milk 1L".into(),
            sku: "MILK-001".into(),
            category: "Dairy".into(),
            stock: Some(12),
            image_url: None,
        }
    }

    #[test]
    fn draft_strips_id() {
        let draft = sample().draft();
        let json = serde_json::to_value(&draft).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["name"], "Milk 1L");
        assert_eq!(json["sku"], "MILK-001");
        assert_eq!(json["stock"], 12);
    }

    #[test]
    fn optional_fields_omitted_when_absent() {
        let draft = ProductDraft::new("Bread", "BREAD-001", "Bakery");
        let json = serde_json::to_string(&draft).unwrap();
        assert!(!json.contains("stock"));
        assert!(!json.contains("imageUrl"));
    }

    #[test]
    fn product_roundtrips_camel_case() {
        let json = r#"{"id":3,"name":"Eggs 12pcs","sku":"EGG-012","category":"Poultry","imageUrl":"https://cdn/x.png"}"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, 3);
        assert_eq!(p.image_url.as_deref(), Some("https://cdn/x.png"));
        assert_eq!(p.stock, None);

        let back = serde_json::to_string(&p).unwrap();
        assert!(back.contains("\"imageUrl\""));
    }
}
