//! # Push Channel Envelopes
//!
//! Wire format for inbound push frames:
//! ```json
//! { "type": "CREATE" | "UPDATE" | "DELETE", "product": { ... } }
//! ```
//! Every frame carries the full product, including deletes (the server
//! echoes the removed entity). Frames missing `type` or `product`, or
//! carrying an unknown `type`, fail to decode; the channel client logs
//! and drops them without closing the connection.

use serde::Deserialize;

use shelf_core::{ChangeEvent, Product};

/// Frame decode failure. Logged and dropped, never surfaced.
pub type DecodeError = serde_json::Error;

// =============================================================================
// Wire Envelope
// =============================================================================

#[derive(Debug, Deserialize)]
enum FrameKind {
    #[serde(rename = "CREATE")]
    Create,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

/// Raw inbound frame shape. Unknown extra fields are tolerated.
#[derive(Debug, Deserialize)]
struct PushFrame {
    #[serde(rename = "type")]
    kind: FrameKind,
    product: Product,
}

/// Decodes a raw text frame into a [`ChangeEvent`].
pub fn decode_frame(text: &str) -> Result<ChangeEvent, DecodeError> {
    let frame: PushFrame = serde_json::from_str(text)?;
    Ok(match frame.kind {
        FrameKind::Create => ChangeEvent::Created(frame.product),
        FrameKind::Update => ChangeEvent::Updated(frame.product),
        FrameKind::Delete => ChangeEvent::Deleted(frame.product.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = r#"{"id":4,"name":"Butter","sku":"BUT-001","category":"Dairy"}"#;

    #[test]
    fn decodes_create_update_delete() {
        let created = decode_frame(&format!(r#"{{"type":"CREATE","product":{PRODUCT}}}"#)).unwrap();
        assert!(matches!(created, ChangeEvent::Created(ref p) if p.id == 4));

        let updated = decode_frame(&format!(r#"{{"type":"UPDATE","product":{PRODUCT}}}"#)).unwrap();
        assert!(matches!(updated, ChangeEvent::Updated(_)));

        let deleted = decode_frame(&format!(r#"{{"type":"DELETE","product":{PRODUCT}}}"#)).unwrap();
        assert_eq!(deleted, ChangeEvent::Deleted(4));
    }

    #[test]
    fn rejects_frame_missing_type() {
        assert!(decode_frame(&format!(r#"{{"product":{PRODUCT}}}"#)).is_err());
    }

    #[test]
    fn rejects_frame_missing_product() {
        assert!(decode_frame(r#"{"type":"CREATE"}"#).is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(decode_frame(&format!(r#"{{"type":"UPSERT","product":{PRODUCT}}}"#)).is_err());
    }

    #[test]
    fn rejects_non_json() {
        assert!(decode_frame("not json at all").is_err());
    }

    #[test]
    fn tolerates_extra_fields() {
        let text = format!(r#"{{"type":"CREATE","product":{PRODUCT},"origin":"server-7"}}"#);
        assert!(decode_frame(&text).is_ok());
    }
}
