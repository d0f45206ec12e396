//! # Change Events
//!
//! A `ChangeEvent` describes one mutation of the authoritative catalog,
//! regardless of where it originated: decoded push-channel frames and
//! local optimistic mutations both reduce to the same three cases, so
//! the collection merges them with one set of rules.

use crate::product::{Product, ProductId};

/// A single catalog mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A product was created.
    Created(Product),

    /// An existing product was replaced wholesale.
    Updated(Product),

    /// The product with this id was removed.
    Deleted(ProductId),
}

impl ChangeEvent {
    /// Returns the event kind as a string (for logging).
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Created(_) => "created",
            ChangeEvent::Updated(_) => "updated",
            ChangeEvent::Deleted(_) => "deleted",
        }
    }

    /// Returns the id of the product this event concerns.
    pub fn product_id(&self) -> ProductId {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Updated(p) => p.id,
            ChangeEvent::Deleted(id) => *id,
        }
    }
}
