//! # shelf-core: Pure Catalog Domain
//!
//! Domain types and logic for the catalog sync layer. Nothing in this
//! crate performs I/O; the network and timer concerns live in
//! `shelf-sync`.
//!
//! ## Module Organization
//! - [`product`] - `Product`, `ProductDraft`, `ProductId`
//! - [`event`] - `ChangeEvent` tagged change notifications
//! - [`collection`] - `ProductCollection` ordered mapping + merge rules
//! - [`stats`] - aggregate counters derived from the collection
//!
//! ## Usage
//! ```rust
//! use shelf_core::{ChangeEvent, Product, ProductCollection};
//!
//! let mut catalog = ProductCollection::new();
//! catalog.apply(ChangeEvent::Created(Product {
//!     id: 1,
//!     name: "Milk 1L".into(),
//!     sku: "MILK-001".into(),
//!     category: "Dairy".into(),
//!     stock: None,
//!     image_url: None,
//! }));
//! assert_eq!(catalog.len(), 1);
//! ```

pub mod collection;
pub mod event;
pub mod product;
pub mod stats;

// =============================================================================
// Re-exports
// =============================================================================

pub use collection::{MergeOutcome, ProductCollection};
pub use event::ChangeEvent;
pub use product::{Product, ProductDraft, ProductId};
pub use stats::{CatalogStats, CategoryCount, LOW_STOCK_THRESHOLD};
