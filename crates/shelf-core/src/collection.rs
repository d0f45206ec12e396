//! # Product Collection
//!
//! The authoritative in-memory catalog: an ordered mapping from product
//! id to product. Order is whatever the server returned on the last full
//! load, with created entries appended.
//!
//! ## Merge Rules
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Created(p)  │ id present → ignored (guards against the race       │
//! │              │ between a local optimistic add and the server echo) │
//! │              │ id absent  → appended                               │
//! ├──────────────┼─────────────────────────────────────────────────────┤
//! │  Updated(p)  │ id present → replaced in place                      │
//! │              │ id absent  → ignored (no implicit creation; guards  │
//! │              │ against out-of-order delivery)                      │
//! ├──────────────┼─────────────────────────────────────────────────────┤
//! │  Deleted(id) │ id present → removed                                │
//! │              │ id absent  → ignored (duplicate notifications)      │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//! Every rule is idempotent, which is what makes the interleaving of
//! local optimistic mutations and remote events safe without locks.

use crate::event::ChangeEvent;
use crate::product::{Product, ProductId};

// =============================================================================
// Merge Outcome
// =============================================================================

/// What applying a [`ChangeEvent`] actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The product was appended to the collection.
    Inserted,
    /// The product replaced an existing entry with the same id.
    Replaced,
    /// The entry with the event's id was removed.
    Removed,
    /// The event had no effect (idempotent duplicate or out-of-order).
    Ignored,
}

// =============================================================================
// Product Collection
// =============================================================================

/// Ordered id -> product mapping.
///
/// Invariant: exactly one entry per id. Only the sync controller mutates
/// this; every other component reads a derived view.
#[derive(Debug, Clone, Default)]
pub struct ProductCollection {
    items: Vec<Product>,
}

impl ProductCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entire contents (initial load / reconciliation).
    ///
    /// Deduplicates defensively on id, keeping the first occurrence, so
    /// the one-entry-per-id invariant holds even against a misbehaving
    /// server response.
    pub fn replace_all(&mut self, products: Vec<Product>) {
        self.items.clear();
        for p in products {
            if !self.contains(p.id) {
                self.items.push(p);
            }
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Applies a change event using the idempotent merge rules.
    pub fn apply(&mut self, event: ChangeEvent) -> MergeOutcome {
        match event {
            ChangeEvent::Created(p) => {
                if self.contains(p.id) {
                    MergeOutcome::Ignored
                } else {
                    self.items.push(p);
                    MergeOutcome::Inserted
                }
            }
            ChangeEvent::Updated(p) => match self.position(p.id) {
                Some(idx) => {
                    self.items[idx] = p;
                    MergeOutcome::Replaced
                }
                None => MergeOutcome::Ignored,
            },
            ChangeEvent::Deleted(id) => match self.position(id) {
                Some(idx) => {
                    self.items.remove(idx);
                    MergeOutcome::Removed
                }
                None => MergeOutcome::Ignored,
            },
        }
    }

    /// Removes and returns the product with the given id, if present.
    pub fn remove(&mut self, id: ProductId) -> Option<Product> {
        self.position(id).map(|idx| self.items.remove(idx))
    }

    /// Returns the product with the given id, if present.
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.items.iter().find(|p| p.id == id)
    }

    /// Returns true if an entry with this id exists.
    pub fn contains(&self, id: ProductId) -> bool {
        self.position(id).is_some()
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.items.iter()
    }

    /// Case-insensitive filter over name, SKU, and category.
    ///
    /// An empty query matches everything.
    pub fn filtered(&self, query: &str) -> Vec<&Product> {
        let q = query.to_lowercase();
        self.items
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&q)
                    || p.sku.to_lowercase().contains(&q)
                    || p.category.to_lowercase().contains(&q)
            })
            .collect()
    }

    fn position(&self, id: ProductId) -> Option<usize> {
        self.items.iter().position(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: ProductId, name: &str) -> Product {
        Product {
            id,
            name: name.into(),
            sku: format!("SKU-{id:03}"),
            category: "General".into(),
            stock: None,
            image_url: None,
        }
    }

    fn seeded() -> ProductCollection {
        let mut c = ProductCollection::new();
        c.replace_all(vec![product(1, "A"), product(2, "B")]);
        c
    }

    #[test]
    fn created_inserts_once() {
        let mut c = seeded();
        assert_eq!(c.apply(ChangeEvent::Created(product(3, "C"))), MergeOutcome::Inserted);
        // Duplicate create (e.g. server echo of a local add) is ignored.
        assert_eq!(c.apply(ChangeEvent::Created(product(3, "C"))), MergeOutcome::Ignored);
        assert_eq!(c.len(), 3);
        assert_eq!(c.iter().filter(|p| p.id == 3).count(), 1);
    }

    #[test]
    fn updated_replaces_in_place() {
        let mut c = seeded();
        let outcome = c.apply(ChangeEvent::Updated(product(1, "A-renamed")));
        assert_eq!(outcome, MergeOutcome::Replaced);
        assert_eq!(c.get(1).unwrap().name, "A-renamed");
        // Order unchanged.
        let ids: Vec<_> = c.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn updated_for_absent_id_is_noop() {
        let mut c = seeded();
        assert_eq!(c.apply(ChangeEvent::Updated(product(9, "ghost"))), MergeOutcome::Ignored);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn deleted_is_idempotent() {
        let mut c = seeded();
        assert_eq!(c.apply(ChangeEvent::Deleted(2)), MergeOutcome::Removed);
        assert_eq!(c.apply(ChangeEvent::Deleted(2)), MergeOutcome::Ignored);
        assert_eq!(c.len(), 1);
        assert!(!c.contains(2));
    }

    #[test]
    fn replace_all_keeps_server_order_and_dedupes() {
        let mut c = ProductCollection::new();
        c.replace_all(vec![product(5, "E"), product(1, "A"), product(5, "E-dup")]);
        let ids: Vec<_> = c.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 1]);
        assert_eq!(c.get(5).unwrap().name, "E");
    }

    #[test]
    fn remove_returns_the_entry() {
        let mut c = seeded();
        let removed = c.remove(1).unwrap();
        assert_eq!(removed.name, "A");
        assert!(c.remove(1).is_none());
    }

    #[test]
    fn filtered_matches_name_sku_and_category() {
        let mut c = ProductCollection::new();
        c.replace_all(vec![
            Product {
                id: 1,
                name: "Milk 1L".into(),
                sku: "MILK-001".into(),
                category: "Dairy".into(),
                stock: None,
                image_url: None,
            },
            Product {
                id: 2,
                name: "Bread".into(),
                sku: "BREAD-001".into(),
                category: "Bakery".into(),
                stock: None,
                image_url: None,
            },
        ]);

        assert_eq!(c.filtered("milk").len(), 1);
        assert_eq!(c.filtered("BREAD-0").len(), 1);
        assert_eq!(c.filtered("bak").len(), 1);
        assert_eq!(c.filtered("").len(), 2);
        assert!(c.filtered("cheese").is_empty());
    }
}
