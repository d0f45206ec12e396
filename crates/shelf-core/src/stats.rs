//! # Catalog Aggregates
//!
//! Counters the dashboard renders: total products, per-category counts,
//! and a low-stock count. Pure derivations over the collection; the
//! presentation layer decides how to draw them.

use crate::collection::ProductCollection;

/// Products with stock below this many units count as "low stock".
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// One category and how many products it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// Aggregate counters over the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    /// Total products in the collection.
    pub total: usize,

    /// Distinct categories in first-seen order, with counts.
    /// Products without a category land in "Uncategorized".
    pub categories: Vec<CategoryCount>,

    /// Products with stock below [`LOW_STOCK_THRESHOLD`].
    /// `None` when no product in the catalog tracks stock at all.
    pub low_stock: Option<usize>,
}

impl CatalogStats {
    /// Computes aggregates from the current collection.
    pub fn compute(collection: &ProductCollection) -> Self {
        let mut categories: Vec<CategoryCount> = Vec::new();
        for p in collection.iter() {
            let name = if p.category.is_empty() { "Uncategorized" } else { &p.category };
            match categories.iter_mut().find(|c| c.name == name) {
                Some(entry) => entry.count += 1,
                None => categories.push(CategoryCount { name: name.to_string(), count: 1 }),
            }
        }

        let any_tracked = collection.iter().any(|p| p.stock.is_some());
        let low_stock = any_tracked.then(|| {
            collection
                .iter()
                .filter(|p| p.stock.is_some_and(|s| s < LOW_STOCK_THRESHOLD))
                .count()
        });

        CatalogStats {
            total: collection.len(),
            categories,
            low_stock,
        }
    }
}
