//! # Sync Controller
//!
//! Owner of the authoritative in-memory catalog.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        SyncController                               │
//! │                                                                     │
//! │  user action ──► optimistic local mutation ──► CRUD request         │
//! │                                      │                              │
//! │                       success: state already correct                │
//! │                       failure: full reload (reconcile, no rollback  │
//! │                                guessing)                            │
//! │                                                                     │
//! │  channel event ──► apply_event ──► idempotent merge                 │
//! │                                                                     │
//! │  Local and remote mutations converge through the same merge rules;  │
//! │  that, not locking, is what makes their interleaving safe.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Boundary Rule
//! No operation here returns an error. Every failure resolves to either
//! a reconciliation reload or a typed [`SyncSignal`] for the
//! presentation layer; nothing is fatal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use shelf_core::{CatalogStats, ChangeEvent, Product, ProductCollection, ProductDraft, ProductId};

use crate::api::ProductApi;
use crate::channel::EventHandler;
use crate::config::SyncConfig;

// =============================================================================
// Signals
// =============================================================================

/// User-facing outcome of a controller operation.
///
/// The controller never throws across its public boundary; these are
/// how failures (and noteworthy successes) reach the presentation
/// layer.
#[derive(Debug, Clone)]
pub enum SyncSignal {
    /// Full load completed.
    Loaded { count: usize },
    /// Full load failed; the local collection was cleared, not left
    /// stale.
    LoadFailed { message: String },
    /// Create or update succeeded.
    Saved { id: ProductId, created: bool },
    /// Create or update failed; field errors present when the server
    /// provided them.
    SaveFailed {
        message: String,
        field_errors: std::collections::HashMap<String, String>,
    },
    /// Product removed locally; undo is available for the undo window.
    Deleted { id: ProductId, name: String },
    /// Delete request failed; a reconciliation reload was triggered.
    DeleteFailed { id: ProductId, message: String },
    /// Undo re-created the product (under a fresh server id).
    Restored { id: ProductId, name: String },
    /// Undo request failed; the buffer is kept so the user may retry.
    UndoFailed { message: String },
    /// Undo invoked with an empty buffer.
    NothingToUndo,
}

/// Receiver for controller signals (implemented by the presentation
/// integration; a toast layer, typically).
pub trait SignalEmitter: Send + Sync {
    fn emit(&self, signal: SyncSignal);
}

/// No-op emitter for headless use and tests.
pub struct NoOpEmitter;

impl SignalEmitter for NoOpEmitter {
    fn emit(&self, _signal: SyncSignal) {}
}

// =============================================================================
// Confirmation Prompt
// =============================================================================

/// External collaborator asked before a destructive delete.
pub trait ConfirmationPrompt: Send + Sync {
    fn confirm_delete(&self, product: &Product) -> bool;
}

/// Prompt that always confirms (headless use and tests).
pub struct AlwaysConfirm;

impl ConfirmationPrompt for AlwaysConfirm {
    fn confirm_delete(&self, _product: &Product) -> bool {
        true
    }
}

// =============================================================================
// Undo Buffer
// =============================================================================

/// The single undo slot: the last optimistically deleted product.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub product: Product,
    pub deleted_at: DateTime<Utc>,
}

struct Inner {
    catalog: ProductCollection,
    undo: Option<UndoEntry>,
}

// =============================================================================
// Sync Controller
// =============================================================================

/// Owns and reconciles the product collection.
///
/// Cheap to clone; clones share state. Implements [`EventHandler`] so a
/// clone can be handed straight to the channel client.
#[derive(Clone)]
pub struct SyncController {
    api: Arc<dyn ProductApi>,
    emitter: Arc<dyn SignalEmitter>,
    prompt: Arc<dyn ConfirmationPrompt>,
    inner: Arc<RwLock<Inner>>,
    undo_window: Duration,
    /// Bumped on every undo-buffer transition. The expiry timer
    /// captures the value at arming time; a mismatch at firing time
    /// means the buffer was consumed or replaced and the timer is a
    /// no-op.
    undo_epoch: Arc<AtomicU64>,
}

impl SyncController {
    /// Creates a controller with a no-op emitter and an
    /// always-confirming prompt.
    pub fn new(api: Arc<dyn ProductApi>, config: &SyncConfig) -> Self {
        SyncController {
            api,
            emitter: Arc::new(NoOpEmitter),
            prompt: Arc::new(AlwaysConfirm),
            inner: Arc::new(RwLock::new(Inner {
                catalog: ProductCollection::new(),
                undo: None,
            })),
            undo_window: config.undo_window(),
            undo_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sets the signal emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SignalEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Sets the delete confirmation prompt.
    pub fn with_prompt(mut self, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    // =========================================================================
    // Read Side
    // =========================================================================

    /// Snapshot of the collection in order.
    pub fn products(&self) -> Vec<Product> {
        self.read().catalog.iter().cloned().collect()
    }

    /// Case-insensitive filter over name, SKU, and category.
    pub fn filtered(&self, query: &str) -> Vec<Product> {
        self.read().catalog.filtered(query).into_iter().cloned().collect()
    }

    /// Aggregate counters for the dashboard.
    pub fn stats(&self) -> CatalogStats {
        CatalogStats::compute(&self.read().catalog)
    }

    /// The pending undo entry, if the window is still open.
    pub fn pending_undo(&self) -> Option<UndoEntry> {
        self.read().undo.clone()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replaces the collection from a full fetch.
    ///
    /// On failure the collection is cleared rather than left stale, and
    /// `LoadFailed` is emitted.
    pub async fn load_all(&self) {
        match self.api.list().await {
            Ok(products) => {
                let count = products.len();
                self.write().catalog.replace_all(products);
                info!(count, "Catalog loaded");
                self.emitter.emit(SyncSignal::Loaded { count });
            }
            Err(e) => {
                warn!(error = %e, "Catalog load failed, clearing local collection");
                self.write().catalog.clear();
                self.emitter.emit(SyncSignal::LoadFailed { message: e.to_string() });
            }
        }
    }

    /// Merges one change event, local or remote origin alike.
    pub fn apply_event(&self, event: ChangeEvent) {
        let kind = event.kind();
        let id = event.product_id();
        let outcome = self.write().catalog.apply(event);
        debug!(kind, id, ?outcome, "Applied change event");
    }

    /// Creates a product and reloads on success.
    pub async fn create(&self, draft: ProductDraft) {
        match self.api.create(&draft).await {
            Ok(product) => {
                info!(id = product.id, "Product created");
                self.emitter.emit(SyncSignal::Saved { id: product.id, created: true });
                self.load_all().await;
            }
            Err(e) => {
                warn!(error = %e, "Create failed");
                self.emitter.emit(SyncSignal::SaveFailed {
                    message: e.to_string(),
                    field_errors: e.field_errors().cloned().unwrap_or_default(),
                });
            }
        }
    }

    /// Updates a product and reloads on success.
    pub async fn update(&self, id: ProductId, draft: ProductDraft) {
        match self.api.update(id, &draft).await {
            Ok(product) => {
                info!(id = product.id, "Product updated");
                self.emitter.emit(SyncSignal::Saved { id: product.id, created: false });
                self.load_all().await;
            }
            Err(e) => {
                warn!(id, error = %e, "Update failed");
                self.emitter.emit(SyncSignal::SaveFailed {
                    message: e.to_string(),
                    field_errors: e.field_errors().cloned().unwrap_or_default(),
                });
            }
        }
    }

    /// Optimistically deletes a product.
    ///
    /// After confirmation, the product is captured into the undo buffer
    /// and removed locally before the DELETE is issued. A failed
    /// request is reconciled with a full reload; the controller never
    /// guesses at rollback. On success the optimistic state is already
    /// correct and no reload happens.
    pub async fn delete_optimistic(&self, id: ProductId) {
        let Some(product) = self.read().catalog.get(id).cloned() else {
            debug!(id, "Delete requested for unknown product");
            return;
        };

        if !self.prompt.confirm_delete(&product) {
            debug!(id, "Delete not confirmed");
            return;
        }

        let epoch = {
            let mut inner = self.write();
            inner.catalog.remove(id);
            // Single slot: a second delete before an undo replaces the
            // earlier entry.
            inner.undo = Some(UndoEntry {
                product: product.clone(),
                deleted_at: Utc::now(),
            });
            self.bump_epoch()
        };
        self.emitter.emit(SyncSignal::Deleted { id, name: product.name });
        self.spawn_undo_expiry(epoch);

        if let Err(e) = self.api.delete(id).await {
            warn!(id, error = %e, "Delete request failed, reconciling with server");
            self.emitter.emit(SyncSignal::DeleteFailed { id, message: e.to_string() });
            self.load_all().await;
        }
    }

    /// Restores the last optimistically deleted product.
    ///
    /// Issues a create with the buffered product minus its id (the
    /// server assigns a fresh one). Success clears the buffer and
    /// reloads; failure keeps the buffer so the user may retry.
    pub async fn undo_last_delete(&self) {
        let Some(entry) = self.read().undo.clone() else {
            self.emitter.emit(SyncSignal::NothingToUndo);
            return;
        };

        match self.api.create(&entry.product.draft()).await {
            Ok(created) => {
                {
                    let mut inner = self.write();
                    inner.undo = None;
                    self.bump_epoch(); // cancels the pending expiry timer
                }
                info!(old_id = entry.product.id, new_id = created.id, "Product restored");
                self.emitter.emit(SyncSignal::Restored { id: created.id, name: created.name });
                self.load_all().await;
            }
            Err(e) => {
                warn!(error = %e, "Undo restore failed");
                self.emitter.emit(SyncSignal::UndoFailed { message: e.to_string() });
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Clears the undo buffer once the window elapses, unless the
    /// buffer was consumed or replaced in the meantime.
    fn spawn_undo_expiry(&self, epoch: u64) {
        let inner = self.inner.clone();
        let undo_epoch = self.undo_epoch.clone();
        let window = self.undo_window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut guard = inner.write().unwrap_or_else(|e| e.into_inner());
            if undo_epoch.load(Ordering::SeqCst) == epoch && guard.undo.take().is_some() {
                debug!("Undo window expired");
            }
        });
    }

    fn bump_epoch(&self) -> u64 {
        self.undo_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Guards are never held across await points. A poisoned lock still
    // holds usable state.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventHandler for SyncController {
    fn on_event(&self, event: ChangeEvent) {
        self.apply_event(event);
    }
}
