//! # shelf-sync: Real-Time Catalog Sync for ShelfSync
//!
//! This crate keeps a local product catalog continuously consistent with
//! a remote inventory service: CRUD goes over REST, change broadcasts
//! arrive over a self-healing WebSocket channel, and local mutations are
//! applied optimistically with a time-boxed undo for deletes.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Sync Layer Architecture                      │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                  SyncController (Orchestrator)                │  │
//! │  │                                                               │  │
//! │  │  Owns the in-memory ProductCollection                         │  │
//! │  │  Optimistic mutations, reload-based reconciliation            │  │
//! │  │  Single-slot undo buffer with expiry window                   │  │
//! │  └───────────────┬─────────────────────────┬─────────────────────┘  │
//! │                  │                         │                        │
//! │                  ▼                         ▼                        │
//! │  ┌────────────────────────┐  ┌────────────────────────────────────┐ │
//! │  │     HttpProductApi     │  │           ChannelClient            │ │
//! │  │                        │  │                                    │ │
//! │  │  REST CRUD via reqwest │  │  WebSocket with flat-delay         │ │
//! │  │  Typed failure mapping │  │  auto-reconnect and jitter         │ │
//! │  │  (validation / 404 /   │  │  Malformed frames dropped          │ │
//! │  │   server errors)       │  │  Handler panics isolated           │ │
//! │  └────────────────────────┘  └────────────────────────────────────┘ │
//! │                                                                     │
//! │  Presentation integration:                                          │
//! │  • SignalEmitter - typed operation outcomes                         │
//! │  • ToastManager  - self-dismissing notifications w/ undo action     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`api`] - REST CRUD client and the `ProductApi` seam
//! - [`channel`] - reconnecting WebSocket push channel
//! - [`config`] - TOML + environment configuration
//! - [`controller`] - optimistic sync orchestrator and undo buffer
//! - [`error`] - sync and API error types
//! - [`protocol`] - push frame decoding
//! - [`toast`] - notification queue for the presentation layer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shelf_sync::{ChannelClient, ChannelConfig, HttpProductApi, SyncConfig, SyncController};
//!
//! let config = SyncConfig::load_or_default(None);
//! let api = Arc::new(HttpProductApi::new(&config)?);
//! let controller = SyncController::new(api, &config);
//!
//! // Live updates feed the same merge path as local mutations.
//! let channel = ChannelClient::connect(
//!     ChannelConfig::resolve(&config)?,
//!     Arc::new(controller.clone()),
//! );
//!
//! controller.load_all().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod toast;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{HttpProductApi, ProductApi};
pub use channel::{ChannelClient, ChannelConfig, ChannelHandle, ChannelState, EventHandler};
pub use config::SyncConfig;
pub use controller::{
    AlwaysConfirm, ConfirmationPrompt, NoOpEmitter, SignalEmitter, SyncController, SyncSignal,
    UndoEntry,
};
pub use error::{ApiError, ApiResult, SyncError, SyncResult};
pub use protocol::decode_frame;
pub use toast::{Toast, ToastManager, DEFAULT_TOAST_TTL};
