//! # Toast Notifications
//!
//! Small in-memory notification queue for the presentation layer.
//! Toasts self-dismiss after their TTL; a toast may carry an action
//! label (the undo affordance rides on this). Self-dismissal needs an
//! ambient tokio runtime; pushed outside one, a toast stays visible
//! until explicitly dismissed.
//!
//! Keys are scoped to the manager instance, not process-global, so two
//! managers never hand out overlapping keys and a dismissed key from
//! one cannot cancel a toast in another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

/// Default time a toast stays visible.
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_millis(3500);

// =============================================================================
// Toast
// =============================================================================

/// One visible notification.
#[derive(Debug, Clone)]
pub struct Toast {
    /// Instance-unique key, used for dismissal.
    pub key: u64,
    pub message: String,
    /// Label for an optional action button (e.g. "Undo").
    pub action_label: Option<String>,
}

// =============================================================================
// Toast Manager
// =============================================================================

/// Owns the active toast list. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ToastManager {
    toasts: Arc<Mutex<Vec<Toast>>>,
    next_key: Arc<AtomicU64>,
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastManager {
    pub fn new() -> Self {
        ToastManager {
            toasts: Arc::new(Mutex::new(Vec::new())),
            next_key: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Shows a plain toast with the default TTL. Returns its key.
    pub fn push(&self, message: impl Into<String>) -> u64 {
        self.push_with_action(message, None::<String>, None)
    }

    /// Shows a toast, optionally with an action label and a custom TTL.
    pub fn push_with_action(
        &self,
        message: impl Into<String>,
        action_label: Option<impl Into<String>>,
        ttl: Option<Duration>,
    ) -> u64 {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            key,
            message: message.into(),
            action_label: action_label.map(Into::into),
        };
        debug!(key, message = %toast.message, "Toast shown");
        self.lock().push(toast);
        self.spawn_expiry(key, ttl.unwrap_or(DEFAULT_TOAST_TTL));
        key
    }

    /// Removes a toast early (user dismissed it or its action fired).
    /// Unknown keys are ignored.
    pub fn dismiss(&self, key: u64) {
        self.lock().retain(|t| t.key != key);
    }

    /// Snapshot of the currently visible toasts, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        self.lock().clone()
    }

    /// Expiry timers ride the ambient tokio runtime. Without one the
    /// toast simply stays until dismissed.
    fn spawn_expiry(&self, key: u64, ttl: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(key, "No async runtime, toast kept until dismissed");
            return;
        };
        let toasts = self.toasts.clone();
        runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            toasts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|t| t.key != key);
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Toast>> {
        self.toasts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn toast_expires_after_its_ttl() {
        let manager = ToastManager::new();
        manager.push("Product deleted");
        assert_eq!(manager.active().len(), 1);

        tokio::time::sleep(DEFAULT_TOAST_TTL + Duration::from_millis(10)).await;
        assert!(manager.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn custom_ttl_outlives_the_default() {
        let manager = ToastManager::new();
        manager.push_with_action("Deleted \"Milk\"", Some("Undo"), Some(Duration::from_secs(6)));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(manager.active().len(), 1);
        assert_eq!(manager.active()[0].action_label.as_deref(), Some("Undo"));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(manager.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_before_expiry_is_safe() {
        let manager = ToastManager::new();
        let key = manager.push("Saved");
        manager.dismiss(key);
        assert!(manager.active().is_empty());

        // The expiry timer firing later must be a no-op, including for a
        // newer toast that exists by then.
        let later = manager.push("Saved again");
        tokio::time::sleep(DEFAULT_TOAST_TTL / 2).await;
        assert_eq!(manager.active().len(), 1);
        assert_eq!(manager.active()[0].key, later);
    }

    #[test]
    fn push_without_a_runtime_keeps_the_toast_until_dismissed() {
        let manager = ToastManager::new();
        let key = manager.push("Saved");

        assert_eq!(manager.active().len(), 1);
        manager.dismiss(key);
        assert!(manager.active().is_empty());
    }

    #[tokio::test]
    async fn keys_are_unique_per_instance_not_shared_across_instances() {
        let a = ToastManager::new();
        let b = ToastManager::new();

        let a1 = a.push("one");
        let a2 = a.push("two");
        let b1 = b.push("one");

        assert_ne!(a1, a2);
        // Independent instances start their sequences fresh.
        assert_eq!(a1, b1);

        // Dismissing a key on one manager leaves the other untouched.
        a.dismiss(b1);
        assert_eq!(b.active().len(), 1);
    }
}
