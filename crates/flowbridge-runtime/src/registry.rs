//! Pending button registry
//!
//! Every rendered inline menu registers one entry per button, keyed by the
//! callback data sent to the platform. Buttons of the same message group
//! (a card, a carousel or a choice prompt) share one menu group: the first
//! press claims the group and drops every sibling key, so a group produces
//! at most one follow-up request.

use flowbridge_core::{Button, InteractionRequest};
use moka::future::Cache;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Telegram rejects callback data longer than this many bytes
pub const CALLBACK_DATA_LIMIT: usize = 64;

/// Build the callback key `chatId[|stamp]|requestType`.
///
/// Keys that would exceed [`CALLBACK_DATA_LIMIT`] fall back to the button
/// position, `chatId[|stamp]|#index`.
///
/// # Examples
///
/// ```
/// use flowbridge_runtime::registry::callback_key;
/// assert_eq!(callback_key(42, Some(1700), "yes", 0), "42|1700|yes");
/// assert_eq!(callback_key(42, None, "no", 1), "42|no");
/// ```
#[must_use]
pub fn callback_key(chat_id: i64, stamp: Option<i64>, request_type: &str, index: usize) -> String {
    let prefix = key_prefix(chat_id, stamp);
    let key = format!("{prefix}|{request_type}");
    if key.len() <= CALLBACK_DATA_LIMIT {
        return key;
    }
    format!("{prefix}|#{index}")
}

fn key_prefix(chat_id: i64, stamp: Option<i64>) -> String {
    match stamp {
        Some(stamp) => format!("{chat_id}|{stamp}"),
        None => chat_id.to_string(),
    }
}

/// Build one callback key per button of a menu group.
///
/// `request_types` lists the buttons of the whole group in render order
/// (every card of a carousel). A request type shared by several buttons
/// cannot identify a button, so those buttons are keyed by their position
/// in the group instead.
///
/// # Examples
///
/// ```
/// use flowbridge_runtime::registry::group_callback_keys;
/// assert_eq!(
///     group_callback_keys(2, None, &["intent", "intent", "no"]),
///     vec!["2|#0", "2|#1", "2|no"]
/// );
/// ```
#[must_use]
pub fn group_callback_keys(chat_id: i64, stamp: Option<i64>, request_types: &[&str]) -> Vec<String> {
    request_types
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let shared = request_types.iter().filter(|other| *other == kind).count() > 1;
            // A type like "#1" would read as a position key
            if shared || kind.starts_with('#') {
                format!("{}|#{index}", key_prefix(chat_id, stamp))
            } else {
                callback_key(chat_id, stamp, kind, index)
            }
        })
        .collect()
}

/// What happens to the rendered menu when one of its buttons is pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuRetirement {
    /// Remove the inline menu from every listed message (card, carousel)
    ClearMenus(Vec<i32>),
    /// Rewrite the prompt message to show the chosen label (choice)
    AnnounceChoice {
        /// Prompt message id
        prompt_id: i32,
    },
}

/// Shared state of the buttons rendered together
#[derive(Debug)]
struct MenuGroup {
    claimed: AtomicBool,
    keys: Vec<String>,
}

/// Registered button awaiting a press
#[derive(Debug)]
pub struct PendingButton {
    /// Chat the menu was rendered in
    pub chat_id: i64,
    /// Button label
    pub label: String,
    /// Request issued on press
    pub request: InteractionRequest,
    /// Menu cleanup performed before the follow-up
    pub retirement: MenuRetirement,
    group: Arc<MenuGroup>,
}

impl PendingButton {
    /// Request sent to the backend when this button is pressed
    #[must_use]
    pub fn follow_up(&self) -> InteractionRequest {
        self.request.clone()
    }
}

/// Bounded store of pending buttons
#[derive(Clone)]
pub struct CallbackRegistry {
    /// callback key -> pending button, with capacity bound and TTL
    cache: Cache<String, Arc<PendingButton>>,
    /// Presses that hit an unknown or already claimed key
    stale_presses: Arc<AtomicU64>,
}

impl CallbackRegistry {
    /// Creates a registry holding at most `max_capacity` buttons, each for at most `ttl`
    ///
    /// # Examples
    ///
    /// ```
    /// use flowbridge_runtime::CallbackRegistry;
    /// use std::time::Duration;
    ///
    /// let registry = CallbackRegistry::new(10_000, Duration::from_secs(86_400));
    /// assert_eq!(registry.stale_presses(), 0);
    /// ```
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            stale_presses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register the buttons of one rendered message group.
    ///
    /// `buttons` pairs each callback key with its button. A key already
    /// present is replaced by the newer menu.
    pub async fn register(
        &self,
        chat_id: i64,
        retirement: MenuRetirement,
        buttons: Vec<(String, Button)>,
    ) {
        if buttons.is_empty() {
            return;
        }

        let group = Arc::new(MenuGroup {
            claimed: AtomicBool::new(false),
            keys: buttons.iter().map(|(key, _)| key.clone()).collect(),
        });

        for (key, button) in buttons {
            let pending = PendingButton {
                chat_id,
                label: button.name,
                request: button.request,
                retirement: retirement.clone(),
                group: Arc::clone(&group),
            };
            self.cache.insert(key, Arc::new(pending)).await;
        }

        debug!(chat_id, keys = group.keys.len(), "Registered menu group");
    }

    /// Claim the button behind `key`.
    ///
    /// Returns `None` when the key is unknown, expired or its group was
    /// already claimed. On success every key of the group is dropped.
    pub async fn claim(&self, key: &str) -> Option<Arc<PendingButton>> {
        let Some(pending) = self.cache.get(key).await else {
            self.stale_presses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if pending.group.claimed.swap(true, Ordering::AcqRel) {
            self.stale_presses.fetch_add(1, Ordering::Relaxed);
            self.cache.invalidate(key).await;
            return None;
        }

        for sibling in &pending.group.keys {
            // A newer menu may have reused the key
            if let Some(current) = self.cache.get(sibling.as_str()).await {
                if Arc::ptr_eq(&current.group, &pending.group) {
                    self.cache.invalidate(sibling.as_str()).await;
                }
            }
        }

        Some(pending)
    }

    /// Whether `key` currently maps to a pending button
    pub async fn contains(&self, key: &str) -> bool {
        self.cache.get(key).await.is_some()
    }

    /// Number of presses on unknown or retired menus
    #[must_use]
    pub fn stale_presses(&self) -> u64 {
        self.stale_presses.load(Ordering::Relaxed)
    }

    /// Approximate number of pending buttons
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(name: &str, kind: &str) -> Button {
        Button {
            name: name.to_string(),
            request: InteractionRequest::new(kind, None),
        }
    }

    fn registry() -> CallbackRegistry {
        CallbackRegistry::new(100, Duration::from_secs(60))
    }

    #[test]
    fn test_callback_key_formats() {
        assert_eq!(callback_key(-100, Some(5), "path-1", 0), "-100|5|path-1");
        assert_eq!(callback_key(7, None, "yes", 0), "7|yes");
    }

    #[test]
    fn test_callback_key_falls_back_to_index_when_too_long() {
        let long_type = "x".repeat(CALLBACK_DATA_LIMIT);
        let key = callback_key(7, Some(1_700_000_000_000), &long_type, 3);
        assert_eq!(key, "7|1700000000000|#3");
        assert!(key.len() <= CALLBACK_DATA_LIMIT);
    }

    #[test]
    fn test_group_keys_are_unique_for_shared_request_types() {
        let keys = group_callback_keys(2, Some(9), &["intent", "more", "intent", "#1"]);
        assert_eq!(keys, vec!["2|9|#0", "2|9|more", "2|9|#2", "2|9|#3"]);
    }

    #[test]
    fn test_group_keys_keep_readable_form_when_unique() {
        let keys = group_callback_keys(11, None, &["yes", "no"]);
        assert_eq!(keys, vec!["11|yes", "11|no"]);
    }

    #[test]
    fn test_group_keys_fall_back_to_group_position() {
        let long_type = "y".repeat(CALLBACK_DATA_LIMIT);
        let keys = group_callback_keys(1, Some(5), &["a", &long_type]);
        assert_eq!(keys, vec!["1|5|a", "1|5|#1"]);
    }

    #[tokio::test]
    async fn test_claim_returns_button_once() {
        let registry = registry();
        registry
            .register(
                1,
                MenuRetirement::AnnounceChoice { prompt_id: 10 },
                vec![("1|yes".to_string(), button("Yes", "yes"))],
            )
            .await;

        let pending = registry.claim("1|yes").await.expect("button registered");
        assert_eq!(pending.label, "Yes");
        assert_eq!(pending.follow_up().kind, "yes");

        assert!(registry.claim("1|yes").await.is_none());
        assert_eq!(registry.stale_presses(), 1);
    }

    #[tokio::test]
    async fn test_claim_drops_sibling_keys() {
        let registry = registry();
        registry
            .register(
                1,
                MenuRetirement::ClearMenus(vec![10, 11]),
                vec![
                    ("1|5|a".to_string(), button("A", "a")),
                    ("1|5|b".to_string(), button("B", "b")),
                ],
            )
            .await;

        assert!(registry.claim("1|5|a").await.is_some());
        assert!(!registry.contains("1|5|b").await);
        assert!(registry.claim("1|5|b").await.is_none());
    }

    #[tokio::test]
    async fn test_claim_keeps_keys_reused_by_newer_menu() {
        let registry = registry();
        registry
            .register(
                1,
                MenuRetirement::AnnounceChoice { prompt_id: 10 },
                vec![
                    ("1|yes".to_string(), button("Yes", "yes")),
                    ("1|no".to_string(), button("No", "no")),
                ],
            )
            .await;
        registry
            .register(
                1,
                MenuRetirement::AnnounceChoice { prompt_id: 20 },
                vec![("1|yes".to_string(), button("Yes!", "yes"))],
            )
            .await;

        // Pressing the old menu's sibling must not drop the newer "yes"
        assert!(registry.claim("1|no").await.is_some());
        let newer = registry.claim("1|yes").await.expect("newer menu still live");
        assert_eq!(newer.label, "Yes!");
        assert_eq!(
            newer.retirement,
            MenuRetirement::AnnounceChoice { prompt_id: 20 }
        );
    }

    #[tokio::test]
    async fn test_unknown_key_counts_as_stale() {
        let registry = registry();
        assert!(registry.claim("nope").await.is_none());
        assert_eq!(registry.stale_presses(), 1);
    }

    #[tokio::test]
    async fn test_entry_count() {
        let registry = registry();
        registry
            .register(
                1,
                MenuRetirement::ClearMenus(vec![1]),
                vec![
                    ("1|1|a".to_string(), button("A", "a")),
                    ("1|1|b".to_string(), button("B", "b")),
                ],
            )
            .await;

        registry.cache.run_pending_tasks().await;
        assert_eq!(registry.entry_count(), 2);
    }
}
