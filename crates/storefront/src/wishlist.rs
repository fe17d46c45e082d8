//! Wishlist merge engine.
//!
//! Two backends, selected by login state: guests keep their wishlist in
//! local key-value storage, signed-in customers keep it in a customer
//! metafield. On login the guest list merges into the account list once,
//! without duplicates, and the guest copy is cleared. On logout the engine
//! points back at guest storage and leaves the account list untouched.
//!
//! Mutations update the in-memory store first and then persist; a failed
//! persist is reported but not rolled back, so the shopper keeps what they
//! see for the rest of the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, instrument, warn};

use crate::feedback::Notifier;
use crate::session::{CUSTOMER_TOKEN_KEY, IdentityStore};
use crate::shopify::types::{MetafieldIdentifier, MetafieldInput, WishlistItem};
use crate::shopify::MetafieldApi;
use crate::store::Store;

/// Key the guest wishlist is persisted under.
pub const WISHLIST_STORAGE_KEY: &str = "shopify_wishlist";

const WISHLIST_NAMESPACE: &str = "wishlist";
const WISHLIST_KEY: &str = "items";
const WISHLIST_METAFIELD_TYPE: &str = "json";

/// Persistent wishlist storage for guests.
///
/// Unreadable or corrupt data loads as an empty list; saves are best
/// effort and must not fail the calling operation.
pub trait GuestStorage: Send + Sync {
    fn load(&self) -> Vec<WishlistItem>;
    fn save(&self, items: &[WishlistItem]);
    fn clear(&self);
}

/// Guest storage backed by any [`IdentityStore`], holding the list as JSON
/// under [`WISHLIST_STORAGE_KEY`].
pub struct KeyValueGuestStorage {
    store: Arc<dyn IdentityStore>,
}

impl KeyValueGuestStorage {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

impl GuestStorage for KeyValueGuestStorage {
    fn load(&self) -> Vec<WishlistItem> {
        let Some(raw) = self.store.get(WISHLIST_STORAGE_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "discarding unreadable guest wishlist");
                Vec::new()
            }
        }
    }

    fn save(&self, items: &[WishlistItem]) {
        match serde_json::to_string(items) {
            Ok(json) => self.store.set(WISHLIST_STORAGE_KEY, &json),
            Err(e) => error!(error = %e, "failed to serialize guest wishlist"),
        }
    }

    fn clear(&self) {
        self.store.remove(WISHLIST_STORAGE_KEY);
    }
}

/// Synchronizes the wishlist across guest storage and customer metafields.
#[derive(Clone)]
pub struct WishlistEngine {
    metafields: Arc<dyn MetafieldApi>,
    identity: Arc<dyn IdentityStore>,
    guest: Arc<dyn GuestStorage>,
    items: Store<Vec<WishlistItem>>,
    /// Set once the guest list has merged into this login's account list.
    merged: Arc<AtomicBool>,
    notifier: Notifier,
}

impl WishlistEngine {
    pub(crate) fn new(
        metafields: Arc<dyn MetafieldApi>,
        identity: Arc<dyn IdentityStore>,
        guest: Arc<dyn GuestStorage>,
        notifier: Notifier,
    ) -> Self {
        Self {
            metafields,
            identity,
            guest,
            items: Store::new(Vec::new()),
            merged: Arc::new(AtomicBool::new(false)),
            notifier,
        }
    }

    /// The published wishlist.
    #[must_use]
    pub fn items(&self) -> &Store<Vec<WishlistItem>> {
        &self.items
    }

    #[must_use]
    pub fn is_in_wishlist(&self, variant_id: &str) -> bool {
        self.items.get().iter().any(|i| i.variant_id == variant_id)
    }

    fn customer_token(&self) -> Option<String> {
        self.identity.get(CUSTOMER_TOKEN_KEY)
    }

    /// Load the wishlist for the current session. Logged-in sessions also
    /// run the one-time guest merge.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        match self.customer_token() {
            Some(token) => self.load_account_wishlist(&token).await,
            None => self.items.set(self.guest.load()),
        }
    }

    /// React to a login: merge the guest list into the account list once.
    /// Safe to call repeatedly; only the first call after a login merges.
    #[instrument(skip(self))]
    pub async fn on_login(&self) {
        let Some(token) = self.customer_token() else {
            return;
        };
        self.load_account_wishlist(&token).await;
    }

    /// React to a logout: re-point at guest storage. The account list stays
    /// on the customer record untouched.
    #[instrument(skip(self))]
    pub fn on_logout(&self) {
        self.merged.store(false, Ordering::SeqCst);
        self.items.set(self.guest.load());
    }

    /// Add an item. Adding a variant already on the list is an
    /// informational no-op. A failed persist keeps the item in the session
    /// list and leaves the failure report as the visible result.
    #[instrument(skip_all, fields(variant_id = %item.variant_id))]
    pub async fn add(&self, item: WishlistItem) {
        if self.is_in_wishlist(&item.variant_id) {
            self.notifier.info("This item is already in your wishlist");
            return;
        }

        self.items.update(|items| items.push(item));
        if self.persist().await {
            self.notifier.success("Added to your wishlist");
        }
    }

    /// Remove a variant. Removing an absent variant leaves the list as is.
    #[instrument(skip(self))]
    pub async fn remove(&self, variant_id: &str) {
        self.items
            .update(|items| items.retain(|i| i.variant_id != variant_id));
        if self.persist().await {
            self.notifier.success("Removed from your wishlist");
        }
    }

    /// Empty the wishlist for the active backend.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.items.set(Vec::new());
        let saved = match self.customer_token() {
            Some(token) => self.save_account_wishlist(&token, &[]).await,
            None => {
                self.guest.clear();
                true
            }
        };
        if saved {
            self.notifier.success("Your wishlist has been cleared");
        }
    }

    async fn load_account_wishlist(&self, token: &str) {
        let mut items = self.fetch_account_wishlist(token).await;

        if !self.merged.swap(true, Ordering::SeqCst) {
            let guest_items = self.guest.load();
            let mut merged_count = 0usize;

            for guest_item in guest_items {
                if !items.iter().any(|i| i.variant_id == guest_item.variant_id) {
                    items.push(guest_item);
                    merged_count += 1;
                }
            }

            if merged_count > 0 {
                // The guest copy is only consumed once the union is safely
                // on the customer record
                if self.save_account_wishlist(token, &items).await {
                    self.guest.clear();
                    self.notifier.success(format!(
                        "{merged_count} items from your guest wishlist were added to your account"
                    ));
                }
            } else {
                // Nothing new to write back; the account list is
                // authoritative from here on, so the guest copy is consumed
                // even when it contributed nothing
                self.guest.clear();
            }
        }

        self.items.set(items);
    }

    async fn fetch_account_wishlist(&self, token: &str) -> Vec<WishlistItem> {
        let identifiers = vec![MetafieldIdentifier {
            namespace: WISHLIST_NAMESPACE.to_string(),
            key: WISHLIST_KEY.to_string(),
        }];

        let metafields = match self.metafields.customer_metafields(token, identifiers).await {
            Ok(metafields) => metafields,
            Err(e) => {
                error!(error = %e, "failed to load wishlist metafield");
                self.notifier.error("Failed to load your wishlist");
                return Vec::new();
            }
        };

        let Some(metafield) = metafields
            .into_iter()
            .find(|m| m.namespace == WISHLIST_NAMESPACE && m.key == WISHLIST_KEY)
        else {
            return Vec::new();
        };

        match serde_json::from_str(&metafield.value) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "discarding unreadable wishlist metafield");
                Vec::new()
            }
        }
    }

    /// Write the list to the customer metafield. Returns whether the write
    /// landed; failures are reported before returning.
    async fn save_account_wishlist(&self, token: &str, items: &[WishlistItem]) -> bool {
        let value = match serde_json::to_string(items) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "failed to serialize wishlist");
                self.report_save_failure();
                return false;
            }
        };

        let result = self
            .metafields
            .metafield_set(
                token,
                MetafieldInput {
                    namespace: WISHLIST_NAMESPACE.to_string(),
                    key: WISHLIST_KEY.to_string(),
                    value,
                    value_type: WISHLIST_METAFIELD_TYPE.to_string(),
                },
            )
            .await;

        match result {
            Ok(payload) if payload.user_errors.is_empty() => true,
            Ok(payload) => {
                warn!(errors = ?payload.user_errors, "wishlist metafield write rejected");
                self.report_save_failure();
                false
            }
            Err(e) => {
                error!(error = %e, "failed to save wishlist metafield");
                self.report_save_failure();
                false
            }
        }
    }

    fn report_save_failure(&self) {
        self.notifier
            .error("Failed to save your wishlist. Changes may be lost when you sign out.");
    }

    /// Persist the published list to the active backend. Guest saves are
    /// best effort and always count as landed.
    async fn persist(&self) -> bool {
        let items = self.items.get();
        match self.customer_token() {
            Some(token) => self.save_account_wishlist(&token, &items).await,
            None => {
                self.guest.save(&items);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryIdentityStore;

    #[test]
    fn test_guest_storage_round_trip() {
        let kv = Arc::new(MemoryIdentityStore::new());
        let storage = KeyValueGuestStorage::new(kv);

        assert!(storage.load().is_empty());

        let items = vec![WishlistItem::new("variant-1", "hoodie", "Tide Hoodie")];
        storage.save(&items);
        let loaded = storage.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].variant_id, "variant-1");

        storage.clear();
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_guest_storage_discards_corrupt_data() {
        let kv: Arc<dyn IdentityStore> = Arc::new(MemoryIdentityStore::new());
        kv.set(WISHLIST_STORAGE_KEY, "not-json{");
        let storage = KeyValueGuestStorage::new(Arc::clone(&kv));
        assert!(storage.load().is_empty());
    }
}
