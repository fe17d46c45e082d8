//! Storefront composition root.
//!
//! Owns one client, one identity store, one notifier, and the three sync
//! engines, wired together at construction. Hosts build one `Storefront`
//! per session (server) or one per page (browser); nothing here is a
//! process-wide singleton, so tests can run many isolated instances.

use std::sync::Arc;

use tracing::instrument;

use crate::cart::CartEngine;
use crate::config::{ConfigError, StorefrontConfig};
use crate::customer::CustomerEngine;
use crate::feedback::Notifier;
use crate::session::IdentityStore;
use crate::shopify::{ClientContext, CommerceApi, MetafieldApi, StorefrontClient};
use crate::wishlist::{GuestStorage, KeyValueGuestStorage, WishlistEngine};

/// A fully wired storefront session.
pub struct Storefront {
    client: Option<StorefrontClient>,
    notifier: Notifier,
    cart: CartEngine,
    customer: CustomerEngine,
    wishlist: WishlistEngine,
}

impl Storefront {
    /// Wire up a storefront against the real commerce API.
    #[must_use]
    pub fn new(
        config: &StorefrontConfig,
        context: ClientContext,
        identity: Arc<dyn IdentityStore>,
    ) -> Self {
        let client = StorefrontClient::new(config, context);
        let guest = Arc::new(KeyValueGuestStorage::new(Arc::clone(&identity)));
        let api: Arc<dyn CommerceApi> = Arc::new(client.clone());
        let metafields: Arc<dyn MetafieldApi> = Arc::new(client.clone());
        let mut storefront = Self::with_api(api, metafields, identity, guest);
        storefront.client = Some(client);
        storefront
    }

    /// Wire up against explicit backends; tests supply in-memory fakes.
    /// No raw client is available through [`client`](Self::client).
    #[must_use]
    pub fn with_api(
        api: Arc<dyn CommerceApi>,
        metafields: Arc<dyn MetafieldApi>,
        identity: Arc<dyn IdentityStore>,
        guest: Arc<dyn GuestStorage>,
    ) -> Self {
        let notifier = Notifier::new();
        let cart = CartEngine::new(Arc::clone(&api), Arc::clone(&identity), notifier.clone());
        let customer =
            CustomerEngine::new(Arc::clone(&api), Arc::clone(&identity), notifier.clone());
        let wishlist = WishlistEngine::new(metafields, identity, guest, notifier.clone());

        wire_wishlist_transitions(&customer, &wishlist);

        Self {
            client: None,
            notifier,
            cart,
            customer,
            wishlist,
        }
    }

    /// Server-side session: private token, request-scoped identity.
    #[must_use]
    pub fn server(config: &StorefrontConfig, identity: Arc<dyn IdentityStore>) -> Self {
        Self::new(config, ClientContext::Server, identity)
    }

    /// Browser-side session: public token only.
    #[must_use]
    pub fn browser(config: &StorefrontConfig, identity: Arc<dyn IdentityStore>) -> Self {
        Self::new(config, ClientContext::Browser, identity)
    }

    /// Build a server session from environment configuration.
    pub fn from_env(identity: Arc<dyn IdentityStore>) -> Result<Self, ConfigError> {
        let config = StorefrontConfig::from_env()?;
        Ok(Self::server(&config, identity))
    }

    /// Restore session state: fetch the cart and customer the identity
    /// store points at. The wishlist follows the customer via subscription.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        self.cart.get().await;
        self.customer.get_customer().await;
    }

    /// The raw GraphQL client, for reads outside the engines' scope.
    /// `None` when the storefront was built over fake backends.
    #[must_use]
    pub fn client(&self) -> Option<&StorefrontClient> {
        self.client.as_ref()
    }

    #[must_use]
    pub fn cart(&self) -> &CartEngine {
        &self.cart
    }

    #[must_use]
    pub fn customer(&self) -> &CustomerEngine {
        &self.customer
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistEngine {
        &self.wishlist
    }

    /// Operation feedback shared by all engines.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

/// Follow customer transitions: login triggers the one-time wishlist merge,
/// logout re-points the wishlist at guest storage.
fn wire_wishlist_transitions(customer: &CustomerEngine, wishlist: &WishlistEngine) {
    let wishlist = wishlist.clone();
    customer
        .customer()
        .subscribe(move |snapshot| {
            if snapshot.is_some() {
                let wishlist = wishlist.clone();
                tokio::spawn(async move { wishlist.on_login().await });
            } else {
                wishlist.on_logout();
            }
        })
        .forever();
}
