//! Session identity persistence.
//!
//! Two opaque identifiers survive page loads: the cart ID and the customer
//! access token. [`IdentityStore`] abstracts where they live so the sync
//! engines never touch cookie plumbing directly. The cookie-backed
//! implementation produces and parses `Set-Cookie`-style values for a host
//! HTTP layer to apply; an in-memory implementation backs tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

/// Cookie name for the cart identifier.
pub const CART_ID_KEY: &str = "shopify_cart_id";
/// Cookie name for the customer access token.
pub const CUSTOMER_TOKEN_KEY: &str = "shopify_customer_token";

/// 14 days, matching the service-side lifetime of both identifiers.
const IDENTITY_TTL: CookieDuration = CookieDuration::days(14);

/// Persistent storage for session identifiers.
///
/// A missing or unreadable value is reported as `None`; the engines then
/// behave as a fresh session. Writes are last-write-wins.
pub trait IdentityStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Cookie-jar-backed identity store.
///
/// Holds a [`CookieJar`] seeded from the incoming request; the host reads
/// [`delta`](Self::delta) after the engines run to emit `Set-Cookie` headers.
/// Values are percent-encoded so opaque identifiers with reserved
/// characters survive the cookie grammar.
pub struct CookieIdentityStore {
    jar: Mutex<CookieJar>,
}

impl CookieIdentityStore {
    /// Build from a request `Cookie` header value. Unparseable pairs are
    /// skipped with a warning rather than failing the session.
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        let mut jar = CookieJar::new();
        for pair in Cookie::split_parse(header.to_string()) {
            match pair {
                Ok(cookie) => jar.add_original(cookie),
                Err(e) => warn!(error = %e, "skipping malformed cookie pair"),
            }
        }
        Self { jar: Mutex::new(jar) }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            jar: Mutex::new(CookieJar::new()),
        }
    }

    /// Cookies changed this session, for the host to serialize as
    /// `Set-Cookie` headers. Removals come back with a zero max-age.
    #[must_use]
    pub fn delta(&self) -> Vec<Cookie<'static>> {
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .delta()
            .cloned()
            .collect()
    }
}

impl IdentityStore for CookieIdentityStore {
    fn get(&self, key: &str) -> Option<String> {
        let jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = jar.get(key)?.value().to_string();
        match urlencoding::decode(&raw) {
            Ok(value) => Some(value.into_owned()),
            Err(e) => {
                // Corrupt value: treat the session as fresh
                warn!(key, error = %e, "discarding undecodable session cookie");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let cookie = Cookie::build((key.to_string(), urlencoding::encode(value).into_owned()))
            .path("/")
            .max_age(IDENTITY_TTL)
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .build();
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(cookie);
    }

    fn remove(&self, key: &str) {
        let cookie = Cookie::build((key.to_string(), String::new()))
            .path("/")
            .build();
        self.jar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(cookie);
    }
}

/// In-memory identity store for tests and non-HTTP hosts.
#[derive(Default)]
pub struct MemoryIdentityStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_opaque_identifiers() {
        let store = CookieIdentityStore::empty();
        let id = "gid://shopify/Cart/Z2NwLXVzLWVhc3Qx?key=abc123";
        store.set(CART_ID_KEY, id);
        assert_eq!(store.get(CART_ID_KEY).as_deref(), Some(id));
    }

    #[test]
    fn test_set_cookie_attributes() {
        let store = CookieIdentityStore::empty();
        store.set(CUSTOMER_TOKEN_KEY, "token-1");

        let delta = store.delta();
        assert_eq!(delta.len(), 1);
        let cookie = &delta[0];
        assert_eq!(cookie.name(), CUSTOMER_TOKEN_KEY);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(14)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_reads_incoming_header() {
        let store = CookieIdentityStore::from_header(
            "shopify_cart_id=cart-1; shopify_customer_token=token-9",
        );
        assert_eq!(store.get(CART_ID_KEY).as_deref(), Some("cart-1"));
        assert_eq!(store.get(CUSTOMER_TOKEN_KEY).as_deref(), Some("token-9"));
        assert!(store.get("other").is_none());
    }

    #[test]
    fn test_remove_emits_expiry_delta() {
        let store =
            CookieIdentityStore::from_header("shopify_customer_token=token-9");
        store.remove(CUSTOMER_TOKEN_KEY);
        assert!(store.get(CUSTOMER_TOKEN_KEY).is_none());

        let delta = store.delta();
        assert_eq!(delta.len(), 1);
        // Removal cookies carry a max-age of zero
        assert_eq!(delta[0].max_age(), Some(CookieDuration::ZERO));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryIdentityStore::new();
        assert!(store.get(CART_ID_KEY).is_none());
        store.set(CART_ID_KEY, "cart-1");
        assert_eq!(store.get(CART_ID_KEY).as_deref(), Some("cart-1"));
        store.remove(CART_ID_KEY);
        assert!(store.get(CART_ID_KEY).is_none());
    }
}
