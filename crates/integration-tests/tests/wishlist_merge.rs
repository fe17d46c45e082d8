//! Wishlist scenarios: guest storage, login merge, account persistence.

use tidewater_core::Severity;
use tidewater_integration_tests::Harness;
use tidewater_storefront::session::IdentityStore;
use tidewater_storefront::shopify::types::WishlistItem;
use tidewater_storefront::shopify::MetafieldApi;
use tidewater_storefront::wishlist::WISHLIST_STORAGE_KEY;

fn item(variant: &str) -> WishlistItem {
    WishlistItem::new(variant, format!("handle-{variant}"), format!("Product {variant}"))
}

fn severity(harness: &Harness) -> Option<Severity> {
    harness.storefront.notifier().store().get().map(|r| r.severity)
}

#[tokio::test]
async fn guest_additions_land_in_guest_storage() {
    let harness = Harness::new();
    let wishlist = harness.storefront.wishlist();

    wishlist.add(item("gid://shopify/Variant/1")).await;
    wishlist.add(item("gid://shopify/Variant/2")).await;

    assert_eq!(wishlist.items().get().len(), 2);
    assert!(wishlist.is_in_wishlist("gid://shopify/Variant/1"));

    let raw = harness
        .guest_store
        .get(WISHLIST_STORAGE_KEY)
        .expect("guest storage must hold the list");
    let stored: Vec<WishlistItem> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.len(), 2);

    // No commerce round trip for a guest wishlist
    assert!(harness.commerce.calls().is_empty());
}

#[tokio::test]
async fn duplicate_add_is_an_informational_no_op() {
    let harness = Harness::new();
    let wishlist = harness.storefront.wishlist();

    wishlist.add(item("gid://shopify/Variant/1")).await;
    wishlist.add(item("gid://shopify/Variant/1")).await;

    assert_eq!(wishlist.items().get().len(), 1);
    assert_eq!(severity(&harness), Some(Severity::Info));
}

#[tokio::test]
async fn remove_and_clear_for_a_guest() {
    let harness = Harness::new();
    let wishlist = harness.storefront.wishlist();

    wishlist.add(item("gid://shopify/Variant/1")).await;
    wishlist.add(item("gid://shopify/Variant/2")).await;
    wishlist.remove("gid://shopify/Variant/1").await;

    assert!(!wishlist.is_in_wishlist("gid://shopify/Variant/1"));
    assert_eq!(wishlist.items().get().len(), 1);

    wishlist.clear().await;
    assert!(wishlist.items().get().is_empty());
    assert!(harness.guest_store.get(WISHLIST_STORAGE_KEY).is_none());
}

#[tokio::test]
async fn login_merges_guest_items_into_the_account_list_once() {
    let harness = Harness::new();
    harness.seed_session("shopper@example.com", "token-1");

    // Two disjoint lists: one saved on the account, one held as a guest
    let remote = vec![item("gid://shopify/Variant/10"), item("gid://shopify/Variant/11")];
    harness
        .commerce
        .metafield_set(
            "token-1",
            tidewater_storefront::shopify::types::MetafieldInput {
                namespace: "wishlist".to_string(),
                key: "items".to_string(),
                value: serde_json::to_string(&remote).unwrap(),
                value_type: "json".to_string(),
            },
        )
        .await
        .unwrap();
    harness.guest_store.set(
        WISHLIST_STORAGE_KEY,
        &serde_json::to_string(&vec![item("gid://shopify/Variant/20")]).unwrap(),
    );

    let wishlist = harness.storefront.wishlist();
    wishlist.on_login().await;

    let merged = wishlist.items().get();
    assert_eq!(merged.len(), 3);
    assert!(wishlist.is_in_wishlist("gid://shopify/Variant/20"));

    // The union landed on the customer record and the guest copy is gone
    let saved = harness
        .commerce
        .metafield_value("shopper@example.com", "wishlist", "items")
        .expect("account metafield must exist");
    let saved_items: Vec<WishlistItem> = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved_items.len(), 3);
    assert!(harness.guest_store.get(WISHLIST_STORAGE_KEY).is_none());
    assert_eq!(severity(&harness), Some(Severity::Success));

    // Repeating the login hook must not merge again
    let writes = |calls: &[&str]| calls.iter().filter(|c| **c == "metafield_set").count();
    let before = writes(&harness.commerce.calls());
    wishlist.on_login().await;
    assert_eq!(writes(&harness.commerce.calls()), before);
    assert_eq!(wishlist.items().get().len(), 3);
}

#[tokio::test]
async fn overlapping_variants_are_not_duplicated_by_the_merge() {
    let harness = Harness::new();
    harness.seed_session("shopper@example.com", "token-1");

    harness
        .commerce
        .metafield_set(
            "token-1",
            tidewater_storefront::shopify::types::MetafieldInput {
                namespace: "wishlist".to_string(),
                key: "items".to_string(),
                value: serde_json::to_string(&vec![item("gid://shopify/Variant/1")]).unwrap(),
                value_type: "json".to_string(),
            },
        )
        .await
        .unwrap();
    harness.guest_store.set(
        WISHLIST_STORAGE_KEY,
        &serde_json::to_string(&vec![item("gid://shopify/Variant/1")]).unwrap(),
    );

    let wishlist = harness.storefront.wishlist();
    wishlist.on_login().await;

    assert_eq!(wishlist.items().get().len(), 1);
    // Nothing new to merge, but the guest copy is still consumed
    assert!(harness.guest_store.get(WISHLIST_STORAGE_KEY).is_none());
}

#[tokio::test]
async fn logout_points_back_at_guest_storage_and_leaves_the_account_alone() {
    let harness = Harness::new();
    harness.seed_session("shopper@example.com", "token-1");

    let wishlist = harness.storefront.wishlist();
    wishlist.on_login().await;
    wishlist.add(item("gid://shopify/Variant/1")).await;
    assert_eq!(wishlist.items().get().len(), 1);

    harness.identity.remove(tidewater_storefront::session::CUSTOMER_TOKEN_KEY);
    wishlist.on_logout();

    // Session wishlist is now the (empty) guest list
    assert!(wishlist.items().get().is_empty());

    // The account copy survives untouched
    let saved = harness
        .commerce
        .metafield_value("shopper@example.com", "wishlist", "items")
        .expect("account metafield must survive logout");
    let saved_items: Vec<WishlistItem> = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved_items.len(), 1);
}

#[tokio::test]
async fn failed_metafield_write_reports_but_keeps_the_item() {
    let harness = Harness::new();
    harness.seed_session("shopper@example.com", "token-1");

    let wishlist = harness.storefront.wishlist();
    wishlist.on_login().await;

    harness.commerce.fail_next("metafield_set");
    wishlist.add(item("gid://shopify/Variant/1")).await;

    // The local list keeps the optimistic addition, and the failure report
    // is the visible result; no success toast may replace it
    assert!(wishlist.is_in_wishlist("gid://shopify/Variant/1"));
    assert_eq!(severity(&harness), Some(Severity::Error));
    assert!(
        harness
            .commerce
            .metafield_value("shopper@example.com", "wishlist", "items")
            .is_none(),
        "remote write must have failed"
    );
}

#[tokio::test]
async fn init_loads_the_list_for_the_active_session() {
    let harness = Harness::new();
    harness.guest_store.set(
        WISHLIST_STORAGE_KEY,
        &serde_json::to_string(&vec![item("gid://shopify/Variant/1")]).unwrap(),
    );

    harness.storefront.wishlist().init().await;

    assert_eq!(harness.storefront.wishlist().items().get().len(), 1);
}

#[tokio::test]
async fn corrupt_guest_storage_degrades_to_an_empty_list() {
    let harness = Harness::new();
    harness.guest_store.set(WISHLIST_STORAGE_KEY, "not-json{");

    harness.storefront.wishlist().init().await;

    assert!(harness.storefront.wishlist().items().get().is_empty());
}
