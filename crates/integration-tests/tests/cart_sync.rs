//! Cart engine scenarios against the in-memory commerce backend.

use rust_decimal::Decimal;

use tidewater_core::Severity;
use tidewater_integration_tests::Harness;
use tidewater_storefront::cart::format_cart_line;
use tidewater_storefront::session::{CART_ID_KEY, IdentityStore};
use tidewater_storefront::shopify::types::CartLineInput;
use tidewater_storefront::store::projections;

fn severity(harness: &Harness) -> Option<Severity> {
    harness.storefront.notifier().store().get().map(|r| r.severity)
}

#[tokio::test]
async fn first_add_creates_a_cart_and_stores_its_id() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 2)])
        .await;

    let stored_id = harness.identity.get(CART_ID_KEY);
    assert!(stored_id.is_some(), "cart ID must be persisted");

    let cart = cart_engine.cart().get().expect("cart must be published");
    assert_eq!(cart.id, stored_id.unwrap());
    assert_eq!(cart.total_quantity, 2);
    assert_eq!(severity(&harness), Some(Severity::Success));
}

#[tokio::test]
async fn fetch_without_stored_id_makes_no_network_call() {
    let harness = Harness::new();

    let cart = harness.storefront.cart().get().await;

    assert!(cart.is_none());
    assert!(harness.commerce.calls().is_empty());
}

#[tokio::test]
async fn distinct_variants_stay_distinct_lines() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 1)])
        .await;
    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/2", 1)])
        .await;

    let cart = cart_engine.cart().get().expect("cart published");
    assert_eq!(cart.lines.len(), 2);

    // Same variant merges service-side into the existing line
    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 3)])
        .await;
    let cart = cart_engine.cart().get().expect("cart published");
    assert_eq!(cart.lines.len(), 2);
    assert_eq!(cart.quantity_of_variant("gid://shopify/Variant/1"), 4);
}

#[tokio::test]
async fn stock_clamp_surfaces_as_partial_success() {
    let harness = Harness::new();
    harness.commerce.set_stock("gid://shopify/Variant/1", 3);

    let cart_engine = harness.storefront.cart();
    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 5)])
        .await;

    let cart = cart_engine.cart().get().expect("cart published");
    assert_eq!(cart.quantity_of_variant("gid://shopify/Variant/1"), 3);
    assert_eq!(severity(&harness), Some(Severity::Warning));
}

#[tokio::test]
async fn stock_clamp_on_line_update_surfaces_as_partial_success() {
    let harness = Harness::new();
    harness.commerce.set_stock("gid://shopify/Variant/1", 3);

    let cart_engine = harness.storefront.cart();
    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 2)])
        .await;
    let line_id = cart_engine.cart().get().expect("cart published").lines[0]
        .id
        .clone();

    cart_engine
        .update_line_quantity(line_id, 5)
        .await
        .expect("update must succeed");

    let cart = cart_engine.cart().get().expect("cart published");
    assert_eq!(cart.quantity_of_variant("gid://shopify/Variant/1"), 3);
    assert_eq!(severity(&harness), Some(Severity::Warning));
}

#[tokio::test]
async fn quantity_below_one_removes_the_line() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    cart_engine
        .add_lines(vec![
            CartLineInput::new("gid://shopify/Variant/1", 2),
            CartLineInput::new("gid://shopify/Variant/2", 1),
        ])
        .await;
    let lines = cart_engine.cart().get().expect("cart published").lines;

    cart_engine
        .update_line_quantity(lines[0].id.clone(), 0)
        .await
        .expect("removal must succeed");
    cart_engine
        .update_line_quantity(lines[1].id.clone(), -1)
        .await
        .expect("removal must succeed");

    let cart = cart_engine.cart().get().expect("cart published");
    assert!(cart.lines.is_empty());

    let calls = harness.commerce.calls();
    assert!(calls.contains(&"cart_lines_remove"));
    assert!(!calls.contains(&"cart_lines_update"));
}

#[tokio::test]
async fn reapplying_a_discount_is_an_informational_no_op() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 1)])
        .await;
    cart_engine
        .apply_discount("SUMMER10")
        .await
        .expect("first apply succeeds");

    let updates_before = harness
        .commerce
        .calls()
        .iter()
        .filter(|c| **c == "cart_discount_codes_update")
        .count();

    cart_engine
        .apply_discount("SUMMER10")
        .await
        .expect("duplicate apply is a no-op");

    let updates_after = harness
        .commerce
        .calls()
        .iter()
        .filter(|c| **c == "cart_discount_codes_update")
        .count();

    assert_eq!(updates_before, 1);
    assert_eq!(updates_after, 1, "duplicate must not hit the service");
    assert_eq!(severity(&harness), Some(Severity::Info));
}

#[tokio::test]
async fn removing_a_discount_leaves_the_others() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 1)])
        .await;
    cart_engine.apply_discount("SUMMER10").await.unwrap();
    cart_engine.apply_discount("FREESHIP").await.unwrap();
    cart_engine.remove_discount("SUMMER10").await.unwrap();

    let cart = cart_engine.cart().get().expect("cart published");
    let codes: Vec<&str> = cart.discount_codes.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, vec!["FREESHIP"]);
}

#[tokio::test]
async fn inapplicable_codes_are_hidden_from_the_discount_projection() {
    let harness = Harness::new();
    harness.commerce.mark_code_inapplicable("EXPIRED");

    let cart_engine = harness.storefront.cart();
    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 1)])
        .await;
    cart_engine.apply_discount("EXPIRED").await.unwrap();
    cart_engine.apply_discount("SUMMER10").await.unwrap();

    let cart = cart_engine.cart().get();
    let applicable = projections::cart_discounts(cart.as_ref());
    assert_eq!(applicable.len(), 1);
    assert_eq!(applicable[0].code, "SUMMER10");
}

#[tokio::test]
async fn transport_fault_keeps_the_published_cart_and_reports_an_error() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/1", 2)])
        .await;
    let before = cart_engine.cart().get().expect("cart published");

    harness.commerce.fail_next("cart_lines_add");
    cart_engine
        .add_lines(vec![CartLineInput::new("gid://shopify/Variant/2", 1)])
        .await;

    let after = cart_engine.cart().get().expect("cart still published");
    assert_eq!(after.total_quantity, before.total_quantity);
    assert_eq!(after.lines.len(), before.lines.len());
    assert_eq!(severity(&harness), Some(Severity::Error));
}

#[tokio::test]
async fn clear_empties_the_cart_but_keeps_the_session_id() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    cart_engine
        .add_lines(vec![
            CartLineInput::new("gid://shopify/Variant/1", 2),
            CartLineInput::new("gid://shopify/Variant/2", 1),
        ])
        .await;

    cart_engine.clear().await.expect("clear must succeed");

    let cart = cart_engine.cart().get().expect("cart published");
    assert!(cart.lines.is_empty());
    assert_eq!(cart.total_quantity, 0);
    assert!(harness.identity.get(CART_ID_KEY).is_some());

    // A second clear is a no-op with no removal round trip
    let removals = |calls: &[&str]| {
        calls.iter().filter(|c| **c == "cart_lines_remove").count()
    };
    let before = removals(&harness.commerce.calls());
    cart_engine.clear().await.unwrap();
    assert_eq!(removals(&harness.commerce.calls()), before);
}

#[tokio::test]
async fn line_costs_sum_to_the_cart_subtotal() {
    let harness = Harness::new();
    harness
        .commerce
        .set_price("gid://shopify/Variant/1", Decimal::new(1995, 2));
    harness
        .commerce
        .set_price("gid://shopify/Variant/2", Decimal::new(450, 2));

    let cart_engine = harness.storefront.cart();
    cart_engine
        .add_lines(vec![
            CartLineInput::new("gid://shopify/Variant/1", 3),
            CartLineInput::new("gid://shopify/Variant/2", 2),
        ])
        .await;

    let cart = cart_engine.cart().get().expect("cart published");
    let line_sum: Decimal = cart
        .lines
        .iter()
        .map(|l| format_cart_line(l).subtotal.decimal().unwrap())
        .sum();
    let subtotal = projections::cart_subtotal(Some(&cart))
        .expect("subtotal present")
        .decimal()
        .unwrap();

    assert_eq!(line_sum, subtotal);
    assert_eq!(subtotal, Decimal::new(6885, 2));
}

#[tokio::test]
async fn drawer_toggle_is_pure_local_state() {
    let harness = Harness::new();
    let cart_engine = harness.storefront.cart();

    assert!(!cart_engine.is_open().get());
    cart_engine.open_cart();
    assert!(cart_engine.is_open().get());
    cart_engine.toggle_cart();
    assert!(!cart_engine.is_open().get());
    assert!(harness.commerce.calls().is_empty());
}
