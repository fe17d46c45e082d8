//! Customer session scenarios: login, registration, account and addresses.

use tidewater_integration_tests::Harness;
use tidewater_storefront::session::{CUSTOMER_TOKEN_KEY, IdentityStore};
use tidewater_storefront::shopify::types::{AddressInput, CustomerCreateInput};
use tidewater_storefront::shopify::ShopifyError;
use tidewater_storefront::store::projections;

#[tokio::test]
async fn login_publishes_the_customer_and_stores_the_token() {
    let harness = Harness::new();
    harness.commerce.add_customer("shopper@example.com", "hunter2");

    let customer = harness
        .storefront
        .customer()
        .login("shopper@example.com", "hunter2")
        .await
        .expect("valid credentials must log in");

    assert_eq!(customer.email.as_deref(), Some("shopper@example.com"));
    assert!(harness.identity.get(CUSTOMER_TOKEN_KEY).is_some());
    assert!(harness.storefront.customer().is_logged_in());

    let published = harness.storefront.customer().customer().get();
    assert_eq!(
        projections::customer_email(published.as_ref()),
        Some("shopper@example.com")
    );
}

#[tokio::test]
async fn rejected_credentials_leave_the_session_anonymous() {
    let harness = Harness::new();
    harness.commerce.add_customer("shopper@example.com", "hunter2");

    let result = harness
        .storefront
        .customer()
        .login("shopper@example.com", "wrong")
        .await;

    assert!(matches!(result, Err(ShopifyError::UserError(_))));
    assert!(harness.identity.get(CUSTOMER_TOKEN_KEY).is_none());
    assert!(!harness.storefront.customer().is_logged_in());
    assert!(harness.storefront.customer().customer().get().is_none());
}

#[tokio::test]
async fn dangling_token_is_discarded_on_fetch() {
    let harness = Harness::new();
    harness.seed_session("shopper@example.com", "stale-token");
    harness.commerce.delete_customer("shopper@example.com");

    let customer = harness.storefront.customer().get_customer().await;

    assert!(customer.is_none());
    assert!(harness.identity.get(CUSTOMER_TOKEN_KEY).is_none());
    assert!(!harness.storefront.customer().is_logged_in());
}

#[tokio::test]
async fn logout_revokes_the_token_and_clears_both_sides() {
    let harness = Harness::new();
    harness.commerce.add_customer("shopper@example.com", "hunter2");
    harness
        .storefront
        .customer()
        .login("shopper@example.com", "hunter2")
        .await
        .unwrap();

    harness.storefront.customer().logout().await;

    assert!(harness.identity.get(CUSTOMER_TOKEN_KEY).is_none());
    assert!(harness.storefront.customer().customer().get().is_none());
    assert!(harness.commerce.calls().contains(&"access_token_delete"));
}

#[tokio::test]
async fn registration_chains_into_a_live_session() {
    let harness = Harness::new();

    let customer = harness
        .storefront
        .customer()
        .register(CustomerCreateInput {
            email: "new@example.com".to_string(),
            password: "s3cret-pass".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            accepts_marketing: None,
        })
        .await
        .expect("registration must succeed");

    assert_eq!(customer.email.as_deref(), Some("new@example.com"));
    assert!(harness.storefront.customer().is_logged_in());

    let published = harness.storefront.customer().customer().get();
    assert_eq!(projections::customer_name(published.as_ref()), "Ada Lovelace");
}

#[tokio::test]
async fn registering_a_taken_email_is_rejected() {
    let harness = Harness::new();
    harness.commerce.add_customer("taken@example.com", "whatever");

    let result = harness
        .storefront
        .customer()
        .register(CustomerCreateInput {
            email: "taken@example.com".to_string(),
            password: "s3cret-pass".to_string(),
            first_name: None,
            last_name: None,
            accepts_marketing: None,
        })
        .await;

    assert!(matches!(result, Err(ShopifyError::UserError(_))));
    assert!(!harness.storefront.customer().is_logged_in());
}

#[tokio::test]
async fn address_lifecycle_refetches_the_customer() {
    let harness = Harness::new();
    harness.commerce.add_customer("shopper@example.com", "hunter2");
    let customer_engine = harness.storefront.customer();
    customer_engine
        .login("shopper@example.com", "hunter2")
        .await
        .unwrap();

    let address_id = customer_engine
        .create_address(AddressInput {
            first_name: Some("Ada".to_string()),
            address1: Some("1 Analytical Way".to_string()),
            city: Some("London".to_string()),
            country: Some("United Kingdom".to_string()),
            ..AddressInput::default()
        })
        .await
        .expect("address creation must succeed");

    let published = customer_engine.customer().get();
    let addresses = projections::customer_addresses(published.as_ref());
    assert_eq!(addresses.len(), 1);
    assert!(!addresses[0].1, "no default until one is chosen");

    customer_engine
        .set_default_address(&address_id)
        .await
        .expect("default address update must succeed");

    let published = customer_engine.customer().get();
    let addresses = projections::customer_addresses(published.as_ref());
    assert!(addresses[0].1, "chosen address must carry the default flag");
    assert!(projections::default_address(published.as_ref()).is_some());

    customer_engine
        .delete_address(&address_id)
        .await
        .expect("address deletion must succeed");

    let published = customer_engine.customer().get();
    assert!(projections::customer_addresses(published.as_ref()).is_empty());
}

#[tokio::test]
async fn profile_update_is_visible_after_refetch() {
    let harness = Harness::new();
    harness.commerce.add_customer("shopper@example.com", "hunter2");
    let customer_engine = harness.storefront.customer();
    customer_engine
        .login("shopper@example.com", "hunter2")
        .await
        .unwrap();

    customer_engine
        .update_customer(tidewater_storefront::shopify::types::CustomerUpdateInput {
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            ..Default::default()
        })
        .await
        .expect("profile update must succeed");

    let published = customer_engine.customer().get();
    assert_eq!(projections::customer_name(published.as_ref()), "Grace Hopper");
}

#[tokio::test]
async fn password_reset_adopts_the_fresh_token() {
    let harness = Harness::new();
    let customer_id = harness.commerce.add_customer("shopper@example.com", "old-pass");
    let customer_engine = harness.storefront.customer();

    customer_engine
        .reset_password(&customer_id, "reset-token", "new-pass")
        .await
        .expect("reset must succeed");

    assert!(customer_engine.is_logged_in());
    assert_eq!(
        customer_engine
            .customer()
            .get()
            .and_then(|c| c.email),
        Some("shopper@example.com".to_string())
    );

    // The new credential works for a subsequent login
    customer_engine.logout().await;
    customer_engine
        .login("shopper@example.com", "new-pass")
        .await
        .expect("new password must be accepted");
}
