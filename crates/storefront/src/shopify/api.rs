//! Commerce API traits.
//!
//! The sync engines depend on these traits rather than on the concrete
//! client, so tests can swap in an in-memory backend.

use async_trait::async_trait;

use super::ShopifyError;
use super::types::{
    AddressInput, AddressPayload, BuyerIdentityInput, Cart, CartInput, CartLineInput,
    CartLineUpdateInput, CartPayload, Customer, CustomerCreateInput, CustomerPayload,
    CustomerUpdateInput, Metafield, MetafieldIdentifier, MetafieldInput, MetafieldPayload,
    OrderPage, TokenPayload, UserError,
};

/// Cart and customer operations against the commerce service.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    // --- Cart ---

    /// Fetch a cart by ID. Returns `None` for unknown or expired carts.
    async fn cart(&self, cart_id: &str) -> Result<Option<Cart>, ShopifyError>;

    async fn cart_create(&self, input: CartInput) -> Result<CartPayload, ShopifyError>;

    async fn cart_lines_add(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> Result<CartPayload, ShopifyError>;

    async fn cart_lines_update(
        &self,
        cart_id: &str,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<CartPayload, ShopifyError>;

    async fn cart_lines_remove(
        &self,
        cart_id: &str,
        line_ids: Vec<String>,
    ) -> Result<CartPayload, ShopifyError>;

    async fn cart_discount_codes_update(
        &self,
        cart_id: &str,
        discount_codes: Vec<String>,
    ) -> Result<CartPayload, ShopifyError>;

    async fn cart_buyer_identity_update(
        &self,
        cart_id: &str,
        buyer_identity: BuyerIdentityInput,
    ) -> Result<CartPayload, ShopifyError>;

    // --- Customer ---

    /// Fetch the customer for an access token. Returns `None` when the
    /// token is invalid or expired.
    async fn customer(&self, access_token: &str) -> Result<Option<Customer>, ShopifyError>;

    async fn access_token_create(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenPayload, ShopifyError>;

    async fn access_token_delete(&self, access_token: &str) -> Result<(), ShopifyError>;

    async fn customer_create(
        &self,
        input: CustomerCreateInput,
    ) -> Result<CustomerPayload, ShopifyError>;

    async fn customer_update(
        &self,
        access_token: &str,
        input: CustomerUpdateInput,
    ) -> Result<CustomerPayload, ShopifyError>;

    async fn address_create(
        &self,
        access_token: &str,
        address: AddressInput,
    ) -> Result<AddressPayload, ShopifyError>;

    async fn address_update(
        &self,
        access_token: &str,
        address_id: &str,
        address: AddressInput,
    ) -> Result<AddressPayload, ShopifyError>;

    async fn address_delete(
        &self,
        access_token: &str,
        address_id: &str,
    ) -> Result<AddressPayload, ShopifyError>;

    async fn default_address_update(
        &self,
        access_token: &str,
        address_id: &str,
    ) -> Result<CustomerPayload, ShopifyError>;

    /// Request a password recovery email. Succeeds silently for unknown
    /// addresses; only validation problems come back as user errors.
    async fn customer_recover(&self, email: &str) -> Result<Vec<UserError>, ShopifyError>;

    async fn customer_reset(
        &self,
        customer_id: &str,
        reset_token: &str,
        password: &str,
    ) -> Result<TokenPayload, ShopifyError>;

    async fn customer_orders(
        &self,
        access_token: &str,
        first: i64,
        after: Option<String>,
    ) -> Result<OrderPage, ShopifyError>;
}

/// Namespaced key/value storage on the customer record.
#[async_trait]
pub trait MetafieldApi: Send + Sync {
    async fn customer_metafields(
        &self,
        access_token: &str,
        identifiers: Vec<MetafieldIdentifier>,
    ) -> Result<Vec<Metafield>, ShopifyError>;

    /// Write a metafield on the customer who owns the access token.
    async fn metafield_set(
        &self,
        access_token: &str,
        input: MetafieldInput,
    ) -> Result<MetafieldPayload, ShopifyError>;

    /// Delete a metafield by ID. Returns the deleted ID, or the user errors
    /// when the service rejects the request.
    async fn metafield_delete(&self, id: &str) -> Result<Option<String>, ShopifyError>;
}
