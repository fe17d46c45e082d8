//! Domain types for the commerce API.
//!
//! These deserialize directly from the GraphQL wire shape (camelCase keys,
//! `edges`/`node` connections) into an ergonomic domain model. Mutation
//! payload types keep `user_errors` as data so callers can distinguish
//! validation failures from missing objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use tidewater_core::Money;

// =============================================================================
// Connections
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// Deserialize a GraphQL connection into a plain `Vec` of nodes.
pub(crate) fn connection_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let connection = Option::<Connection<T>>::deserialize(deserializer)?;
    Ok(connection
        .map(|c| c.edges.into_iter().map(|e| e.node).collect())
        .unwrap_or_default())
}

/// Pagination information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

// =============================================================================
// Shared Types
// =============================================================================

/// Custom attribute (key-value pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

/// Input for custom attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeInput {
    pub key: String,
    pub value: String,
}

/// Product or variant image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Selected option on a product variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

/// User-facing validation error from a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserError {
    /// Field path that caused the error.
    pub field: Option<Vec<String>>,
    /// Human-readable error message.
    pub message: String,
}

pub(crate) fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Cart Types
// =============================================================================

/// Simplified product info for cart merchandise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartMerchandiseProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub vendor: String,
}

/// Merchandise in a cart line (a specific product variant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMerchandise {
    /// Variant ID -- the identity key for line merge/wishlist decisions.
    pub id: String,
    /// Variant title.
    pub title: String,
    pub selected_options: Vec<SelectedOption>,
    pub product: CartMerchandiseProduct,
    pub image: Option<Image>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
}

/// Cost breakdown for a single cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineCost {
    /// Total (after line-level discounts).
    pub total_amount: Money,
    /// Subtotal (before discounts).
    pub subtotal_amount: Money,
    /// Price per unit.
    pub amount_per_quantity: Money,
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Line ID, opaque and scoped to one cart.
    pub id: String,
    /// Quantity actually held by the cart. May legitimately differ from the
    /// quantity requested (partial fulfillment due to stock); compare, never
    /// assume.
    pub quantity: i64,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub cost: CartLineCost,
    pub merchandise: CartMerchandise,
}

/// Cart cost summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    pub subtotal_amount: Money,
    pub total_amount: Money,
    pub total_tax_amount: Option<Money>,
    pub total_duty_amount: Option<Money>,
}

/// Discount code applied to a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartDiscountCode {
    pub code: String,
    /// Whether the code actually applies to the current cart contents.
    pub applicable: bool,
}

/// Customer reference inside buyer identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCustomer {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
}

/// Buyer identity attached to a cart for pricing and checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBuyerIdentity {
    pub country_code: Option<String>,
    pub customer: Option<CartCustomer>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A shopping cart.
///
/// The identifier is opaque, stable once created and never reused across
/// carts; a cart with zero lines still has a valid identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub checkout_url: String,
    pub total_quantity: i64,
    pub buyer_identity: Option<CartBuyerIdentity>,
    #[serde(deserialize_with = "connection_nodes", default)]
    pub lines: Vec<CartLine>,
    pub cost: CartCost,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub discount_codes: Vec<CartDiscountCode>,
}

impl Cart {
    /// Quantity currently held for a variant, summed across lines.
    #[must_use]
    pub fn quantity_of_variant(&self, variant_id: &str) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.merchandise.id == variant_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// Find a line by its line ID.
    #[must_use]
    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }
}

// =============================================================================
// Cart Inputs
// =============================================================================

/// Input for adding a line to a cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    pub merchandise_id: String,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeInput>>,
}

impl CartLineInput {
    #[must_use]
    pub fn new(merchandise_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            merchandise_id: merchandise_id.into(),
            quantity,
            attributes: None,
        }
    }
}

/// Input for updating an existing cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineUpdateInput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchandise_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeInput>>,
}

/// Buyer identity input for cart creation or update.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerIdentityInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Input for `cartCreate`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartInput {
    pub lines: Vec<CartLineInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discount_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_identity: Option<BuyerIdentityInput>,
}

/// Result of a cart mutation: the cart (when the service produced one) plus
/// any user-facing validation errors. Both can be present at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub cart: Option<Cart>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

// =============================================================================
// Customer Types
// =============================================================================

/// A customer address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    #[serde(default)]
    pub formatted: Vec<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub country: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

/// Input for address create/update.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A customer account.
///
/// Session-scoped: exists only while a valid access token is held.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub default_address: Option<Address>,
    #[serde(deserialize_with = "connection_nodes", default)]
    pub addresses: Vec<Address>,
}

impl Customer {
    /// The customer's full name, falling back through the name fields.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => String::new(),
        }
    }

    /// Whether the given address is the default one.
    ///
    /// Derived from membership against `default_address`; the flag is never
    /// stored on the address itself.
    #[must_use]
    pub fn is_default_address(&self, address_id: &str) -> bool {
        self.default_address
            .as_ref()
            .is_some_and(|a| a.id == address_id)
    }
}

/// Input for customer registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreateInput {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_marketing: Option<bool>,
}

/// Input for updating customer account fields.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Customer access token with expiry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a token-producing mutation (login, password reset).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenPayload {
    #[serde(rename = "customerAccessToken")]
    pub token: Option<AccessToken>,
    #[serde(rename = "customerUserErrors", default)]
    pub user_errors: Vec<UserError>,
}

/// Result of a customer mutation.
///
/// Account mutations only select the customer ID; callers refetch the full
/// record with the session token when they need it.
#[derive(Debug, Clone, Default)]
pub struct CustomerPayload {
    pub customer_id: Option<String>,
    pub user_errors: Vec<UserError>,
}

/// Result of an address mutation.
#[derive(Debug, Clone, Default)]
pub struct AddressPayload {
    pub address_id: Option<String>,
    pub user_errors: Vec<UserError>,
}

// =============================================================================
// Order Types
// =============================================================================

/// Display summary of one order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub title: String,
    pub variant: Option<OrderLineItemVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItemVariant {
    pub image: Option<Image>,
}

/// A past order in the customer's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: i64,
    pub processed_at: Option<DateTime<Utc>>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub current_total_price: Money,
    #[serde(deserialize_with = "connection_nodes", default)]
    pub line_items: Vec<OrderLineItem>,
}

/// One page of the customer's order history.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page_info: PageInfo,
}

// =============================================================================
// Metafield Types
// =============================================================================

/// A namespaced key/value record attached to a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metafield {
    pub id: String,
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

/// Identifier for looking up a metafield.
#[derive(Debug, Clone, Serialize)]
pub struct MetafieldIdentifier {
    pub namespace: String,
    pub key: String,
}

/// Input for writing a metafield.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldInput {
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

/// Result of a metafield write.
#[derive(Debug, Clone, Default)]
pub struct MetafieldPayload {
    pub metafield: Option<Metafield>,
    pub user_errors: Vec<UserError>,
}

// =============================================================================
// Wishlist Types
// =============================================================================

/// One saved product reference in a wishlist.
///
/// The variant ID is the identity key: no two items share a variant
/// reference within one wishlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub variant_id: String,
    pub handle: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price: Option<Money>,
    pub added_at: DateTime<Utc>,
}

impl WishlistItem {
    #[must_use]
    pub fn new(
        variant_id: impl Into<String>,
        handle: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            variant_id: variant_id.into(),
            handle: handle.into(),
            title: title.into(),
            image_url: None,
            price: None,
            added_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_deserializes_line_connection() {
        let json = serde_json::json!({
            "id": "gid://shopify/Cart/abc",
            "checkoutUrl": "https://test.myshopify.com/checkout",
            "totalQuantity": 3,
            "buyerIdentity": null,
            "lines": {
                "edges": [
                    {
                        "node": {
                            "id": "gid://shopify/CartLine/1",
                            "quantity": 3,
                            "attributes": [],
                            "cost": {
                                "totalAmount": {"amount": "30.0", "currencyCode": "USD"},
                                "subtotalAmount": {"amount": "30.0", "currencyCode": "USD"},
                                "amountPerQuantity": {"amount": "10.0", "currencyCode": "USD"}
                            },
                            "merchandise": {
                                "id": "gid://shopify/ProductVariant/9",
                                "title": "Large",
                                "selectedOptions": [{"name": "Size", "value": "Large"}],
                                "product": {
                                    "id": "gid://shopify/Product/5",
                                    "title": "Tide Hoodie",
                                    "handle": "tide-hoodie",
                                    "vendor": "Tidewater"
                                },
                                "image": null,
                                "price": {"amount": "10.0", "currencyCode": "USD"},
                                "compareAtPrice": null
                            }
                        }
                    }
                ]
            },
            "cost": {
                "subtotalAmount": {"amount": "30.0", "currencyCode": "USD"},
                "totalAmount": {"amount": "30.0", "currencyCode": "USD"},
                "totalTaxAmount": null,
                "totalDutyAmount": null
            },
            "attributes": [],
            "discountCodes": [{"code": "WELCOME10", "applicable": true}]
        });

        let cart: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(cart.total_quantity, 3);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.quantity_of_variant("gid://shopify/ProductVariant/9"), 3);
        assert_eq!(cart.quantity_of_variant("gid://shopify/ProductVariant/8"), 0);
        assert!(cart.discount_codes[0].applicable);
    }

    #[test]
    fn test_customer_full_name_fallbacks() {
        let mut customer: Customer = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/Customer/1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "displayName": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": null,
            "defaultAddress": null,
            "addresses": {"edges": []}
        }))
        .unwrap();

        assert_eq!(customer.full_name(), "Ada Lovelace");
        customer.last_name = None;
        assert_eq!(customer.full_name(), "Ada");
        customer.first_name = None;
        assert_eq!(customer.full_name(), "");
    }

    #[test]
    fn test_default_address_is_derived() {
        let customer: Customer = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/Customer/1",
            "firstName": null,
            "lastName": null,
            "displayName": null,
            "email": null,
            "phone": null,
            "defaultAddress": {"id": "addr-1", "formatted": []},
            "addresses": {"edges": [
                {"node": {"id": "addr-1", "formatted": []}},
                {"node": {"id": "addr-2", "formatted": []}}
            ]}
        }))
        .unwrap();

        assert!(customer.is_default_address("addr-1"));
        assert!(!customer.is_default_address("addr-2"));
    }

    #[test]
    fn test_cart_line_input_omits_empty_attributes() {
        let input = CartLineInput::new("variant-1", 2);
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["merchandiseId"], "variant-1");
        assert_eq!(json["quantity"], 2);
        assert!(json.get("attributes").is_none());
    }

    #[test]
    fn test_wishlist_item_round_trip() {
        let item = WishlistItem::new("variant-1", "tide-hoodie", "Tide Hoodie");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"variantId\":\"variant-1\""));
        let back: WishlistItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.variant_id, item.variant_id);
        assert_eq!(back.added_at, item.added_at);
    }
}
