//! Derived views over store snapshots.
//!
//! Pure functions only: each takes a snapshot and computes the view on
//! demand, so there is no second copy of state to keep in sync.

use tidewater_core::Money;

use crate::shopify::types::{Address, Cart, CartDiscountCode, CartLine, Customer, WishlistItem};

/// Total item quantity in the cart. Zero when no cart exists.
#[must_use]
pub fn cart_quantity(cart: Option<&Cart>) -> i64 {
    cart.map_or(0, |c| c.total_quantity)
}

/// The cart's line items, empty when no cart exists.
#[must_use]
pub fn cart_lines(cart: Option<&Cart>) -> &[CartLine] {
    cart.map_or(&[], |c| c.lines.as_slice())
}

#[must_use]
pub fn cart_subtotal(cart: Option<&Cart>) -> Option<&Money> {
    cart.map(|c| &c.cost.subtotal_amount)
}

#[must_use]
pub fn cart_total(cart: Option<&Cart>) -> Option<&Money> {
    cart.map(|c| &c.cost.total_amount)
}

#[must_use]
pub fn cart_tax(cart: Option<&Cart>) -> Option<&Money> {
    cart.and_then(|c| c.cost.total_tax_amount.as_ref())
}

/// Discount codes that actually apply to the current cart contents.
/// Entered-but-inapplicable codes are excluded.
#[must_use]
pub fn cart_discounts(cart: Option<&Cart>) -> Vec<&CartDiscountCode> {
    cart.map_or_else(Vec::new, |c| {
        c.discount_codes.iter().filter(|d| d.applicable).collect()
    })
}

/// True when there is no cart or the cart holds zero items.
#[must_use]
pub fn is_cart_empty(cart: Option<&Cart>) -> bool {
    cart_quantity(cart) == 0
}

/// The customer's display name, empty when logged out.
#[must_use]
pub fn customer_name(customer: Option<&Customer>) -> String {
    customer.map_or_else(String::new, Customer::full_name)
}

#[must_use]
pub fn customer_email(customer: Option<&Customer>) -> Option<&str> {
    customer.and_then(|c| c.email.as_deref())
}

/// The customer's addresses with the default flag derived per address.
#[must_use]
pub fn customer_addresses(customer: Option<&Customer>) -> Vec<(&Address, bool)> {
    customer.map_or_else(Vec::new, |c| {
        c.addresses
            .iter()
            .map(|a| (a, c.is_default_address(&a.id)))
            .collect()
    })
}

#[must_use]
pub fn default_address(customer: Option<&Customer>) -> Option<&Address> {
    customer.and_then(|c| c.default_address.as_ref())
}

/// Number of saved wishlist items.
#[must_use]
pub fn wishlist_count(items: &[WishlistItem]) -> usize {
    items.len()
}

/// Whether a variant is already saved to the wishlist.
#[must_use]
pub fn is_in_wishlist(items: &[WishlistItem], variant_id: &str) -> bool {
    items.iter().any(|i| i.variant_id == variant_id)
}
