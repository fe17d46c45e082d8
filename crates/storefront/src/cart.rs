//! Cart synchronization engine.
//!
//! Owns the published cart state: every operation performs one remote round
//! trip, classifies the outcome, publishes the returned cart, and emits a
//! transient [`OperationResult`]. The remote service is the source of truth;
//! the engine never edits the published cart locally.
//!
//! Outcome classification compares what was requested against what the
//! returned cart actually holds. The service clamps quantities to available
//! stock without raising an error, so a delivered-but-short response is a
//! partial success (warning), not a failure.

use std::collections::HashMap;
use std::sync::Arc;

use tidewater_core::Money;
use tracing::{error, instrument, warn};

use crate::feedback::Notifier;
use crate::session::{CART_ID_KEY, IdentityStore};
use crate::shopify::types::{
    Attribute, AttributeInput, BuyerIdentityInput, Cart, CartInput, CartLine, CartLineInput,
    CartLineUpdateInput, CartMerchandiseProduct, CartPayload, Image, SelectedOption,
    join_user_errors,
};
use crate::shopify::{CommerceApi, ShopifyError};
use crate::store::Store;

/// Synchronizes the session cart with the commerce service.
#[derive(Clone)]
pub struct CartEngine {
    api: Arc<dyn CommerceApi>,
    identity: Arc<dyn IdentityStore>,
    cart: Store<Option<Cart>>,
    is_open: Store<bool>,
    notifier: Notifier,
}

impl CartEngine {
    pub(crate) fn new(
        api: Arc<dyn CommerceApi>,
        identity: Arc<dyn IdentityStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            api,
            identity,
            cart: Store::new(None),
            is_open: Store::new(false),
            notifier,
        }
    }

    /// The published cart. `None` until a cart exists for this session.
    #[must_use]
    pub fn cart(&self) -> &Store<Option<Cart>> {
        &self.cart
    }

    /// Whether the cart drawer is open.
    #[must_use]
    pub fn is_open(&self) -> &Store<bool> {
        &self.is_open
    }

    pub fn open_cart(&self) {
        self.is_open.set(true);
    }

    pub fn close_cart(&self) {
        self.is_open.set(false);
    }

    pub fn toggle_cart(&self) {
        self.is_open.update(|open| *open = !*open);
    }

    /// Fetch the session cart, if any. No stored ID means no network call.
    ///
    /// A remote failure is absorbed: the previously published cart stays in
    /// place and an error result is emitted.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Option<Cart> {
        let cart_id = self.identity.get(CART_ID_KEY)?;

        match self.api.cart(&cart_id).await {
            Ok(Some(cart)) => {
                self.cart.set(Some(cart.clone()));
                Some(cart)
            }
            Ok(None) => {
                // Expired or unknown cart; the next add starts a fresh one
                warn!(%cart_id, "stored cart ID no longer resolves");
                None
            }
            Err(e) => {
                error!(error = %e, "failed to fetch cart");
                self.notifier.error("Could not load your cart");
                None
            }
        }
    }

    /// Create a new cart and adopt it as the session cart.
    ///
    /// This is the one loud-failure path: a response without a cart object
    /// propagates as an error. A cart delivered alongside user errors is
    /// still adopted, with a warning.
    #[instrument(skip_all)]
    pub async fn create(&self, input: CartInput) -> Result<Cart, ShopifyError> {
        let payload = self.api.cart_create(input).await?;

        let Some(cart) = payload.cart else {
            if payload.user_errors.is_empty() {
                return Err(ShopifyError::MissingData("cartCreate.cart".to_string()));
            }
            return Err(ShopifyError::UserError(join_user_errors(&payload.user_errors)));
        };

        self.identity.set(CART_ID_KEY, &cart.id);
        self.cart.set(Some(cart.clone()));

        if !payload.user_errors.is_empty() {
            warn!(errors = %join_user_errors(&payload.user_errors), "cart created with user errors");
            self.notifier.warning(join_user_errors(&payload.user_errors));
        }

        Ok(cart)
    }

    /// Add lines to the cart, creating one first when the session has none.
    /// Distinct variants stay distinct lines; only identical merchandise
    /// merges, and that merge happens service-side.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub async fn add_lines(&self, lines: Vec<CartLineInput>) {
        if lines.is_empty() {
            return;
        }

        let requested = requested_quantities(&lines);
        let before = self.published_quantities(&requested);

        let Some(cart_id) = self.identity.get(CART_ID_KEY) else {
            match self
                .create(CartInput {
                    lines,
                    ..CartInput::default()
                })
                .await
            {
                Ok(cart) => match shortfall(&before, &requested, &cart) {
                    Some(message) => self.notifier.warning(message),
                    None => self.notifier.success("Added to cart"),
                },
                Err(e) => {
                    error!(error = %e, "failed to create cart");
                    self.notifier.error("Could not add to cart");
                }
            }
            return;
        };

        let result = self.api.cart_lines_add(&cart_id, lines).await;
        self.settle("Added to cart", "Could not add to cart", result, |cart| {
            shortfall(&before, &requested, cart)
        })
        .await;
    }

    /// Convenience for the common one-variant add. Opens the cart drawer on
    /// success so the shopper sees the result.
    pub async fn add_to_cart(
        &self,
        merchandise_id: impl Into<String>,
        quantity: i64,
        attributes: Vec<AttributeInput>,
    ) {
        let mut line = CartLineInput::new(merchandise_id, quantity);
        if !attributes.is_empty() {
            line.attributes = Some(attributes);
        }
        self.add_lines(vec![line]).await;
        self.open_cart();
    }

    /// Update existing lines. Requires an existing cart. A returned
    /// quantity below the requested one (stock clamp) is a partial success.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub async fn update_lines(
        &self,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<(), ShopifyError> {
        let cart_id = self.identity.get(CART_ID_KEY).ok_or(ShopifyError::NoCart)?;
        let requested: Vec<(String, i64)> = lines
            .iter()
            .filter_map(|l| l.quantity.map(|q| (l.id.clone(), q)))
            .collect();
        let result = self.api.cart_lines_update(&cart_id, lines).await;
        self.settle("Cart updated", "Could not update your cart", result, |cart| {
            update_shortfall(&requested, cart)
        })
        .await;
        Ok(())
    }

    /// Remove lines by ID. Requires an existing cart.
    #[instrument(skip(self))]
    pub async fn remove_lines(&self, line_ids: Vec<String>) -> Result<(), ShopifyError> {
        let cart_id = self.identity.get(CART_ID_KEY).ok_or(ShopifyError::NoCart)?;
        let result = self.api.cart_lines_remove(&cart_id, line_ids).await;
        self.settle("Removed from cart", "Could not update your cart", result, |_| None)
            .await;
        Ok(())
    }

    /// Set a line's quantity. Anything below one is a removal, never an
    /// update to a zero quantity.
    pub async fn update_line_quantity(
        &self,
        line_id: impl Into<String>,
        quantity: i64,
    ) -> Result<(), ShopifyError> {
        let line_id = line_id.into();
        if quantity < 1 {
            return self.remove_lines(vec![line_id]).await;
        }
        self.update_lines(vec![CartLineUpdateInput {
            id: line_id,
            quantity: Some(quantity),
            merchandise_id: None,
            attributes: None,
        }])
        .await
    }

    /// Replace the cart's discount codes wholesale. Requires an existing cart.
    #[instrument(skip(self))]
    pub async fn update_discount_codes(
        &self,
        discount_codes: Vec<String>,
    ) -> Result<(), ShopifyError> {
        let cart_id = self.identity.get(CART_ID_KEY).ok_or(ShopifyError::NoCart)?;
        let result = self
            .api
            .cart_discount_codes_update(&cart_id, discount_codes)
            .await;
        self.settle(
            "Discounts updated",
            "Could not update discounts",
            result,
            |_| None,
        )
        .await;
        Ok(())
    }

    /// Add one discount code to whatever the cart already carries.
    /// Re-applying a code the cart already has is an informational no-op.
    #[instrument(skip(self))]
    pub async fn apply_discount(&self, code: &str) -> Result<(), ShopifyError> {
        let current = self.get().await;
        let mut codes: Vec<String> = current
            .as_ref()
            .map(|c| c.discount_codes.iter().map(|d| d.code.clone()).collect())
            .unwrap_or_default();

        if codes.iter().any(|c| c == code) {
            self.notifier.info("Discount already applied");
            return Ok(());
        }

        codes.push(code.to_string());
        self.update_discount_codes(codes).await
    }

    /// Remove one discount code, leaving the rest in place.
    #[instrument(skip(self))]
    pub async fn remove_discount(&self, code: &str) -> Result<(), ShopifyError> {
        let current = self.get().await;
        let codes: Vec<String> = current
            .as_ref()
            .map(|c| {
                c.discount_codes
                    .iter()
                    .map(|d| d.code.clone())
                    .filter(|c| c != code)
                    .collect()
            })
            .unwrap_or_default();

        self.update_discount_codes(codes).await
    }

    /// Attach buyer identity (pricing context, checkout prefill).
    /// Requires an existing cart.
    #[instrument(skip_all)]
    pub async fn update_buyer_identity(
        &self,
        buyer_identity: BuyerIdentityInput,
    ) -> Result<(), ShopifyError> {
        let cart_id = self.identity.get(CART_ID_KEY).ok_or(ShopifyError::NoCart)?;
        let result = self
            .api
            .cart_buyer_identity_update(&cart_id, buyer_identity)
            .await;
        self.settle("Cart updated", "Could not update your cart", result, |_| None)
            .await;
        Ok(())
    }

    /// Remove every line. A session without a cart is already clear.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), ShopifyError> {
        let Some(cart) = self.get().await else {
            return Ok(());
        };
        let line_ids: Vec<String> = cart.lines.iter().map(|l| l.id.clone()).collect();
        if line_ids.is_empty() {
            return Ok(());
        }
        self.remove_lines(line_ids).await
    }

    /// Classify a mutation outcome, publish state, and emit feedback.
    async fn settle<F>(
        &self,
        success_msg: &str,
        failure_msg: &str,
        result: Result<CartPayload, ShopifyError>,
        partial_check: F,
    ) where
        F: FnOnce(&Cart) -> Option<String>,
    {
        match result {
            Err(e) => {
                error!(error = %e, "cart mutation failed");
                self.notifier.error(failure_msg);
                self.refresh().await;
            }
            Ok(payload) => match payload.cart {
                None => {
                    if payload.user_errors.is_empty() {
                        error!("cart mutation returned neither cart nor user errors");
                        self.notifier.error(failure_msg);
                    } else {
                        warn!(errors = %join_user_errors(&payload.user_errors), "cart mutation rejected");
                        self.notifier.error(join_user_errors(&payload.user_errors));
                    }
                    self.refresh().await;
                }
                Some(cart) => {
                    // Whatever the service applied is now the truth
                    let partial = partial_check(&cart);
                    self.cart.set(Some(cart));

                    if !payload.user_errors.is_empty() {
                        self.notifier.warning(join_user_errors(&payload.user_errors));
                    } else if let Some(message) = partial {
                        self.notifier.warning(message);
                    } else {
                        self.notifier.success(success_msg);
                    }
                }
            },
        }
    }

    /// Best-effort re-fetch after a failed mutation so the published cart
    /// does not silently drift from the server. A failed refresh keeps the
    /// previous snapshot.
    async fn refresh(&self) {
        let Some(cart_id) = self.identity.get(CART_ID_KEY) else {
            return;
        };
        match self.api.cart(&cart_id).await {
            Ok(Some(cart)) => self.cart.set(Some(cart)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "recovery refresh failed"),
        }
    }

    fn published_quantities(&self, requested: &HashMap<String, i64>) -> HashMap<String, i64> {
        let snapshot = self.cart.get();
        requested
            .keys()
            .map(|variant| {
                let held = snapshot
                    .as_ref()
                    .map_or(0, |c| c.quantity_of_variant(variant));
                (variant.clone(), held)
            })
            .collect()
    }
}

fn requested_quantities(lines: &[CartLineInput]) -> HashMap<String, i64> {
    let mut requested: HashMap<String, i64> = HashMap::new();
    for line in lines {
        *requested.entry(line.merchandise_id.clone()).or_default() += line.quantity;
    }
    requested
}

/// How many requested items the returned cart failed to pick up. The
/// service clamps to stock, so applied quantity is min(requested, available).
fn shortfall(
    before: &HashMap<String, i64>,
    requested: &HashMap<String, i64>,
    cart: &Cart,
) -> Option<String> {
    let mut missing = 0;
    for (variant, wanted) in requested {
        let held_before = before.get(variant).copied().unwrap_or(0);
        let applied = (cart.quantity_of_variant(variant) - held_before).max(0);
        if applied < *wanted {
            missing += wanted - applied;
        }
    }
    if missing > 0 {
        Some(format!(
            "Only some items were added; {missing} unavailable"
        ))
    } else {
        None
    }
}

/// How far the returned line quantities fall short of an update request.
/// A line the service dropped entirely counts its full requested quantity.
fn update_shortfall(requested: &[(String, i64)], cart: &Cart) -> Option<String> {
    let mut missing = 0;
    for (line_id, wanted) in requested {
        let held = cart.line(line_id).map_or(0, |l| l.quantity);
        if held < *wanted {
            missing += wanted - held;
        }
    }
    if missing > 0 {
        Some(format!(
            "Only some items were updated; {missing} unavailable"
        ))
    } else {
        None
    }
}

// =============================================================================
// Display projection
// =============================================================================

/// A cart line flattened for display.
#[derive(Debug, Clone)]
pub struct FormattedCartLine {
    pub id: String,
    pub quantity: i64,
    pub product: CartMerchandiseProduct,
    pub variant_id: String,
    pub variant_title: String,
    pub image: Option<Image>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub selected_options: Vec<SelectedOption>,
    /// Line attributes as a map; attributes without a value are dropped.
    pub attributes: HashMap<String, String>,
    pub total: Money,
    pub subtotal: Money,
    pub per_item: Money,
}

/// Flatten a cart line into its display shape.
#[must_use]
pub fn format_cart_line(line: &CartLine) -> FormattedCartLine {
    FormattedCartLine {
        id: line.id.clone(),
        quantity: line.quantity,
        product: line.merchandise.product.clone(),
        variant_id: line.merchandise.id.clone(),
        variant_title: line.merchandise.title.clone(),
        image: line.merchandise.image.clone(),
        price: line.merchandise.price.clone(),
        compare_at_price: line.merchandise.compare_at_price.clone(),
        selected_options: line.merchandise.selected_options.clone(),
        attributes: line
            .attributes
            .iter()
            .filter_map(|Attribute { key, value }| {
                value.as_ref().map(|v| (key.clone(), v.clone()))
            })
            .collect(),
        total: line.cost.total_amount.clone(),
        subtotal: line.cost.subtotal_amount.clone(),
        per_item: line.cost.amount_per_quantity.clone(),
    }
}
