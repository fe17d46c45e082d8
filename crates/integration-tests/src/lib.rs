//! Test harness for the storefront state layer.
//!
//! [`InMemoryCommerce`] is a deterministic stand-in for the commerce API:
//! it keeps carts, customers and metafields in memory, clamps quantities to
//! configured stock the way the real service does, and can inject a fault
//! into the next call of any operation. Every call is recorded so tests can
//! assert that an operation made (or avoided) a round trip.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;

use tidewater_storefront::session::{IdentityStore, MemoryIdentityStore};
use tidewater_storefront::shopify::types::{
    AddressInput, AddressPayload, BuyerIdentityInput, Cart, CartInput, CartLineInput,
    CartLineUpdateInput, CartPayload, Customer, CustomerCreateInput, CustomerPayload,
    CustomerUpdateInput, Metafield, MetafieldIdentifier, MetafieldInput, MetafieldPayload,
    OrderPage, TokenPayload, UserError,
};
use tidewater_storefront::shopify::{CommerceApi, GraphQLError, MetafieldApi, ShopifyError};
use tidewater_storefront::wishlist::KeyValueGuestStorage;
use tidewater_storefront::Storefront;

/// Install a test subscriber once so `RUST_LOG` controls test output.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

// =============================================================================
// Fake backend state
// =============================================================================

#[derive(Debug, Clone)]
struct FakeLine {
    id: String,
    variant_id: String,
    quantity: i64,
}

#[derive(Debug, Clone, Default)]
struct FakeCart {
    id: String,
    lines: Vec<FakeLine>,
    discount_codes: Vec<String>,
    buyer_email: Option<String>,
}

#[derive(Debug, Clone)]
struct FakeCustomer {
    id: String,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    addresses: Vec<(String, AddressInput)>,
    default_address: Option<String>,
    /// (namespace, key) -> (metafield id, value, type)
    metafields: HashMap<(String, String), (String, String, String)>,
}

#[derive(Default)]
struct State {
    carts: HashMap<String, FakeCart>,
    /// Per-variant stock ceiling; absent means unlimited.
    stock: HashMap<String, i64>,
    prices: HashMap<String, Decimal>,
    inapplicable_codes: HashSet<String>,
    customers: HashMap<String, FakeCustomer>,
    tokens: HashMap<String, String>,
    fail_ops: HashSet<&'static str>,
    calls: Vec<&'static str>,
}

/// In-memory commerce backend implementing both API traits.
#[derive(Default)]
pub struct InMemoryCommerce {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl InMemoryCommerce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }

    /// Cap how many units of a variant any cart may hold.
    pub fn set_stock(&self, variant_id: &str, limit: i64) {
        self.state
            .lock()
            .unwrap()
            .stock
            .insert(variant_id.to_string(), limit);
    }

    pub fn set_price(&self, variant_id: &str, price: Decimal) {
        self.state
            .lock()
            .unwrap()
            .prices
            .insert(variant_id.to_string(), price);
    }

    /// Codes that the service accepts but marks inapplicable.
    pub fn mark_code_inapplicable(&self, code: &str) {
        self.state
            .lock()
            .unwrap()
            .inapplicable_codes
            .insert(code.to_string());
    }

    /// Seed a registered customer; returns its ID.
    pub fn add_customer(&self, email: &str, password: &str) -> String {
        let id = self.next_id("gid://shopify/Customer");
        self.state.lock().unwrap().customers.insert(
            email.to_string(),
            FakeCustomer {
                id: id.clone(),
                email: email.to_string(),
                password: password.to_string(),
                first_name: None,
                last_name: None,
                addresses: Vec::new(),
                default_address: None,
                metafields: HashMap::new(),
            },
        );
        id
    }

    /// Seed a valid access token for a seeded customer.
    pub fn add_token(&self, token: &str, email: &str) {
        self.state
            .lock()
            .unwrap()
            .tokens
            .insert(token.to_string(), email.to_string());
    }

    /// Delete a customer while leaving any issued tokens dangling, the way
    /// a served-side account deletion would.
    pub fn delete_customer(&self, email: &str) {
        self.state.lock().unwrap().customers.remove(email);
    }

    /// Make the next call to `op` fail with a service fault.
    pub fn fail_next(&self, op: &'static str) {
        self.state.lock().unwrap().fail_ops.insert(op);
    }

    /// Operations invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Direct metafield read for assertions, bypassing the API.
    #[must_use]
    pub fn metafield_value(&self, email: &str, namespace: &str, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let customer = state.customers.get(email)?;
        customer
            .metafields
            .get(&(namespace.to_string(), key.to_string()))
            .map(|(_, value, _)| value.clone())
    }

    fn guard(&self, op: &'static str) -> Result<MutexGuard<'_, State>, ShopifyError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if state.fail_ops.remove(op) {
            return Err(ShopifyError::GraphQL(vec![GraphQLError {
                message: format!("injected fault in {op}"),
                path: vec![],
            }]));
        }
        Ok(state)
    }
}

fn price_of(state: &State, variant_id: &str) -> Decimal {
    state
        .prices
        .get(variant_id)
        .copied()
        .unwrap_or_else(|| Decimal::from(10))
}

fn held_quantity(cart: &FakeCart, variant_id: &str) -> i64 {
    cart.lines
        .iter()
        .filter(|l| l.variant_id == variant_id)
        .map(|l| l.quantity)
        .sum()
}

fn clamp_to_stock(state: &State, cart: &FakeCart, variant_id: &str, requested: i64) -> i64 {
    match state.stock.get(variant_id) {
        Some(limit) => requested.min((limit - held_quantity(cart, variant_id)).max(0)),
        None => requested,
    }
}

fn money(amount: Decimal) -> serde_json::Value {
    json!({ "amount": amount.to_string(), "currencyCode": "USD" })
}

/// Render a fake cart in the wire shape `Cart` deserializes from.
fn render_cart(state: &State, cart: &FakeCart) -> Cart {
    let mut subtotal = Decimal::ZERO;
    let edges: Vec<serde_json::Value> = cart
        .lines
        .iter()
        .map(|line| {
            let price = price_of(state, &line.variant_id);
            let line_subtotal = price * Decimal::from(line.quantity);
            subtotal += line_subtotal;
            json!({
                "node": {
                    "id": line.id,
                    "quantity": line.quantity,
                    "attributes": [],
                    "cost": {
                        "totalAmount": money(line_subtotal),
                        "subtotalAmount": money(line_subtotal),
                        "amountPerQuantity": money(price),
                    },
                    "merchandise": {
                        "id": line.variant_id,
                        "title": "Default",
                        "selectedOptions": [],
                        "product": {
                            "id": format!("{}-product", line.variant_id),
                            "title": "Test Product",
                            "handle": "test-product",
                            "vendor": "Tidewater",
                        },
                        "image": null,
                        "price": money(price),
                        "compareAtPrice": null,
                    }
                }
            })
        })
        .collect();

    let discount_codes: Vec<serde_json::Value> = cart
        .discount_codes
        .iter()
        .map(|code| {
            json!({
                "code": code,
                "applicable": !state.inapplicable_codes.contains(code),
            })
        })
        .collect();

    let total_quantity: i64 = cart.lines.iter().map(|l| l.quantity).sum();

    serde_json::from_value(json!({
        "id": cart.id,
        "checkoutUrl": format!("https://tidewater.test/checkout/{}", cart.id),
        "totalQuantity": total_quantity,
        "buyerIdentity": cart.buyer_email.as_ref().map(|email| json!({
            "countryCode": "US",
            "customer": null,
            "email": email,
            "phone": null,
        })),
        "lines": { "edges": edges },
        "cost": {
            "subtotalAmount": money(subtotal),
            "totalAmount": money(subtotal),
            "totalTaxAmount": null,
            "totalDutyAmount": null,
        },
        "attributes": [],
        "discountCodes": discount_codes,
    }))
    .expect("fake cart must deserialize")
}

fn render_customer(customer: &FakeCustomer) -> Customer {
    let render_address = |(id, input): &(String, AddressInput)| {
        json!({
            "id": id,
            "formatted": [],
            "firstName": input.first_name,
            "lastName": input.last_name,
            "company": input.company,
            "address1": input.address1,
            "address2": input.address2,
            "country": input.country,
            "province": input.province,
            "city": input.city,
            "zip": input.zip,
            "phone": input.phone,
        })
    };

    let default_address = customer
        .default_address
        .as_ref()
        .and_then(|id| customer.addresses.iter().find(|(a, _)| a == id))
        .map(render_address);

    let edges: Vec<serde_json::Value> = customer
        .addresses
        .iter()
        .map(|a| json!({ "node": render_address(a) }))
        .collect();

    serde_json::from_value(json!({
        "id": customer.id,
        "firstName": customer.first_name,
        "lastName": customer.last_name,
        "displayName": null,
        "email": customer.email,
        "phone": null,
        "defaultAddress": default_address,
        "addresses": { "edges": edges },
    }))
    .expect("fake customer must deserialize")
}

fn user_error(message: &str) -> UserError {
    UserError {
        field: None,
        message: message.to_string(),
    }
}

#[async_trait]
impl CommerceApi for InMemoryCommerce {
    async fn cart(&self, cart_id: &str) -> Result<Option<Cart>, ShopifyError> {
        let state = self.guard("cart")?;
        Ok(state.carts.get(cart_id).map(|c| render_cart(&state, c)))
    }

    async fn cart_create(&self, input: CartInput) -> Result<CartPayload, ShopifyError> {
        let mut state = self.guard("cart_create")?;
        let mut cart = FakeCart {
            id: self.next_id("gid://shopify/Cart"),
            discount_codes: input.discount_codes,
            buyer_email: input.buyer_identity.and_then(|b| b.email),
            ..FakeCart::default()
        };

        for line in input.lines {
            let applied = clamp_to_stock(&state, &cart, &line.merchandise_id, line.quantity);
            if applied > 0 {
                cart.lines.push(FakeLine {
                    id: self.next_id("gid://shopify/CartLine"),
                    variant_id: line.merchandise_id,
                    quantity: applied,
                });
            }
        }

        let rendered = render_cart(&state, &cart);
        state.carts.insert(cart.id.clone(), cart);
        Ok(CartPayload {
            cart: Some(rendered),
            user_errors: vec![],
        })
    }

    async fn cart_lines_add(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> Result<CartPayload, ShopifyError> {
        let mut state = self.guard("cart_lines_add")?;
        let Some(mut cart) = state.carts.get(cart_id).cloned() else {
            return Ok(CartPayload {
                cart: None,
                user_errors: vec![user_error("Cart not found")],
            });
        };

        for line in lines {
            let applied = clamp_to_stock(&state, &cart, &line.merchandise_id, line.quantity);
            if applied == 0 {
                continue;
            }
            // Same merchandise merges service-side; distinct variants never do
            match cart
                .lines
                .iter_mut()
                .find(|l| l.variant_id == line.merchandise_id)
            {
                Some(existing) => existing.quantity += applied,
                None => cart.lines.push(FakeLine {
                    id: self.next_id("gid://shopify/CartLine"),
                    variant_id: line.merchandise_id,
                    quantity: applied,
                }),
            }
        }

        let rendered = render_cart(&state, &cart);
        state.carts.insert(cart.id.clone(), cart);
        Ok(CartPayload {
            cart: Some(rendered),
            user_errors: vec![],
        })
    }

    async fn cart_lines_update(
        &self,
        cart_id: &str,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<CartPayload, ShopifyError> {
        let mut state = self.guard("cart_lines_update")?;
        let Some(mut cart) = state.carts.get(cart_id).cloned() else {
            return Ok(CartPayload {
                cart: None,
                user_errors: vec![user_error("Cart not found")],
            });
        };

        let mut user_errors = Vec::new();
        for update in lines {
            let Some(line) = cart.lines.iter_mut().find(|l| l.id == update.id) else {
                user_errors.push(user_error("Line not found"));
                continue;
            };
            if let Some(quantity) = update.quantity {
                let ceiling = state
                    .stock
                    .get(&line.variant_id)
                    .copied()
                    .unwrap_or(i64::MAX);
                line.quantity = quantity.min(ceiling);
            }
        }

        let rendered = render_cart(&state, &cart);
        state.carts.insert(cart.id.clone(), cart);
        Ok(CartPayload {
            cart: Some(rendered),
            user_errors,
        })
    }

    async fn cart_lines_remove(
        &self,
        cart_id: &str,
        line_ids: Vec<String>,
    ) -> Result<CartPayload, ShopifyError> {
        let mut state = self.guard("cart_lines_remove")?;
        let Some(mut cart) = state.carts.get(cart_id).cloned() else {
            return Ok(CartPayload {
                cart: None,
                user_errors: vec![user_error("Cart not found")],
            });
        };

        cart.lines.retain(|l| !line_ids.contains(&l.id));

        let rendered = render_cart(&state, &cart);
        state.carts.insert(cart.id.clone(), cart);
        Ok(CartPayload {
            cart: Some(rendered),
            user_errors: vec![],
        })
    }

    async fn cart_discount_codes_update(
        &self,
        cart_id: &str,
        discount_codes: Vec<String>,
    ) -> Result<CartPayload, ShopifyError> {
        let mut state = self.guard("cart_discount_codes_update")?;
        let Some(mut cart) = state.carts.get(cart_id).cloned() else {
            return Ok(CartPayload {
                cart: None,
                user_errors: vec![user_error("Cart not found")],
            });
        };

        cart.discount_codes = discount_codes;

        let rendered = render_cart(&state, &cart);
        state.carts.insert(cart.id.clone(), cart);
        Ok(CartPayload {
            cart: Some(rendered),
            user_errors: vec![],
        })
    }

    async fn cart_buyer_identity_update(
        &self,
        cart_id: &str,
        buyer_identity: BuyerIdentityInput,
    ) -> Result<CartPayload, ShopifyError> {
        let mut state = self.guard("cart_buyer_identity_update")?;
        let Some(mut cart) = state.carts.get(cart_id).cloned() else {
            return Ok(CartPayload {
                cart: None,
                user_errors: vec![user_error("Cart not found")],
            });
        };

        cart.buyer_email = buyer_identity.email;

        let rendered = render_cart(&state, &cart);
        state.carts.insert(cart.id.clone(), cart);
        Ok(CartPayload {
            cart: Some(rendered),
            user_errors: vec![],
        })
    }

    async fn customer(&self, access_token: &str) -> Result<Option<Customer>, ShopifyError> {
        let state = self.guard("customer")?;
        Ok(state
            .tokens
            .get(access_token)
            .and_then(|email| state.customers.get(email))
            .map(render_customer))
    }

    async fn access_token_create(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenPayload, ShopifyError> {
        let mut state = self.guard("access_token_create")?;
        let valid = state
            .customers
            .get(email)
            .is_some_and(|c| c.password == password);

        if !valid {
            return Ok(TokenPayload {
                token: None,
                user_errors: vec![user_error("Unidentified customer")],
            });
        }

        let token = self.next_id("token");
        state.tokens.insert(token.clone(), email.to_string());
        Ok(TokenPayload {
            token: Some(serde_json::from_value(json!({
                "accessToken": token,
                "expiresAt": null,
            }))?),
            user_errors: vec![],
        })
    }

    async fn access_token_delete(&self, access_token: &str) -> Result<(), ShopifyError> {
        let mut state = self.guard("access_token_delete")?;
        state.tokens.remove(access_token);
        Ok(())
    }

    async fn customer_create(
        &self,
        input: CustomerCreateInput,
    ) -> Result<CustomerPayload, ShopifyError> {
        let mut state = self.guard("customer_create")?;
        if state.customers.contains_key(&input.email) {
            return Ok(CustomerPayload {
                customer_id: None,
                user_errors: vec![user_error("Email has already been taken")],
            });
        }

        let id = self.next_id("gid://shopify/Customer");
        state.customers.insert(
            input.email.clone(),
            FakeCustomer {
                id: id.clone(),
                email: input.email,
                password: input.password,
                first_name: input.first_name,
                last_name: input.last_name,
                addresses: Vec::new(),
                default_address: None,
                metafields: HashMap::new(),
            },
        );
        Ok(CustomerPayload {
            customer_id: Some(id),
            user_errors: vec![],
        })
    }

    async fn customer_update(
        &self,
        access_token: &str,
        input: CustomerUpdateInput,
    ) -> Result<CustomerPayload, ShopifyError> {
        let mut state = self.guard("customer_update")?;
        let Some(email) = state.tokens.get(access_token).cloned() else {
            return Ok(CustomerPayload {
                customer_id: None,
                user_errors: vec![user_error("Invalid access token")],
            });
        };
        let Some(customer) = state.customers.get_mut(&email) else {
            return Ok(CustomerPayload {
                customer_id: None,
                user_errors: vec![user_error("Customer not found")],
            });
        };

        if input.first_name.is_some() {
            customer.first_name = input.first_name;
        }
        if input.last_name.is_some() {
            customer.last_name = input.last_name;
        }
        if let Some(password) = input.password {
            customer.password = password;
        }
        Ok(CustomerPayload {
            customer_id: Some(customer.id.clone()),
            user_errors: vec![],
        })
    }

    async fn address_create(
        &self,
        access_token: &str,
        address: AddressInput,
    ) -> Result<AddressPayload, ShopifyError> {
        let mut state = self.guard("address_create")?;
        let Some(email) = state.tokens.get(access_token).cloned() else {
            return Ok(AddressPayload {
                address_id: None,
                user_errors: vec![user_error("Invalid access token")],
            });
        };
        let id = self.next_id("gid://shopify/MailingAddress");
        if let Some(customer) = state.customers.get_mut(&email) {
            customer.addresses.push((id.clone(), address));
        }
        Ok(AddressPayload {
            address_id: Some(id),
            user_errors: vec![],
        })
    }

    async fn address_update(
        &self,
        access_token: &str,
        address_id: &str,
        address: AddressInput,
    ) -> Result<AddressPayload, ShopifyError> {
        let mut state = self.guard("address_update")?;
        let Some(email) = state.tokens.get(access_token).cloned() else {
            return Ok(AddressPayload {
                address_id: None,
                user_errors: vec![user_error("Invalid access token")],
            });
        };
        let Some(customer) = state.customers.get_mut(&email) else {
            return Ok(AddressPayload {
                address_id: None,
                user_errors: vec![user_error("Customer not found")],
            });
        };
        match customer.addresses.iter_mut().find(|(id, _)| id == address_id) {
            Some(slot) => {
                slot.1 = address;
                Ok(AddressPayload {
                    address_id: Some(address_id.to_string()),
                    user_errors: vec![],
                })
            }
            None => Ok(AddressPayload {
                address_id: None,
                user_errors: vec![user_error("Address not found")],
            }),
        }
    }

    async fn address_delete(
        &self,
        access_token: &str,
        address_id: &str,
    ) -> Result<AddressPayload, ShopifyError> {
        let mut state = self.guard("address_delete")?;
        let Some(email) = state.tokens.get(access_token).cloned() else {
            return Ok(AddressPayload {
                address_id: None,
                user_errors: vec![user_error("Invalid access token")],
            });
        };
        if let Some(customer) = state.customers.get_mut(&email) {
            customer.addresses.retain(|(id, _)| id != address_id);
            if customer.default_address.as_deref() == Some(address_id) {
                customer.default_address = None;
            }
        }
        Ok(AddressPayload {
            address_id: Some(address_id.to_string()),
            user_errors: vec![],
        })
    }

    async fn default_address_update(
        &self,
        access_token: &str,
        address_id: &str,
    ) -> Result<CustomerPayload, ShopifyError> {
        let mut state = self.guard("default_address_update")?;
        let Some(email) = state.tokens.get(access_token).cloned() else {
            return Ok(CustomerPayload {
                customer_id: None,
                user_errors: vec![user_error("Invalid access token")],
            });
        };
        let Some(customer) = state.customers.get_mut(&email) else {
            return Ok(CustomerPayload {
                customer_id: None,
                user_errors: vec![user_error("Customer not found")],
            });
        };
        if !customer.addresses.iter().any(|(id, _)| id == address_id) {
            return Ok(CustomerPayload {
                customer_id: None,
                user_errors: vec![user_error("Address not found")],
            });
        }
        customer.default_address = Some(address_id.to_string());
        Ok(CustomerPayload {
            customer_id: Some(customer.id.clone()),
            user_errors: vec![],
        })
    }

    async fn customer_recover(&self, _email: &str) -> Result<Vec<UserError>, ShopifyError> {
        self.guard("customer_recover")?;
        // Succeeds silently even for unknown addresses
        Ok(vec![])
    }

    async fn customer_reset(
        &self,
        customer_id: &str,
        _reset_token: &str,
        password: &str,
    ) -> Result<TokenPayload, ShopifyError> {
        let mut state = self.guard("customer_reset")?;
        let Some(email) = state
            .customers
            .values()
            .find(|c| c.id == customer_id)
            .map(|c| c.email.clone())
        else {
            return Ok(TokenPayload {
                token: None,
                user_errors: vec![user_error("Customer not found")],
            });
        };

        if let Some(customer) = state.customers.get_mut(&email) {
            customer.password = password.to_string();
        }
        let token = self.next_id("token");
        state.tokens.insert(token.clone(), email);
        Ok(TokenPayload {
            token: Some(serde_json::from_value(json!({
                "accessToken": token,
                "expiresAt": null,
            }))?),
            user_errors: vec![],
        })
    }

    async fn customer_orders(
        &self,
        access_token: &str,
        _first: i64,
        _after: Option<String>,
    ) -> Result<OrderPage, ShopifyError> {
        let state = self.guard("customer_orders")?;
        if !state.tokens.contains_key(access_token) {
            return Err(ShopifyError::NotAuthenticated);
        }
        Ok(OrderPage::default())
    }
}

#[async_trait]
impl MetafieldApi for InMemoryCommerce {
    async fn customer_metafields(
        &self,
        access_token: &str,
        identifiers: Vec<MetafieldIdentifier>,
    ) -> Result<Vec<Metafield>, ShopifyError> {
        let state = self.guard("customer_metafields")?;
        let Some(customer) = state
            .tokens
            .get(access_token)
            .and_then(|email| state.customers.get(email))
        else {
            return Ok(vec![]);
        };

        let mut found = Vec::new();
        for identifier in identifiers {
            let key = (identifier.namespace.clone(), identifier.key.clone());
            if let Some((id, value, value_type)) = customer.metafields.get(&key) {
                found.push(Metafield {
                    id: id.clone(),
                    namespace: identifier.namespace,
                    key: identifier.key,
                    value: value.clone(),
                    value_type: value_type.clone(),
                });
            }
        }
        Ok(found)
    }

    async fn metafield_set(
        &self,
        access_token: &str,
        input: MetafieldInput,
    ) -> Result<MetafieldPayload, ShopifyError> {
        let mut state = self.guard("metafield_set")?;
        let Some(email) = state.tokens.get(access_token).cloned() else {
            return Ok(MetafieldPayload {
                metafield: None,
                user_errors: vec![user_error("Invalid access token")],
            });
        };
        let Some(customer) = state.customers.get_mut(&email) else {
            return Ok(MetafieldPayload {
                metafield: None,
                user_errors: vec![user_error("Customer not found")],
            });
        };

        let id = self.next_id("gid://shopify/Metafield");
        customer.metafields.insert(
            (input.namespace.clone(), input.key.clone()),
            (id.clone(), input.value.clone(), input.value_type.clone()),
        );
        Ok(MetafieldPayload {
            metafield: Some(Metafield {
                id,
                namespace: input.namespace,
                key: input.key,
                value: input.value,
                value_type: input.value_type,
            }),
            user_errors: vec![],
        })
    }

    async fn metafield_delete(&self, id: &str) -> Result<Option<String>, ShopifyError> {
        let mut state = self.guard("metafield_delete")?;
        for customer in state.customers.values_mut() {
            let before = customer.metafields.len();
            customer.metafields.retain(|_, (mf_id, _, _)| mf_id != id);
            if customer.metafields.len() < before {
                return Ok(Some(id.to_string()));
            }
        }
        Ok(None)
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A storefront wired over the in-memory backend plus handles for seeding
/// and asserting.
pub struct Harness {
    pub storefront: Storefront,
    pub commerce: Arc<InMemoryCommerce>,
    pub identity: Arc<MemoryIdentityStore>,
    pub guest_store: Arc<MemoryIdentityStore>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        init_tracing();
        let commerce = Arc::new(InMemoryCommerce::new());
        let identity = Arc::new(MemoryIdentityStore::new());
        let guest_store = Arc::new(MemoryIdentityStore::new());
        let guest = Arc::new(KeyValueGuestStorage::new(
            Arc::clone(&guest_store) as Arc<dyn IdentityStore>
        ));

        let storefront = Storefront::with_api(
            Arc::clone(&commerce) as Arc<dyn CommerceApi>,
            Arc::clone(&commerce) as Arc<dyn MetafieldApi>,
            Arc::clone(&identity) as Arc<dyn IdentityStore>,
            guest,
        );

        Self {
            storefront,
            commerce,
            identity,
            guest_store,
        }
    }

    /// Seed a logged-in session without going through the login flow.
    pub fn seed_session(&self, email: &str, token: &str) {
        self.commerce.add_customer(email, "password1");
        self.commerce.add_token(token, email);
        self.identity
            .set(tidewater_storefront::session::CUSTOMER_TOKEN_KEY, token);
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
