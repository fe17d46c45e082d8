//! Shopify Storefront API client implementation.
//!
//! Hand-written GraphQL documents executed over `reqwest` 0.13, with
//! response caching via `moka` for read queries that opt in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use crate::config::StorefrontConfig;
use crate::shopify::api::{CommerceApi, MetafieldApi};
use crate::shopify::{GraphQLError, ShopifyError, documents};

use super::types::{
    AddressInput, AddressPayload, BuyerIdentityInput, Cart, CartInput, CartLineInput,
    CartLineUpdateInput, CartPayload, Customer, CustomerCreateInput, CustomerPayload,
    CustomerUpdateInput, Metafield, MetafieldIdentifier, MetafieldInput, MetafieldPayload, Order,
    OrderPage, PageInfo, TokenPayload, UserError, join_user_errors,
};

// =============================================================================
// Cache policy
// =============================================================================

/// How long a query response may be served from cache.
///
/// Mutations always bypass the cache regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Never cache. Session-scoped reads (cart, customer) use this.
    NoStore,
    /// Cache for one minute.
    Short,
    /// Cache for one hour. Catalog-style reads use this.
    Long,
}

impl CacheMode {
    fn ttl(self) -> Option<Duration> {
        match self {
            Self::NoStore => None,
            Self::Short => Some(Duration::from_secs(60)),
            Self::Long => Some(Duration::from_secs(3600)),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    data: Value,
    ttl: Duration,
}

struct PerEntryExpiry;

impl moka::Expiry<String, CachedEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Where the client runs, which decides the access token it presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientContext {
    /// Server-side rendering or background work: private token.
    Server,
    /// End-user device: public token only.
    Browser,
}

/// Client for the Shopify Storefront API.
///
/// Cheap to clone; all clones share the HTTP connection pool and cache.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    endpoint: String,
    token_header: &'static str,
    access_token: String,
    country: String,
    language: String,
    cache: Cache<String, CachedEntry>,
}

impl StorefrontClient {
    /// Create a client for the given execution context.
    #[must_use]
    pub fn new(config: &StorefrontConfig, context: ClientContext) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .expire_after(PerEntryExpiry)
            .build();

        // Private access tokens use a different header than public tokens
        // See: https://shopify.dev/docs/storefronts/headless/building-with-the-storefront-api/getting-started
        let (token_header, access_token) = match context {
            ClientContext::Server => (
                "Shopify-Storefront-Private-Token",
                config.private_token.expose_secret().to_string(),
            ),
            ClientContext::Browser => (
                "X-Shopify-Storefront-Access-Token",
                config.public_token.clone(),
            ),
        };

        Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                endpoint: config.endpoint(),
                token_header,
                access_token,
                country: config.country.clone(),
                language: config.language.clone(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL document, honoring the cache mode for reads.
    pub async fn query(
        &self,
        document: &str,
        variables: Value,
        cache: CacheMode,
    ) -> Result<Value, ShopifyError> {
        let variables = inject_i18n(variables, &self.inner.country, &self.inner.language);

        let cache_key = cache
            .ttl()
            .map(|_| format!("{document}\u{0}{variables}"));

        if let Some(key) = &cache_key
            && let Some(entry) = self.inner.cache.get(key).await
        {
            return Ok(entry.data);
        }

        let data = self.execute(document, &variables).await?;

        if let (Some(key), Some(ttl)) = (cache_key, cache.ttl()) {
            self.inner
                .cache
                .insert(key, CachedEntry { data: data.clone(), ttl })
                .await;
        }

        Ok(data)
    }

    /// Execute a mutation. Never cached.
    pub async fn mutate(&self, document: &str, variables: Value) -> Result<Value, ShopifyError> {
        let variables = inject_i18n(variables, &self.inner.country, &self.inner.language);
        self.execute(document, &variables).await
    }

    async fn execute(&self, document: &str, variables: &Value) -> Result<Value, ShopifyError> {
        let response = self
            .inner
            .http
            .post(&self.inner.endpoint)
            .header(self.inner.token_header, &self.inner.access_token)
            .header("Content-Type", "application/json")
            .json(&json!({
                "query": document,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "storefront API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError {
                message: format!(
                    "HTTP {status}: {}",
                    response_text.chars().take(200).collect::<String>()
                ),
                path: vec![],
            }]));
        }

        let body: Value = match serde_json::from_str(&response_text) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "failed to parse storefront GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors
                    .iter()
                    .map(|e| GraphQLError {
                        message: e
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("(no message)")
                            .to_string(),
                        path: e
                            .get("path")
                            .and_then(Value::as_array)
                            .cloned()
                            .unwrap_or_default(),
                    })
                    .collect(),
            ));
        }

        match body.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => Err(ShopifyError::MissingData("data".to_string())),
        }
    }
}

/// Add the i18n context to the variables object. Documents that do not
/// declare the variables simply ignore them.
fn inject_i18n(variables: Value, country: &str, language: &str) -> Value {
    let mut map = match variables {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => return other,
    };
    map.entry("country").or_insert_with(|| json!(country));
    map.entry("language").or_insert_with(|| json!(language));
    Value::Object(map)
}

fn take_field(mut data: Value, name: &str) -> Result<Value, ShopifyError> {
    match data.get_mut(name) {
        Some(v) => Ok(v.take()),
        None => Err(ShopifyError::MissingData(name.to_string())),
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, ShopifyError> {
    Ok(serde_json::from_value(value)?)
}

fn parse_optional<T: DeserializeOwned>(value: Value) -> Result<Option<T>, ShopifyError> {
    if value.is_null() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_value(value)?))
    }
}

// Raw wire shapes for mutations whose selection differs from the domain type.

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct RawCustomerPayload {
    customer: Option<IdOnly>,
    #[serde(rename = "customerUserErrors", default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct RawAddressPayload {
    #[serde(rename = "customerAddress")]
    address: Option<IdOnly>,
    #[serde(rename = "customerUserErrors", default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct RawAddressDeletePayload {
    #[serde(rename = "deletedCustomerAddressId")]
    deleted_id: Option<String>,
    #[serde(rename = "customerUserErrors", default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderConnection {
    page_info: PageInfo,
    edges: Vec<RawOrderEdge>,
}

#[derive(Deserialize)]
struct RawOrderEdge {
    node: Order,
}

#[derive(Deserialize)]
struct RawOrdersCustomer {
    orders: RawOrderConnection,
}

#[derive(Deserialize)]
struct RawMetafieldsCustomer {
    #[serde(default)]
    metafields: Vec<Option<Metafield>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetafieldsSetPayload {
    #[serde(default)]
    metafields: Vec<Metafield>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetafieldDeletePayload {
    deleted_id: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[async_trait]
impl CommerceApi for StorefrontClient {
    #[instrument(skip(self))]
    async fn cart(&self, cart_id: &str) -> Result<Option<Cart>, ShopifyError> {
        let data = self
            .query(
                &documents::GET_CART,
                json!({ "cartId": cart_id }),
                CacheMode::NoStore,
            )
            .await?;
        parse_optional(take_field(data, "cart")?)
    }

    #[instrument(skip(self, input))]
    async fn cart_create(&self, input: CartInput) -> Result<CartPayload, ShopifyError> {
        let data = self
            .mutate(&documents::CART_CREATE, json!({ "input": input }))
            .await?;
        parse(take_field(data, "cartCreate")?)
    }

    #[instrument(skip(self, lines))]
    async fn cart_lines_add(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> Result<CartPayload, ShopifyError> {
        let data = self
            .mutate(
                &documents::CART_LINES_ADD,
                json!({ "cartId": cart_id, "lines": lines }),
            )
            .await?;
        parse(take_field(data, "cartLinesAdd")?)
    }

    #[instrument(skip(self, lines))]
    async fn cart_lines_update(
        &self,
        cart_id: &str,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<CartPayload, ShopifyError> {
        let data = self
            .mutate(
                &documents::CART_LINES_UPDATE,
                json!({ "cartId": cart_id, "lines": lines }),
            )
            .await?;
        parse(take_field(data, "cartLinesUpdate")?)
    }

    #[instrument(skip(self))]
    async fn cart_lines_remove(
        &self,
        cart_id: &str,
        line_ids: Vec<String>,
    ) -> Result<CartPayload, ShopifyError> {
        let data = self
            .mutate(
                &documents::CART_LINES_REMOVE,
                json!({ "cartId": cart_id, "lineIds": line_ids }),
            )
            .await?;
        parse(take_field(data, "cartLinesRemove")?)
    }

    #[instrument(skip(self))]
    async fn cart_discount_codes_update(
        &self,
        cart_id: &str,
        discount_codes: Vec<String>,
    ) -> Result<CartPayload, ShopifyError> {
        let data = self
            .mutate(
                &documents::CART_DISCOUNT_CODES_UPDATE,
                json!({ "cartId": cart_id, "discountCodes": discount_codes }),
            )
            .await?;
        parse(take_field(data, "cartDiscountCodesUpdate")?)
    }

    #[instrument(skip(self, buyer_identity))]
    async fn cart_buyer_identity_update(
        &self,
        cart_id: &str,
        buyer_identity: BuyerIdentityInput,
    ) -> Result<CartPayload, ShopifyError> {
        let data = self
            .mutate(
                &documents::CART_BUYER_IDENTITY_UPDATE,
                json!({ "cartId": cart_id, "buyerIdentity": buyer_identity }),
            )
            .await?;
        parse(take_field(data, "cartBuyerIdentityUpdate")?)
    }

    #[instrument(skip_all)]
    async fn customer(&self, access_token: &str) -> Result<Option<Customer>, ShopifyError> {
        let data = self
            .query(
                &documents::GET_CUSTOMER,
                json!({ "customerAccessToken": access_token }),
                CacheMode::NoStore,
            )
            .await?;
        parse_optional(take_field(data, "customer")?)
    }

    #[instrument(skip_all)]
    async fn access_token_create(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenPayload, ShopifyError> {
        let data = self
            .mutate(
                documents::ACCESS_TOKEN_CREATE,
                json!({ "input": { "email": email, "password": password } }),
            )
            .await?;
        parse(take_field(data, "customerAccessTokenCreate")?)
    }

    #[instrument(skip_all)]
    async fn access_token_delete(&self, access_token: &str) -> Result<(), ShopifyError> {
        self.mutate(
            documents::ACCESS_TOKEN_DELETE,
            json!({ "customerAccessToken": access_token }),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn customer_create(
        &self,
        input: CustomerCreateInput,
    ) -> Result<CustomerPayload, ShopifyError> {
        let data = self
            .mutate(documents::CUSTOMER_CREATE, json!({ "input": input }))
            .await?;
        let raw: RawCustomerPayload = parse(take_field(data, "customerCreate")?)?;
        Ok(CustomerPayload {
            customer_id: raw.customer.map(|c| c.id),
            user_errors: raw.user_errors,
        })
    }

    #[instrument(skip_all)]
    async fn customer_update(
        &self,
        access_token: &str,
        input: CustomerUpdateInput,
    ) -> Result<CustomerPayload, ShopifyError> {
        let data = self
            .mutate(
                documents::CUSTOMER_UPDATE,
                json!({ "customerAccessToken": access_token, "customer": input }),
            )
            .await?;
        let raw: RawCustomerPayload = parse(take_field(data, "customerUpdate")?)?;
        Ok(CustomerPayload {
            customer_id: raw.customer.map(|c| c.id),
            user_errors: raw.user_errors,
        })
    }

    #[instrument(skip_all)]
    async fn address_create(
        &self,
        access_token: &str,
        address: AddressInput,
    ) -> Result<AddressPayload, ShopifyError> {
        let data = self
            .mutate(
                documents::ADDRESS_CREATE,
                json!({ "customerAccessToken": access_token, "address": address }),
            )
            .await?;
        let raw: RawAddressPayload = parse(take_field(data, "customerAddressCreate")?)?;
        Ok(AddressPayload {
            address_id: raw.address.map(|a| a.id),
            user_errors: raw.user_errors,
        })
    }

    #[instrument(skip_all, fields(address_id = %address_id))]
    async fn address_update(
        &self,
        access_token: &str,
        address_id: &str,
        address: AddressInput,
    ) -> Result<AddressPayload, ShopifyError> {
        let data = self
            .mutate(
                documents::ADDRESS_UPDATE,
                json!({
                    "customerAccessToken": access_token,
                    "id": address_id,
                    "address": address,
                }),
            )
            .await?;
        let raw: RawAddressPayload = parse(take_field(data, "customerAddressUpdate")?)?;
        Ok(AddressPayload {
            address_id: raw.address.map(|a| a.id),
            user_errors: raw.user_errors,
        })
    }

    #[instrument(skip_all, fields(address_id = %address_id))]
    async fn address_delete(
        &self,
        access_token: &str,
        address_id: &str,
    ) -> Result<AddressPayload, ShopifyError> {
        let data = self
            .mutate(
                documents::ADDRESS_DELETE,
                json!({ "customerAccessToken": access_token, "id": address_id }),
            )
            .await?;
        let raw: RawAddressDeletePayload = parse(take_field(data, "customerAddressDelete")?)?;
        Ok(AddressPayload {
            address_id: raw.deleted_id,
            user_errors: raw.user_errors,
        })
    }

    #[instrument(skip_all, fields(address_id = %address_id))]
    async fn default_address_update(
        &self,
        access_token: &str,
        address_id: &str,
    ) -> Result<CustomerPayload, ShopifyError> {
        let data = self
            .mutate(
                documents::DEFAULT_ADDRESS_UPDATE,
                json!({ "customerAccessToken": access_token, "addressId": address_id }),
            )
            .await?;
        let raw: RawCustomerPayload = parse(take_field(data, "customerDefaultAddressUpdate")?)?;
        Ok(CustomerPayload {
            customer_id: raw.customer.map(|c| c.id),
            user_errors: raw.user_errors,
        })
    }

    #[instrument(skip_all)]
    async fn customer_recover(&self, email: &str) -> Result<Vec<UserError>, ShopifyError> {
        let data = self
            .mutate(documents::CUSTOMER_RECOVER, json!({ "email": email }))
            .await?;
        let raw: RawCustomerPayload = parse(take_field(data, "customerRecover")?)?;
        Ok(raw.user_errors)
    }

    #[instrument(skip_all)]
    async fn customer_reset(
        &self,
        customer_id: &str,
        reset_token: &str,
        password: &str,
    ) -> Result<TokenPayload, ShopifyError> {
        let data = self
            .mutate(
                documents::CUSTOMER_RESET,
                json!({
                    "id": customer_id,
                    "input": { "resetToken": reset_token, "password": password },
                }),
            )
            .await?;
        parse(take_field(data, "customerReset")?)
    }

    #[instrument(skip_all, fields(first = first))]
    async fn customer_orders(
        &self,
        access_token: &str,
        first: i64,
        after: Option<String>,
    ) -> Result<OrderPage, ShopifyError> {
        let data = self
            .query(
                documents::GET_ORDERS,
                json!({
                    "customerAccessToken": access_token,
                    "first": first,
                    "after": after,
                }),
                CacheMode::NoStore,
            )
            .await?;
        let Some(raw) = parse_optional::<RawOrdersCustomer>(take_field(data, "customer")?)? else {
            return Ok(OrderPage::default());
        };
        Ok(OrderPage {
            orders: raw.orders.edges.into_iter().map(|e| e.node).collect(),
            page_info: raw.orders.page_info,
        })
    }
}

#[async_trait]
impl MetafieldApi for StorefrontClient {
    #[instrument(skip_all)]
    async fn customer_metafields(
        &self,
        access_token: &str,
        identifiers: Vec<MetafieldIdentifier>,
    ) -> Result<Vec<Metafield>, ShopifyError> {
        let data = self
            .query(
                documents::GET_CUSTOMER_METAFIELDS,
                json!({
                    "customerAccessToken": access_token,
                    "identifiers": identifiers,
                }),
                CacheMode::NoStore,
            )
            .await?;
        let Some(raw) = parse_optional::<RawMetafieldsCustomer>(take_field(data, "customer")?)?
        else {
            return Ok(Vec::new());
        };
        // Missing identifiers come back as nulls in the list
        Ok(raw.metafields.into_iter().flatten().collect())
    }

    #[instrument(skip_all)]
    async fn metafield_set(
        &self,
        access_token: &str,
        input: MetafieldInput,
    ) -> Result<MetafieldPayload, ShopifyError> {
        // metafieldsSet needs the owner ID, which the token alone does not give us
        let data = self
            .query(
                documents::GET_CUSTOMER_ID,
                json!({ "customerAccessToken": access_token }),
                CacheMode::NoStore,
            )
            .await?;
        let Some(owner) = parse_optional::<IdOnly>(take_field(data, "customer")?)? else {
            return Err(ShopifyError::MissingData("customer".to_string()));
        };

        let mut metafield = serde_json::to_value(&input)?;
        if let Some(map) = metafield.as_object_mut() {
            map.insert("ownerId".to_string(), json!(owner.id));
        }

        let data = self
            .mutate(documents::METAFIELDS_SET, json!({ "metafields": [metafield] }))
            .await?;
        let raw: RawMetafieldsSetPayload = parse(take_field(data, "metafieldsSet")?)?;
        Ok(MetafieldPayload {
            metafield: raw.metafields.into_iter().next(),
            user_errors: raw.user_errors,
        })
    }

    #[instrument(skip(self))]
    async fn metafield_delete(&self, id: &str) -> Result<Option<String>, ShopifyError> {
        let data = self
            .mutate(
                documents::METAFIELD_DELETE,
                json!({ "input": { "id": id } }),
            )
            .await?;
        let raw: RawMetafieldDeletePayload = parse(take_field(data, "metafieldDelete")?)?;
        if !raw.user_errors.is_empty() {
            return Err(ShopifyError::UserError(join_user_errors(&raw.user_errors)));
        }
        Ok(raw.deleted_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_i18n_adds_missing_context() {
        let vars = inject_i18n(json!({ "cartId": "abc" }), "US", "EN");
        assert_eq!(vars["cartId"], "abc");
        assert_eq!(vars["country"], "US");
        assert_eq!(vars["language"], "EN");
    }

    #[test]
    fn test_inject_i18n_keeps_explicit_context() {
        let vars = inject_i18n(json!({ "country": "CA" }), "US", "EN");
        assert_eq!(vars["country"], "CA");
        assert_eq!(vars["language"], "EN");
    }

    #[test]
    fn test_inject_i18n_handles_null_variables() {
        let vars = inject_i18n(Value::Null, "US", "EN");
        assert_eq!(vars["country"], "US");
    }

    #[test]
    fn test_cache_mode_ttls() {
        assert!(CacheMode::NoStore.ttl().is_none());
        assert_eq!(CacheMode::Short.ttl(), Some(Duration::from_secs(60)));
        assert_eq!(CacheMode::Long.ttl(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_token_payload_wire_shape() {
        let payload: TokenPayload = serde_json::from_value(json!({
            "customerAccessToken": {
                "accessToken": "token-1",
                "expiresAt": "2026-01-01T00:00:00Z"
            },
            "customerUserErrors": []
        }))
        .unwrap();
        assert_eq!(payload.token.unwrap().access_token, "token-1");
        assert!(payload.user_errors.is_empty());
    }
}
