//! Customer synchronization engine.
//!
//! Owns the customer session: the access token in the identity store and
//! the published customer record move together. Whenever the token stops
//! resolving to a customer, both are cleared in the same step so the
//! session can never look half signed-in.

use std::sync::Arc;

use tracing::{error, instrument, warn};

use crate::feedback::Notifier;
use crate::session::{CUSTOMER_TOKEN_KEY, IdentityStore};
use crate::shopify::types::{
    AddressInput, Customer, CustomerCreateInput, CustomerUpdateInput, OrderPage, UserError,
    join_user_errors,
};
use crate::shopify::{CommerceApi, ShopifyError};
use crate::store::Store;

/// Synchronizes the customer session with the commerce service.
#[derive(Clone)]
pub struct CustomerEngine {
    api: Arc<dyn CommerceApi>,
    identity: Arc<dyn IdentityStore>,
    customer: Store<Option<Customer>>,
    notifier: Notifier,
}

impl CustomerEngine {
    pub(crate) fn new(
        api: Arc<dyn CommerceApi>,
        identity: Arc<dyn IdentityStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            api,
            identity,
            customer: Store::new(None),
            notifier,
        }
    }

    /// The published customer. `None` while logged out or not yet loaded.
    #[must_use]
    pub fn customer(&self) -> &Store<Option<Customer>> {
        &self.customer
    }

    /// Token presence only. The customer record may still be loading.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.identity.get(CUSTOMER_TOKEN_KEY).is_some()
    }

    fn clear_session(&self) {
        self.identity.remove(CUSTOMER_TOKEN_KEY);
        self.customer.set(None);
    }

    /// Fetch and publish the customer for the stored token.
    ///
    /// An invalid token and a transport failure both end the session:
    /// token and published customer are cleared together.
    #[instrument(skip(self))]
    pub async fn get_customer(&self) -> Option<Customer> {
        let token = self.identity.get(CUSTOMER_TOKEN_KEY)?;

        match self.api.customer(&token).await {
            Ok(Some(customer)) => {
                self.customer.set(Some(customer.clone()));
                Some(customer)
            }
            Ok(None) => {
                warn!("stored access token no longer resolves to a customer");
                self.clear_session();
                None
            }
            Err(e) => {
                error!(error = %e, "failed to fetch customer");
                self.clear_session();
                None
            }
        }
    }

    /// Exchange credentials for an access token and load the customer.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer, ShopifyError> {
        let payload = self.api.access_token_create(email, password).await?;

        let Some(token) = payload.token else {
            let message = rejection_message(&payload.user_errors, "Invalid email or password");
            warn!(%message, "login rejected");
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        };

        self.identity
            .set(CUSTOMER_TOKEN_KEY, &token.access_token);

        match self.get_customer().await {
            Some(customer) => {
                self.notifier.success("Signed in");
                Ok(customer)
            }
            // get_customer already cleared the session
            None => Err(ShopifyError::MissingData("customer".to_string())),
        }
    }

    /// End the session. The remote token revocation is best effort; the
    /// local session is cleared regardless.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(token) = self.identity.get(CUSTOMER_TOKEN_KEY)
            && let Err(e) = self.api.access_token_delete(&token).await
        {
            warn!(error = %e, "failed to revoke access token remotely");
        }
        self.clear_session();
        self.notifier.info("Signed out");
    }

    /// Create an account, then sign straight into it.
    #[instrument(skip_all)]
    pub async fn register(&self, input: CustomerCreateInput) -> Result<Customer, ShopifyError> {
        let email = input.email.clone();
        let password = input.password.clone();

        let payload = self.api.customer_create(input).await?;

        if payload.customer_id.is_none() {
            let message = rejection_message(&payload.user_errors, "Could not create account");
            warn!(%message, "registration rejected");
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        }

        self.login(&email, &password).await
    }

    /// Update account fields, then refetch the full record.
    #[instrument(skip_all)]
    pub async fn update_customer(
        &self,
        input: CustomerUpdateInput,
    ) -> Result<Customer, ShopifyError> {
        let token = self.require_token()?;
        let payload = self.api.customer_update(&token, input).await?;

        if !payload.user_errors.is_empty() {
            let message = join_user_errors(&payload.user_errors);
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        }

        let customer = self
            .get_customer()
            .await
            .ok_or_else(|| ShopifyError::MissingData("customer".to_string()))?;
        self.notifier.success("Account updated");
        Ok(customer)
    }

    /// Add an address, then refetch the customer so the published record
    /// includes it.
    #[instrument(skip_all)]
    pub async fn create_address(&self, address: AddressInput) -> Result<String, ShopifyError> {
        let token = self.require_token()?;
        let payload = self.api.address_create(&token, address).await?;

        let Some(address_id) = payload.address_id else {
            let message = rejection_message(&payload.user_errors, "Could not save address");
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        };

        self.get_customer().await;
        self.notifier.success("Address added");
        Ok(address_id)
    }

    #[instrument(skip_all, fields(address_id = %address_id))]
    pub async fn update_address(
        &self,
        address_id: &str,
        address: AddressInput,
    ) -> Result<(), ShopifyError> {
        let token = self.require_token()?;
        let payload = self.api.address_update(&token, address_id, address).await?;

        if payload.address_id.is_none() {
            let message = rejection_message(&payload.user_errors, "Could not save address");
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        }

        self.get_customer().await;
        self.notifier.success("Address updated");
        Ok(())
    }

    #[instrument(skip_all, fields(address_id = %address_id))]
    pub async fn delete_address(&self, address_id: &str) -> Result<(), ShopifyError> {
        let token = self.require_token()?;
        let payload = self.api.address_delete(&token, address_id).await?;

        if !payload.user_errors.is_empty() {
            let message = join_user_errors(&payload.user_errors);
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        }

        self.get_customer().await;
        self.notifier.success("Address removed");
        Ok(())
    }

    /// Mark an address as default. The flag lives on the customer record,
    /// so the published customer is refetched rather than patched.
    #[instrument(skip_all, fields(address_id = %address_id))]
    pub async fn set_default_address(&self, address_id: &str) -> Result<(), ShopifyError> {
        let token = self.require_token()?;
        let payload = self.api.default_address_update(&token, address_id).await?;

        if !payload.user_errors.is_empty() {
            let message = join_user_errors(&payload.user_errors);
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        }

        self.get_customer().await;
        self.notifier.success("Default address updated");
        Ok(())
    }

    /// Ask the service to send a password recovery email. Unknown addresses
    /// succeed silently so the endpoint does not leak account existence.
    #[instrument(skip_all)]
    pub async fn recover_password(&self, email: &str) -> Result<(), ShopifyError> {
        let user_errors = self.api.customer_recover(email).await?;

        if !user_errors.is_empty() {
            let message = join_user_errors(&user_errors);
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        }

        self.notifier.info("Recovery email sent");
        Ok(())
    }

    /// Complete a password reset. A successful reset yields a fresh token,
    /// which becomes the active session.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        customer_id: &str,
        reset_token: &str,
        password: &str,
    ) -> Result<Customer, ShopifyError> {
        let payload = self
            .api
            .customer_reset(customer_id, reset_token, password)
            .await?;

        let Some(token) = payload.token else {
            let message = rejection_message(&payload.user_errors, "Could not reset password");
            self.notifier.error(message.clone());
            return Err(ShopifyError::UserError(message));
        };

        self.identity
            .set(CUSTOMER_TOKEN_KEY, &token.access_token);

        match self.get_customer().await {
            Some(customer) => {
                self.notifier.success("Password updated");
                Ok(customer)
            }
            None => Err(ShopifyError::MissingData("customer".to_string())),
        }
    }

    /// One page of order history, newest first.
    #[instrument(skip(self))]
    pub async fn get_orders(
        &self,
        first: i64,
        after: Option<String>,
    ) -> Result<OrderPage, ShopifyError> {
        let token = self.require_token()?;
        self.api.customer_orders(&token, first, after).await
    }

    fn require_token(&self) -> Result<String, ShopifyError> {
        self.identity
            .get(CUSTOMER_TOKEN_KEY)
            .ok_or(ShopifyError::NotAuthenticated)
    }
}

fn rejection_message(errors: &[UserError], fallback: &str) -> String {
    if errors.is_empty() {
        fallback.to_string()
    } else {
        join_user_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_prefers_user_errors() {
        let errors = vec![UserError {
            field: None,
            message: "Email has already been taken".to_string(),
        }];
        assert_eq!(
            rejection_message(&errors, "Could not create account"),
            "Email has already been taken"
        );
        assert_eq!(
            rejection_message(&[], "Could not create account"),
            "Could not create account"
        );
    }
}
