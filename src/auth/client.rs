//! Auth sub-client — token issuance, restore, status, logout.

use chrono::{DateTime, Utc};

use crate::auth::{parse_expires_dt, AuthState, TokenResponse};
use crate::client::StockflowClient;
use crate::error::{AuthError, SdkError};

/// Sub-client for authentication operations.
pub struct Auth<'a> {
    pub(crate) client: &'a StockflowClient,
}

impl<'a> Auth<'a> {
    /// Resume a stored session at startup.
    pub async fn restore(&self) -> AuthState {
        self.restore_at(Utc::now()).await
    }

    pub async fn restore_at(&self, now: DateTime<Utc>) -> AuthState {
        let state = self.client.http.vault().restore(now);
        tracing::debug!(connected = state.is_connected(), "Restored auth state");
        *self.client.auth_state.write().await = state.clone();
        state
    }

    /// Request a trading-API token and persist it.
    ///
    /// A refusal from the token service is not an `Err`: it is returned as
    /// [`AuthState::Error`] carrying the service's message. Transport
    /// failures are returned as errors and also recorded in the state.
    pub async fn connect(&self) -> Result<AuthState, SdkError> {
        *self.client.auth_state.write().await = AuthState::Connecting;

        let resp: TokenResponse = match self.client.http.issue_token().await {
            Ok(resp) => resp,
            Err(SdkError::Backend(message)) => return Ok(self.fail(message).await),
            Err(e) => {
                self.fail(e.to_string()).await;
                return Err(e);
            }
        };

        let token = match (resp.success, resp.token) {
            (true, Some(token)) if !token.is_empty() => token,
            (true, _) => return Ok(self.fail("Token response had no token".to_string()).await),
            (false, _) => return Ok(self.fail(resp.message).await),
        };

        let expires_at = parse_expires_dt(resp.expires_dt.as_deref(), Utc::now());
        if let Err(e) = self.client.http.vault().save(&token, expires_at) {
            self.fail(e.to_string()).await;
            return Err(e.into());
        }

        tracing::info!(expires_at = %expires_at, "Token issued");
        let state = AuthState::Connected { expires_at };
        *self.client.auth_state.write().await = state.clone();
        Ok(state)
    }

    /// Ask the token service whether the current token is valid.
    pub async fn status(&self) -> Result<TokenResponse, SdkError> {
        if self.client.http.vault().bearer(Utc::now()).is_none() {
            return Err(AuthError::NotAuthenticated.into());
        }
        self.client.http.token_status().await
    }

    /// Forget the stored token.
    pub async fn logout(&self) -> Result<(), SdkError> {
        self.client.http.vault().clear()?;
        *self.client.auth_state.write().await = AuthState::Idle;
        tracing::info!("Logged out");
        Ok(())
    }

    pub async fn state(&self) -> AuthState {
        self.client.auth_state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await.is_connected()
    }

    /// Stored expiry, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.client.http.vault().expires_at()
    }

    async fn fail(&self, message: String) -> AuthState {
        tracing::warn!(message = %message, "Token request failed");
        let state = AuthState::Error(message);
        *self.client.auth_state.write().await = state.clone();
        state
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::{MemoryTokenStore, TokenStore, TOKEN_EXPIRY_KEY, TOKEN_KEY};
    use crate::auth::AuthState;
    use crate::client::StockflowClient;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn client_with(store: Arc<MemoryTokenStore>) -> StockflowClient {
        StockflowClient::builder().token_store(store).build().unwrap()
    }

    #[tokio::test]
    async fn test_restore_updates_state() {
        let store = Arc::new(MemoryTokenStore::new());
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        store.set(TOKEN_KEY, "abc").unwrap();
        store
            .set(TOKEN_EXPIRY_KEY, &(now + Duration::hours(1)).to_rfc3339())
            .unwrap();

        let client = client_with(store);
        let state = client.auth().restore_at(now).await;
        assert!(state.is_connected());
        assert_eq!(client.auth().state().await, state);
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(TOKEN_KEY, "abc").unwrap();
        let client = client_with(store.clone());

        client.auth().logout().await.unwrap();
        assert_eq!(store.get(TOKEN_KEY), None);
        assert_eq!(client.auth().state().await, AuthState::Idle);
    }

    #[tokio::test]
    async fn test_status_without_token_is_not_authenticated() {
        let client = client_with(Arc::new(MemoryTokenStore::new()));
        let err = client.auth().status().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::SdkError::Auth(crate::error::AuthError::NotAuthenticated)
        ));
    }
}
