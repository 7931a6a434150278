use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::refresh;
use super::storage::{self, TokenStore};
use super::types::{CredentialSnapshot, Credentials, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::transport::Transport;

/// Authentication manager
/// Owns the credential pair, mirrors it to durable storage and serializes
/// refreshes so concurrent 401s cost a single network refresh
pub struct AuthManager {
    /// Current credential pair
    credentials: RwLock<Credentials>,

    /// Held for the whole duration of a refresh
    refresh_gate: Mutex<()>,

    /// Durable token slots
    store: Arc<dyn TokenStore>,

    /// Transport for refresh requests
    transport: Arc<dyn Transport>,

    /// Full URL of the refresh endpoint
    refresh_url: String,
}

impl AuthManager {
    /// Create a manager, hydrating the credential pair from `store`
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        base_url: &str,
    ) -> Result<Self> {
        let (access_token, refresh_token) = storage::load_tokens(store.as_ref())?;

        tracing::debug!(
            has_access_token = access_token.is_some(),
            has_refresh_token = refresh_token.is_some(),
            "Loaded stored credentials"
        );

        Ok(Self {
            credentials: RwLock::new(Credentials {
                access_token,
                refresh_token,
                generation: 0,
            }),
            refresh_gate: Mutex::new(()),
            store,
            transport,
            refresh_url: refresh::refresh_url(base_url),
        })
    }

    /// Access token and generation, read together
    pub async fn snapshot(&self) -> CredentialSnapshot {
        let creds = self.credentials.read().await;
        CredentialSnapshot {
            access_token: creds.access_token.clone(),
            generation: creds.generation,
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.credentials.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.credentials.read().await.refresh_token.clone()
    }

    pub async fn has_refresh_token(&self) -> bool {
        self.credentials.read().await.refresh_token.is_some()
    }

    /// Presence check only; expiry is discovered when a request fails
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.access_token.is_some()
    }

    /// Overwrite both tokens in memory and storage
    /// Storage is written before the credential lock is taken, so readers never
    /// wait on disk; concurrent writers resolve last-write-wins.
    pub async fn set_tokens(&self, access_token: String, refresh_token: String) {
        self.persist(ACCESS_TOKEN_KEY, Some(access_token.as_str()));
        self.persist(REFRESH_TOKEN_KEY, Some(refresh_token.as_str()));

        let mut creds = self.credentials.write().await;
        creds.access_token = Some(access_token);
        creds.refresh_token = Some(refresh_token);
        creds.generation += 1;
    }

    /// Drop both tokens from memory and storage
    pub async fn clear_tokens(&self) {
        self.forget_stored();
        let mut creds = self.credentials.write().await;
        Self::clear_in_memory(&mut creds);
    }

    /// Refresh the access token
    /// Returns false (with both tokens cleared) when the refresh fails, or
    /// false without any network call when no refresh token is held
    pub async fn refresh(&self) -> bool {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request sent with credentials of `generation`
    /// If the pair changed while waiting for the gate, another caller already
    /// refreshed (or cleared) it and that outcome is reused.
    pub async fn refresh_after(&self, generation: u64) -> bool {
        let _gate = self.refresh_gate.lock().await;

        {
            let creds = self.credentials.read().await;
            if creds.generation != generation {
                tracing::debug!(
                    seen = generation,
                    current = creds.generation,
                    "Credentials changed while waiting, reusing refresh outcome"
                );
                return creds.access_token.is_some();
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> bool {
        let Some(refresh_token) = self.refresh_token().await else {
            tracing::debug!("No refresh token available, skipping refresh");
            return false;
        };

        match refresh::request_access_token(
            self.transport.as_ref(),
            &self.refresh_url,
            &refresh_token,
        )
        .await
        {
            Ok(access_token) => {
                self.persist(ACCESS_TOKEN_KEY, Some(access_token.as_str()));
                let mut creds = self.credentials.write().await;
                creds.access_token = Some(access_token);
                creds.generation += 1;
                true
            }
            Err(e) => {
                tracing::warn!("Token refresh failed, clearing credentials: {:#}", e);
                self.forget_stored();
                let mut creds = self.credentials.write().await;
                Self::clear_in_memory(&mut creds);
                false
            }
        }
    }

    fn forget_stored(&self) {
        self.persist(ACCESS_TOKEN_KEY, None);
        self.persist(REFRESH_TOKEN_KEY, None);
    }

    fn clear_in_memory(creds: &mut Credentials) {
        if creds.access_token.is_some() || creds.refresh_token.is_some() {
            creds.generation += 1;
        }
        creds.access_token = None;
        creds.refresh_token = None;
    }

    /// Write-through to durable storage; a failing store never blocks the
    /// in-memory transition
    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!(key = key, "Failed to persist token: {:#}", e);
        }
    }
}
