use crate::{
    connection_manager::ConnectionManager,
    errors::{ClientError, Result},
};

use morava_core::message::Endpoints;
use morava_core::proto::{auth_service_client::AuthServiceClient, AuthRequest};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::Request;

/// Assume a freshly issued token stays valid for one hour.
const TOKEN_VALIDITY: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Exchanges the configured API key for a bearer token and signs outgoing
/// requests with it. Requests are always stamped with the client id; the
/// authorization header is added only when an API key is configured.
#[derive(Debug)]
pub(crate) struct AuthService {
    cnx_manager: Arc<ConnectionManager>,
    access_endpoints: Endpoints,
    token: Mutex<Option<CachedToken>>,
}

impl AuthService {
    pub(crate) fn new(cnx_manager: Arc<ConnectionManager>, access_endpoints: Endpoints) -> Self {
        AuthService {
            cnx_manager,
            access_endpoints,
            token: Mutex::new(None),
        }
    }

    /// Produce the signed metadata attached to every RPC.
    pub(crate) async fn sign(&self, client_id: &str) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::new();
        let client_id_value =
            MetadataValue::try_from(client_id).map_err(|_| ClientError::InvalidToken)?;
        metadata.insert("client-id", client_id_value);

        if self.cnx_manager.connection_options.api_key.is_some() {
            let token = self.get_valid_token().await?;
            let token_value = MetadataValue::try_from(format!("Bearer {}", token))
                .map_err(|_| ClientError::InvalidToken)?;
            metadata.insert("authorization", token_value);
        }
        Ok(metadata)
    }

    async fn get_valid_token(&self) -> Result<String> {
        let now = Instant::now();
        let mut token_guard = self.token.lock().await;

        if let Some(cached) = &*token_guard {
            if now < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        // Token is expired or not present, renew it
        let token = self.authenticate_client().await?;
        *token_guard = Some(CachedToken {
            token: token.clone(),
            expires_at: now + TOKEN_VALIDITY,
        });
        Ok(token)
    }

    async fn authenticate_client(&self) -> Result<String> {
        let api_key = self
            .cnx_manager
            .connection_options
            .api_key
            .clone()
            .ok_or_else(|| ClientError::Unrecoverable("no API key configured".to_string()))?;

        let channel = self.cnx_manager.get_connection(&self.access_endpoints).await?;
        let mut client = AuthServiceClient::new(channel);

        let request = Request::new(AuthRequest { api_key });
        let response = client.authenticate(request).await?;
        Ok(response.into_inner().token)
    }
}
