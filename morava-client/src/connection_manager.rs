use crate::errors::{ClientError, Result};

use morava_core::message::Endpoints;
use std::collections::{hash_map::Entry, HashMap};
use tokio::sync::Mutex;
use tonic::transport::{Channel, ClientTlsConfig};
use tracing::info;

#[derive(Debug, Clone)]
enum ConnectionStatus {
    Connected(Channel),
    Disconnected,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ConnectionOptions {
    pub(crate) tls_config: Option<ClientTlsConfig>,
    pub(crate) api_key: Option<String>,
    pub(crate) use_tls: bool,
}

/// Caches one gRPC channel per broker endpoints, connecting lazily.
#[derive(Debug)]
pub(crate) struct ConnectionManager {
    connections: Mutex<HashMap<Endpoints, ConnectionStatus>>,
    pub(crate) connection_options: ConnectionOptions,
}

impl ConnectionManager {
    pub(crate) fn new(connection_options: ConnectionOptions) -> Self {
        ConnectionManager {
            connections: Mutex::new(HashMap::new()),
            connection_options,
        }
    }

    pub(crate) async fn get_connection(&self, endpoints: &Endpoints) -> Result<Channel> {
        let mut cnx = self.connections.lock().await;

        match cnx.entry(endpoints.clone()) {
            Entry::Occupied(mut occupied_entry) => match occupied_entry.get() {
                ConnectionStatus::Connected(channel) => Ok(channel.clone()),
                ConnectionStatus::Disconnected => {
                    let channel = new_rpc_connection(&self.connection_options, endpoints).await?;
                    *occupied_entry.get_mut() = ConnectionStatus::Connected(channel.clone());
                    Ok(channel)
                }
            },
            Entry::Vacant(vacant_entry) => {
                let channel = new_rpc_connection(&self.connection_options, endpoints).await?;
                vacant_entry.insert(ConnectionStatus::Connected(channel.clone()));
                Ok(channel)
            }
        }
    }

    /// Forget a channel so the next call re-establishes it.
    pub(crate) async fn mark_disconnected(&self, endpoints: &Endpoints) {
        let mut cnx = self.connections.lock().await;
        if let Some(status) = cnx.get_mut(endpoints) {
            *status = ConnectionStatus::Disconnected;
        }
    }
}

async fn new_rpc_connection(
    cnx_options: &ConnectionOptions,
    endpoints: &Endpoints,
) -> Result<Channel> {
    info!("Establishing new RPC connection to {}", endpoints);

    let mut last_error: Option<ClientError> = None;
    for target in endpoints.grpc_targets() {
        match connect_target(cnx_options, &target).await {
            Ok(channel) => return Ok(channel),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error
        .unwrap_or_else(|| ClientError::Unrecoverable(format!("no address in {}", endpoints))))
}

async fn connect_target(cnx_options: &ConnectionOptions, target: &str) -> Result<Channel> {
    let channel = match cnx_options.use_tls {
        false => {
            Channel::from_shared(target.to_string())?
                .connect()
                .await?
        }
        true => {
            let tls_config = cnx_options.tls_config.as_ref().ok_or_else(|| {
                ClientError::Unrecoverable(
                    "TLS is enabled but no TLS config provided. Use with_tls() before enabling TLS"
                        .to_string(),
                )
            })?;

            Channel::from_shared(target.to_string())?
                .tls_config(tls_config.clone())?
                .connect()
                .await?
        }
    };

    Ok(channel)
}
