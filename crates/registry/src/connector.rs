//! Per-invocation registry connection.

use async_trait::async_trait;
use twin::RegistryConnector;

use crate::auth::{AuthError, ServiceAccount};
use crate::client::HttpDeviceRegistry;
use crate::endpoints::RegistryEndpoints;

/// Authenticates the service account and hands out an [`HttpDeviceRegistry`]
/// bound to the resulting token.
#[derive(Debug, Clone)]
pub struct ServiceAccountConnector {
    http: reqwest::Client,
    account: ServiceAccount,
    endpoints: RegistryEndpoints,
}

impl ServiceAccountConnector {
    pub fn new(http: reqwest::Client, account: ServiceAccount, endpoints: RegistryEndpoints) -> Self {
        Self {
            http,
            account,
            endpoints,
        }
    }
}

#[async_trait]
impl RegistryConnector for ServiceAccountConnector {
    type Registry = HttpDeviceRegistry;
    type Error = AuthError;

    async fn connect(&self) -> Result<Self::Registry, Self::Error> {
        let token = self.account.authenticate(&self.http).await?;
        Ok(HttpDeviceRegistry::new(
            self.http.clone(),
            self.endpoints.clone(),
            token,
        ))
    }
}
