//! `reqwest`-backed [`DeviceRegistry`].

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use twin::{Device, DeviceId, DeviceRegistry, Labels, ProjectId, PublishPayload, RegistryError};

use crate::auth::AccessToken;
use crate::endpoints::RegistryEndpoints;
use crate::wire::{CreateDeviceRequest, DeviceResource, LabelValue, ListDevicesResponse};

/// Device registry reached over its REST API with a bearer token.
///
/// Only `200 OK` counts as success. Each method issues its request(s) once.
#[derive(Debug, Clone)]
pub struct HttpDeviceRegistry {
    http: reqwest::Client,
    endpoints: RegistryEndpoints,
    token: AccessToken,
}

impl HttpDeviceRegistry {
    pub fn new(http: reqwest::Client, endpoints: RegistryEndpoints, token: AccessToken) -> Self {
        Self {
            http,
            endpoints,
            token,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RegistryError> {
        let response = request
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RegistryError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DeviceRegistry for HttpDeviceRegistry {
    #[instrument(skip_all, fields(project = %project))]
    async fn list_devices(&self, project: &ProjectId) -> Result<Vec<Device>, RegistryError> {
        let url = self.endpoints.list_devices(project);
        let mut devices = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut request = self.http.get(&url);
            if !page_token.is_empty() {
                request = request.query(&[("pageToken", page_token.as_str())]);
            }

            let page: ListDevicesResponse = self.send_json(request).await?;
            let next = page.next_page_token.clone();
            devices.extend(page.into_devices()?);

            if next.is_empty() {
                break;
            }
            if next == page_token {
                return Err(RegistryError::Decode(format!(
                    "device listing repeated page token '{next}'"
                )));
            }
            page_token = next;
        }

        debug!(count = devices.len(), "listed devices");
        Ok(devices)
    }

    #[instrument(skip_all, fields(project = %project, device_type = device_type))]
    async fn create_device(
        &self,
        project: &ProjectId,
        device_type: &str,
        labels: &Labels,
    ) -> Result<Device, RegistryError> {
        let request = self
            .http
            .post(self.endpoints.create_device(project))
            .json(&CreateDeviceRequest {
                device_type,
                labels,
            });

        let created: DeviceResource = self.send_json(request).await?;
        created.into_device()
    }

    #[instrument(skip_all, fields(project = %project, device = %device))]
    async fn delete_device(
        &self,
        project: &ProjectId,
        device: &DeviceId,
    ) -> Result<(), RegistryError> {
        let request = self.http.delete(self.endpoints.delete_device(project, device));
        self.send(request).await.map(drop)
    }

    #[instrument(skip_all, fields(project = %project, device = %device, label = key))]
    async fn patch_label(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        key: &str,
        value: &str,
    ) -> Result<(), RegistryError> {
        let request = self
            .http
            .patch(self.endpoints.label(project, device, key))
            .query(&[("updateMask", "value")])
            .json(&LabelValue { value });
        self.send(request).await.map(drop)
    }

    #[instrument(skip_all, fields(project = %project, device = %device))]
    async fn publish_reading(
        &self,
        project: &ProjectId,
        device: &DeviceId,
        payload: &PublishPayload,
    ) -> Result<(), RegistryError> {
        let request = self
            .http
            .post(self.endpoints.publish(project, device))
            .json(payload);
        self.send(request).await.map(drop)
    }
}
