//! REST client for the oVirt engine

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use vmbatch_core::{ManagementApi, RemoteError, Template, VmDescriptor, VmId};

use crate::config::ConnectionConfig;
use crate::model::{Action, CreatedVm, Fault, TemplateList, TokenResponse, VmRepr};

/// Authenticated session with one engine
///
/// Safe to share across tasks; the token is only written by `connect` and
/// `close`.
#[derive(Debug)]
pub struct OvirtClient {
    api_url: String,
    engine_url: String,
    client: Client,
    token: RwLock<Option<String>>,
}

impl OvirtClient {
    /// Validate the config, build the HTTP client and obtain an SSO token
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, RemoteError> {
        config.validate()?;

        if config.insecure {
            warn!(url = %config.api_url(), "TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| RemoteError::Connection(format!("failed to create HTTP client: {}", e)))?;

        let engine_url = config.engine_url().to_string();
        let token_url = format!("{}/sso/oauth/token", engine_url);
        debug!(url = %token_url, user = %config.username, "Requesting SSO token");

        let response = client
            .post(&token_url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "password"),
                ("scope", "ovirt-app-api"),
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::Connection(format!("{}: {}", token_url, e)))?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| {
                RemoteError::Connection(format!("unreadable SSO response ({}): {}", status, e))
            })?;

        let token = match body.access_token {
            Some(token) if status.is_success() => token,
            _ => {
                let reason = body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| format!("status {}", status));
                return Err(RemoteError::Connection(format!(
                    "authentication failed for {}: {}",
                    config.username, reason
                )));
            }
        };

        info!(url = %config.api_url(), user = %config.username, "Connected to engine");

        Ok(Self {
            api_url: config.api_url().to_string(),
            engine_url,
            client,
            token: RwLock::new(Some(token)),
        })
    }

    /// Whether `close` has already released the session
    pub async fn is_closed(&self) -> bool {
        self.token.read().await.is_none()
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, RemoteError> {
        let token = self.token.read().await;
        let token = token.as_deref().ok_or(RemoteError::Closed)?;

        Ok(request
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .header("Version", "4"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<Fault>(&text)
            .ok()
            .and_then(|fault| fault.message())
            .unwrap_or_else(|| {
                if text.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    text
                }
            });

        Err(RemoteError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ManagementApi for OvirtClient {
    async fn list_templates_by_name(&self, name: &str) -> Result<Vec<Template>, RemoteError> {
        let url = format!("{}/templates", self.api_url);
        let search = format!("name={}", name);
        debug!(template = %name, "Listing templates");

        let request = self
            .client
            .get(&url)
            .query(&[("search", search.as_str()), ("follow", "disk_attachments.disk,nics")]);
        let list: TemplateList = Self::read_json(self.send(request).await?).await?;

        // The search language matches patterns, keep exact names only.
        Ok(list
            .template
            .into_iter()
            .filter(|template| template.name == name)
            .map(Template::from)
            .collect())
    }

    async fn create_vm(&self, descriptor: &VmDescriptor) -> Result<VmId, RemoteError> {
        let url = format!("{}/vms", self.api_url);
        debug!(vm = %descriptor.name, template = %descriptor.template, "Creating VM");

        let request = self.client.post(&url).json(&VmRepr::from(descriptor));
        let created: CreatedVm = Self::read_json(self.send(request).await?).await?;

        Ok(VmId(created.id))
    }

    async fn start_vm(&self, vm_id: &VmId) -> Result<(), RemoteError> {
        let url = format!("{}/vms/{}/start", self.api_url, vm_id);
        debug!(vm_id = %vm_id, "Starting VM");

        let request = self.client.post(&url).json(&Action::default());
        self.send(request).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), RemoteError> {
        let Some(token) = self.token.write().await.take() else {
            debug!("Session already closed");
            return Ok(());
        };

        let url = format!("{}/services/sso-logout", self.engine_url);
        let response = self
            .client
            .get(&url)
            .query(&[("token", token.as_str())])
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Engine refused session logout");
            return Err(RemoteError::Rejected {
                status: response.status().as_u16(),
                reason: "logout failed".to_string(),
            });
        }

        info!("Closed engine session");
        Ok(())
    }
}
