//! REST seam between the form controller and the agent host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::Scope,
    error::ServerErrorBody,
    protocol::{
        AgentRecord, AgentSummary, CommandInfo, GithubImportRequest, GithubImportResponse,
        Persona, ScanImportRequest, ScanImportResponse,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{error::FormError, submission::SubmitTarget};

pub const SAVE_FAILED_MESSAGE: &str = "Failed to save agent";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw `GET /commands` catalog in server order.
pub type CommandCatalog = Vec<(String, Vec<CommandInfo>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GithubImportReply {
    Imported { message: String },
    Rejected { reason: String },
}

#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn list_personas(&self, scope: Scope) -> Result<Vec<Persona>, FormError>;
    async fn list_agents(&self, scope: Scope) -> Result<Vec<AgentSummary>, FormError>;
    async fn fetch_agent(&self, scope: Scope, name: &str) -> Result<AgentRecord, FormError>;
    async fn list_commands(&self) -> Result<CommandCatalog, FormError>;
    async fn save_agent(
        &self,
        target: &SubmitTarget,
        payload: &AgentRecord,
    ) -> Result<AgentRecord, FormError>;
    async fn scan_and_import(
        &self,
        request: &ScanImportRequest,
    ) -> Result<ScanImportResponse, FormError>;
    async fn import_github(
        &self,
        request: &GithubImportRequest,
    ) -> Result<GithubImportReply, FormError>;
}

#[derive(Debug, Error)]
pub enum BackendSetupError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub server_url: String,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

pub struct HttpAdminBackend {
    http: Client,
    base: Url,
}

impl HttpAdminBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendSetupError> {
        let base = Url::parse(config.server_url.trim()).map_err(|err| {
            BackendSetupError::InvalidUrl {
                url: config.server_url.clone(),
                reason: err.to_string(),
            }
        })?;
        if base.cannot_be_a_base() {
            return Err(BackendSetupError::InvalidUrl {
                url: config.server_url,
                reason: "url cannot carry a path".to_string(),
            });
        }
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<Response, FormError> {
        request
            .send()
            .await
            .map_err(|err| FormError::transport(path, err))
    }

    async fn body_bytes(response: Response, path: &str) -> Result<Vec<u8>, FormError> {
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|err| FormError::transport(path, err))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, FormError> {
        let path = display_path(segments);
        let response = self.send(self.http.get(self.endpoint(segments)), &path).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FormError::Fetch {
                path,
                status: status.as_u16(),
            });
        }
        let body = Self::body_bytes(response, &path).await?;
        serde_json::from_slice(&body).map_err(|err| FormError::parse(path, err))
    }

    /// Generic list fetch used by every catalog.
    pub async fn load_list<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Vec<T>, FormError> {
        self.get_json(segments).await
    }
}

fn display_path(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

fn rejection_reason(status: StatusCode, body: &[u8]) -> Option<String> {
    let reason = ServerErrorBody::from_bytes(body).and_then(|body| body.reason());
    if reason.is_none() {
        debug!(status = status.as_u16(), "server rejection carried no reason");
    }
    reason
}

#[async_trait]
impl AdminBackend for HttpAdminBackend {
    async fn list_personas(&self, scope: Scope) -> Result<Vec<Persona>, FormError> {
        self.load_list(&["personas", scope.as_str()]).await
    }

    async fn list_agents(&self, scope: Scope) -> Result<Vec<AgentSummary>, FormError> {
        self.load_list(&["agents", scope.as_str()]).await
    }

    async fn fetch_agent(&self, scope: Scope, name: &str) -> Result<AgentRecord, FormError> {
        self.get_json(&["agents", scope.as_str(), name]).await
    }

    async fn list_commands(&self) -> Result<CommandCatalog, FormError> {
        let path = display_path(&["commands"]);
        let raw: serde_json::Map<String, serde_json::Value> = self.get_json(&["commands"]).await?;
        raw.into_iter()
            .map(|(name, infos)| {
                serde_json::from_value::<Vec<CommandInfo>>(infos)
                    .map(|infos| (name, infos))
                    .map_err(|err| FormError::parse(path.clone(), err))
            })
            .collect()
    }

    async fn save_agent(
        &self,
        target: &SubmitTarget,
        payload: &AgentRecord,
    ) -> Result<AgentRecord, FormError> {
        let segments = target.segments();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let path = display_path(&segments);
        let agent_json =
            serde_json::to_string(payload).map_err(|err| FormError::parse(path.clone(), err))?;
        let form = multipart::Form::new().text("agent", agent_json);
        let method = match target {
            SubmitTarget::Create { .. } => Method::POST,
            SubmitTarget::Update { .. } => Method::PUT,
        };

        let response = self
            .send(
                self.http
                    .request(method, self.endpoint(&segments))
                    .multipart(form),
                &path,
            )
            .await?;
        let status = response.status();
        let body = Self::body_bytes(response, &path).await?;
        if !status.is_success() {
            warn!(path = %path, status = status.as_u16(), "agent save rejected");
            return Err(FormError::Submission(
                rejection_reason(status, &body).unwrap_or_else(|| SAVE_FAILED_MESSAGE.to_string()),
            ));
        }

        match serde_json::from_slice::<AgentRecord>(&body) {
            Ok(saved) => Ok(saved),
            Err(err) => {
                debug!(path = %path, error = %err, "save response is not an agent record; using sent payload");
                Ok(payload.clone())
            }
        }
    }

    async fn scan_and_import(
        &self,
        request: &ScanImportRequest,
    ) -> Result<ScanImportResponse, FormError> {
        let segments = ["scan-and-import-agents"];
        let path = display_path(&segments);
        let response = self
            .send(self.http.post(self.endpoint(&segments)).json(request), &path)
            .await?;
        let status = response.status();
        let body = Self::body_bytes(response, &path).await?;
        match serde_json::from_slice::<ScanImportResponse>(&body) {
            Ok(mut result) => {
                if !status.is_success() {
                    result.success = false;
                    if result.message.is_none() {
                        result.message = rejection_reason(status, &body);
                    }
                }
                Ok(result)
            }
            Err(_) if !status.is_success() => Err(FormError::Fetch {
                path,
                status: status.as_u16(),
            }),
            Err(err) => Err(FormError::parse(path, err)),
        }
    }

    async fn import_github(
        &self,
        request: &GithubImportRequest,
    ) -> Result<GithubImportReply, FormError> {
        let segments = ["import-github-agent"];
        let path = display_path(&segments);
        let response = self
            .send(self.http.post(self.endpoint(&segments)).json(request), &path)
            .await?;
        let status = response.status();
        let body = Self::body_bytes(response, &path).await?;
        if status.is_success() {
            let reply: GithubImportResponse =
                serde_json::from_slice(&body).map_err(|err| FormError::parse(path, err))?;
            return Ok(GithubImportReply::Imported {
                message: reply.message.unwrap_or_default(),
            });
        }

        match rejection_reason(status, &body) {
            Some(reason) => Ok(GithubImportReply::Rejected { reason }),
            None if ServerErrorBody::from_bytes(&body).is_some() => {
                Ok(GithubImportReply::Rejected {
                    reason: format!("HTTP {}", status.as_u16()),
                })
            }
            None => Err(FormError::Fetch {
                path,
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
