//! REST client for the assistant backend.

use crate::backend::chat::{ChatBackend, ChatRequest};
use crate::backend::protocol::{
    AiProfile, ChatExchange, ConversationHistory, HealthStatus, ProfileUpdated, StatusMessage,
    TextChatRequest, UploadKind, UploadResult, VoiceChatRequest, VoiceChatResponse,
};
use crate::config::BackendConfig;
use crate::error::{CloneVoiceError, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, trace};

/// Talks JSON to the backend over HTTP.
///
/// Every request carries the configured bearer token, if any. Non-2xx
/// statuses, transport failures and undecodable bodies become typed errors.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    user_name: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            user_name: config.user_name.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        trace!(path, status = status.as_u16(), "backend response");
        if !status.is_success() {
            return Err(CloneVoiceError::BackendStatus {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        let text = response.text().await?;
        decode(&text, path)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.get(self.url(path)), path).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.client.post(self.url(path)).json(body), path)
            .await
    }

    pub(crate) async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.client.put(self.url(path)).json(body), path)
            .await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.delete(self.url(path)), path).await
    }

    /// `POST /api/ai/chat`: short reply tuned for speech.
    pub async fn voice_chat(&self, message: &str) -> Result<String> {
        let path = "/api/ai/chat";
        let reply: VoiceChatResponse = self
            .post(
                path,
                &VoiceChatRequest {
                    message: message.to_string(),
                },
            )
            .await?;
        reply
            .text()
            .map(str::to_string)
            .ok_or(CloneVoiceError::EmptyReply)
    }

    /// `POST /api/chat`: stored text exchange.
    pub async fn text_chat(&self, text: &str) -> Result<ChatExchange> {
        self.post(
            "/api/chat",
            &TextChatRequest {
                text: text.to_string(),
                user_name: self.user_name.clone(),
            },
        )
        .await
    }

    pub async fn history(&self, limit: Option<usize>) -> Result<ConversationHistory> {
        match limit {
            Some(limit) => self.get(&format!("/api/history?limit={limit}")).await,
            None => self.get("/api/history").await,
        }
    }

    pub async fn clear_history(&self) -> Result<String> {
        let status: StatusMessage = self.delete("/api/history").await?;
        Ok(status.message)
    }

    pub async fn ai_profile(&self) -> Result<AiProfile> {
        self.get("/api/ai-profile").await
    }

    pub async fn update_ai_profile(&self, profile: &AiProfile) -> Result<AiProfile> {
        let updated: ProfileUpdated = self.put("/api/ai-profile", profile).await?;
        Ok(updated.profile)
    }

    /// Upload a file, optionally asking a question about it.
    pub async fn upload(
        &self,
        kind: UploadKind,
        file: &Path,
        query: Option<&str>,
    ) -> Result<UploadResult> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let ext = file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(file = %file_name, bytes = bytes.len(), path = kind.path(), "uploading");

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(UploadKind::mime_for(&ext))?;
        let form = multipart::Form::new().part("file", part);

        let mut url = reqwest::Url::parse(&self.url(kind.path())).map_err(|e| {
            CloneVoiceError::ConfigInvalidValue {
                key: "backend.url".to_string(),
                message: e.to_string(),
            }
        })?;
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            url.query_pairs_mut().append_pair("query", query);
        }
        self.send(self.client.post(url).multipart(form), kind.path())
            .await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("/health").await
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn reply(&self, request: &ChatRequest) -> Result<String> {
        self.voice_chat(&request.message).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

pub(crate) fn decode<T: DeserializeOwned>(text: &str, path: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| CloneVoiceError::MalformedResponse {
        path: path.to_string(),
        message: e.to_string(),
    })
}
