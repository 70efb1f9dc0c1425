//! JSON bodies exchanged with the assistant backend.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/ai/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChatRequest {
    pub message: String,
}

/// Reply from `POST /api/ai/chat`.
///
/// Deployments disagree on the field carrying the text, so all three known
/// spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl VoiceChatResponse {
    /// First non-blank of `response`, `ai_response`, `message`.
    pub fn text(&self) -> Option<&str> {
        [&self.response, &self.ai_response, &self.message]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.trim().is_empty())
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChatRequest {
    pub text: String,
    pub user_name: String,
}

/// One stored exchange, as returned by `POST /api/chat` and `GET /api/history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    #[serde(default)]
    pub messages: Vec<ChatExchange>,
}

/// The assistant's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiProfile {
    pub name: String,
    pub avatar: String,
    pub status: String,
    pub description: String,
    pub personality: String,
    pub color: String,
}

impl Default for AiProfile {
    fn default() -> Self {
        Self {
            name: "AIClone".to_string(),
            avatar: "🤖".to_string(),
            status: "Online".to_string(),
            description: "AI version of you".to_string(),
            personality: "Friendly, witty, casual".to_string(),
            color: "#0066FF".to_string(),
        }
    }
}

/// Reply from `PUT /api/ai-profile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdated {
    #[serde(default)]
    pub message: String,
    pub profile: AiProfile,
}

/// Generic `{message}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusMessage {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Which upload endpoint to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    pub fn path(&self) -> &'static str {
        match self {
            UploadKind::Image => "/api/upload/image",
            UploadKind::Document => "/api/upload/document",
        }
    }

    /// Guess from the file extension. Unknown extensions are documents.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => UploadKind::Image,
            _ => UploadKind::Document,
        }
    }

    /// MIME type the backend accepts for `ext`.
    pub fn mime_for(ext: &str) -> &'static str {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "pdf" => "application/pdf",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            _ => "text/plain",
        }
    }
}

/// Reply from the upload endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploadResult {
    pub status: Option<String>,
    pub file_path: Option<String>,
    pub url: Option<String>,
    pub ai_response: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_reply_field_precedence() {
        let reply: VoiceChatResponse =
            serde_json::from_str(r#"{"response":"Chào bạn!","message":"x"}"#).unwrap();
        assert_eq!(reply.text(), Some("Chào bạn!"));

        let reply: VoiceChatResponse =
            serde_json::from_str(r#"{"response":"","ai_response":"từ ai_response"}"#).unwrap();
        assert_eq!(reply.text(), Some("từ ai_response"));

        let reply: VoiceChatResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert_eq!(reply.text(), Some("ok"));
    }

    #[test]
    fn test_voice_reply_without_text() {
        let reply: VoiceChatResponse =
            serde_json::from_str(r#"{"timestamp":"2024-01-01T00:00:00"}"#).unwrap();
        assert_eq!(reply.text(), None);

        let reply: VoiceChatResponse = serde_json::from_str(r#"{"response":"   "}"#).unwrap();
        assert_eq!(reply.text(), None);
    }

    #[test]
    fn test_history_parses_optional_file_fields() {
        let json = r#"{"messages":[
            {"user_message":"hi","ai_response":"hello","timestamp":"t1"},
            {"user_message":"ảnh","ai_response":"đẹp","timestamp":"t2","file_type":"image","file_path":"uploads/a.png"}
        ]}"#;
        let history: ConversationHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages[0].file_type, None);
        assert_eq!(history.messages[1].file_type.as_deref(), Some("image"));
    }

    #[test]
    fn test_profile_fills_missing_fields() {
        let profile: AiProfile = serde_json::from_str(r#"{"name":"Bot","type":"main"}"#).unwrap();
        assert_eq!(profile.name, "Bot");
        assert_eq!(profile.color, "#0066FF");
    }

    #[test]
    fn test_upload_kind_from_extension() {
        assert_eq!(UploadKind::from_extension("PNG"), UploadKind::Image);
        assert_eq!(UploadKind::from_extension("pdf"), UploadKind::Document);
        assert_eq!(UploadKind::Image.path(), "/api/upload/image");
        assert_eq!(UploadKind::mime_for("jpeg"), "image/jpeg");
        assert_eq!(UploadKind::mime_for("txt"), "text/plain");
    }

    #[test]
    fn test_health_status() {
        let health: HealthStatus =
            serde_json::from_str(r#"{"status":"ok","message":"AIClone API is running"}"#).unwrap();
        assert!(health.is_ok());
    }
}
