//! Clone endpoints and the clone-persona chat backend.

use crate::backend::chat::{ChatBackend, ChatRequest};
use crate::backend::http::HttpBackend;
use crate::backend::protocol::StatusMessage;
use crate::clone::persona::{Emotion, Mood, build_prompt, detect_emotion};
use crate::clone::profile::{
    CloneMemory, CloneRecord, CloneStats, CloneSummary, CloneUpdate, MemoryAdded, NewClone,
};
use crate::defaults;
use crate::error::{CloneVoiceError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, warn};
use urlencoding::encode;

impl HttpBackend {
    pub async fn list_clones(&self) -> Result<Vec<CloneSummary>> {
        self.get("/api/clones/").await
    }

    pub async fn clone_by_id(&self, id: &str) -> Result<CloneRecord> {
        self.get(&format!("/api/clones/{}", encode(id))).await
    }

    pub async fn clone_by_name(&self, name: &str) -> Result<CloneRecord> {
        self.get(&format!("/api/clones/name/{}", encode(name)))
            .await
    }

    pub async fn create_clone(&self, clone: &NewClone) -> Result<CloneRecord> {
        self.post("/api/clones/create", clone).await
    }

    pub async fn update_clone(&self, id: &str, update: &CloneUpdate) -> Result<CloneRecord> {
        self.put(&format!("/api/clones/{}", encode(id)), update)
            .await
    }

    pub async fn delete_clone(&self, id: &str) -> Result<String> {
        let status: StatusMessage = self
            .delete(&format!("/api/clones/{}", encode(id)))
            .await?;
        Ok(status.message)
    }

    pub async fn add_memory(&self, id: &str, memory: &CloneMemory) -> Result<MemoryAdded> {
        self.post(&format!("/api/clones/{}/memory", encode(id)), memory)
            .await
    }

    pub async fn clone_stats(&self, id: &str) -> Result<CloneStats> {
        self.get(&format!("/api/clones/{}/stats", encode(id)))
            .await
    }
}

/// Answers as a clone: persona prompt through the text chat endpoint.
///
/// Each exchange is saved as a clone memory. Failing to save a memory does
/// not fail the reply.
pub struct CloneBackend {
    http: HttpBackend,
    clone: CloneRecord,
    history_len: usize,
    mood: Mutex<(Emotion, Mood)>,
}

impl CloneBackend {
    pub fn new(http: HttpBackend, clone: CloneRecord) -> Self {
        Self {
            http,
            clone,
            history_len: defaults::PERSONA_HISTORY,
            mood: Mutex::new((Emotion::Neutral, Mood::default())),
        }
    }

    pub fn with_history_len(mut self, history_len: usize) -> Self {
        self.history_len = history_len;
        self
    }

    pub fn clone_record(&self) -> &CloneRecord {
        &self.clone
    }

    /// Emotion of the last reply and the running mood.
    pub fn mood(&self) -> (Emotion, Mood) {
        *self
            .mood
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_emotion(&self, reply: &str) -> Emotion {
        let emotion = detect_emotion(reply);
        let mut state = self
            .mood
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.0 = emotion;
        state.1.apply(emotion);
        emotion
    }
}

#[async_trait]
impl ChatBackend for CloneBackend {
    async fn reply(&self, request: &ChatRequest) -> Result<String> {
        let prompt = build_prompt(
            &self.clone,
            &request.history,
            &request.message,
            self.history_len,
        );
        let exchange = self.http.text_chat(&prompt).await?;
        let text = exchange.ai_response.trim().to_string();
        if text.is_empty() {
            return Err(CloneVoiceError::EmptyReply);
        }

        let emotion = self.record_emotion(&text);
        debug!(clone = %self.clone.name, emotion = emotion.as_str(), "clone replied");

        if !self.clone.id.is_empty() {
            let memory = CloneMemory {
                user_message: request.message.clone(),
                clone_response: text.clone(),
            };
            if let Err(e) = self.http.add_memory(&self.clone.id, &memory).await {
                warn!(clone = %self.clone.id, error = %e, "failed to save clone memory");
            }
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "clone"
    }
}
