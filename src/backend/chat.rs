use crate::conversation::Message;
use crate::error::{CloneVoiceError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One user turn to be answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// The user's transcript.
    pub message: String,
    /// Messages that came before `message`, oldest first.
    pub history: Vec<Message>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
        }
    }
}

/// Produces the assistant's reply to a user turn.
///
/// Errors are typed; the turn loop maps them to canned replies.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, request: &ChatRequest) -> Result<String>;

    /// Name for logging.
    fn name(&self) -> &'static str {
        "backend"
    }
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn reply(&self, request: &ChatRequest) -> Result<String> {
        (**self).reply(request).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Unavailable,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Scripted>,
    requests: Vec<ChatRequest>,
}

/// Backend that answers from a script.
///
/// Replies are consumed in order; once the script runs out every request
/// gets an empty reply.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.lock().script.push_back(Scripted::Reply(text.into()));
        self
    }

    /// Queue a network failure.
    pub fn with_failure(self) -> Self {
        self.lock().script.push_back(Scripted::Unavailable);
        self
    }

    /// Wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn reply(&self, request: &ChatRequest) -> Result<String> {
        let next = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.script.pop_front()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Unavailable) => Err(CloneVoiceError::BackendUnavailable {
                message: "connection refused".to_string(),
            }),
            None => Err(CloneVoiceError::EmptyReply),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
