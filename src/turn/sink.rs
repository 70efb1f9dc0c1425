use crate::conversation::Message;
use crate::turn::state::Phase;

/// Pluggable output for a running voice session.
///
/// Receives every message appended to the conversation plus the transient
/// state a user interface shows (interim transcript, phase, notices).
pub trait SessionSink: Send + 'static {
    /// A message was appended to the conversation.
    fn message(&mut self, message: &Message) -> crate::error::Result<()>;

    /// The in-progress transcript changed.
    fn interim(&mut self, _text: &str) {}

    /// A user-visible notice (fatal engine error, permission refusal).
    fn notice(&mut self, _text: &str) {}

    fn phase(&mut self, _phase: Phase) {}

    /// Called when the session ends. Returns accumulated text if applicable.
    fn finish(&mut self) -> Option<String> {
        None
    }

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Collects message contents in memory.
pub struct CollectorSink {
    collected: Vec<String>,
    notices: Vec<String>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self {
            collected: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}

impl Default for CollectorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSink for CollectorSink {
    fn message(&mut self, message: &Message) -> crate::error::Result<()> {
        self.collected.push(message.content().to_string());
        Ok(())
    }

    fn notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }

    fn finish(&mut self) -> Option<String> {
        if self.collected.is_empty() {
            None
        } else {
            Some(self.collected.join("\n"))
        }
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Discards everything.
pub struct NullSink;

impl SessionSink for NullSink {
    fn message(&mut self, _message: &Message) -> crate::error::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
