//! In-memory speech engines for tests and embedding.
//!
//! Each mock shares its log through an `Arc`, so a clone kept by the test
//! observes what the controller did with the boxed instance.

use crate::error::{CloneVoiceError, Result};
use crate::speech::capture::{CaptureStartError, SpeechCapture};
use crate::speech::output::{SpeechOutput, Utterance, UtteranceId, Voice};
use crate::speech::permission::MicrophonePermission;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// What a [`MockCapture`] was asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureLog {
    /// Successful starts.
    pub starts: usize,
    /// Every call to `start`, including refused ones.
    pub start_attempts: usize,
    pub stops: usize,
    pub running: bool,
}

/// Capture engine that records calls and never produces audio.
#[derive(Debug, Clone, Default)]
pub struct MockCapture {
    log: Arc<Mutex<CaptureLog>>,
    fail_with: Arc<Mutex<Option<CaptureStartError>>>,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `start` fail with `error`.
    pub fn fail_starts_with(&self, error: CaptureStartError) {
        *lock(&self.fail_with) = Some(error);
    }

    /// Simulate the engine stopping on its own (silence timeout).
    pub fn end_by_engine(&self) {
        lock(&self.log).running = false;
    }

    pub fn log(&self) -> CaptureLog {
        lock(&self.log).clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.log).running
    }
}

impl SpeechCapture for MockCapture {
    fn start(&mut self) -> std::result::Result<(), CaptureStartError> {
        let mut log = lock(&self.log);
        log.start_attempts += 1;
        if let Some(error) = lock(&self.fail_with).clone() {
            return Err(error);
        }
        if log.running {
            return Err(CaptureStartError::AlreadyRunning);
        }
        log.running = true;
        log.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = lock(&self.log);
        log.stops += 1;
        log.running = false;
    }

    fn name(&self) -> &'static str {
        "mock-capture"
    }
}

/// What a [`MockOutput`] was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputLog {
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
    pub speaking: Option<UtteranceId>,
}

impl OutputLog {
    pub fn texts(&self) -> Vec<&str> {
        self.spoken.iter().map(|u| u.text.as_str()).collect()
    }
}

/// Speech engine that records utterances and finishes them on request.
#[derive(Debug, Clone, Default)]
pub struct MockOutput {
    log: Arc<Mutex<OutputLog>>,
    voices: Vec<Voice>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    /// Finish the utterance being spoken, returning its id.
    pub fn finish_current(&self) -> Option<UtteranceId> {
        lock(&self.log).speaking.take()
    }

    pub fn log(&self) -> OutputLog {
        lock(&self.log).clone()
    }

    pub fn is_speaking(&self) -> bool {
        lock(&self.log).speaking.is_some()
    }
}

impl SpeechOutput for MockOutput {
    fn speak(&mut self, utterance: Utterance) {
        let mut log = lock(&self.log);
        log.speaking = Some(utterance.id);
        log.spoken.push(utterance);
    }

    fn cancel(&mut self) {
        let mut log = lock(&self.log);
        log.cancels += 1;
        log.speaking = None;
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn name(&self) -> &'static str {
        "mock-output"
    }
}

/// Permission prompt with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct MockPermission {
    granted: bool,
}

impl MockPermission {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl MicrophonePermission for MockPermission {
    async fn request(&self) -> Result<()> {
        if self.granted {
            Ok(())
        } else {
            Err(CloneVoiceError::PermissionDenied {
                message: "microphone access refused".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_capture_start_is_idempotent() {
        let mut capture = MockCapture::new();
        assert!(capture.start().is_ok());
        assert_eq!(capture.start(), Err(CaptureStartError::AlreadyRunning));

        let log = capture.log();
        assert_eq!(log.starts, 1);
        assert_eq!(log.start_attempts, 2);
        assert!(log.running);
    }

    #[test]
    fn test_mock_capture_clone_shares_log() {
        let observer = MockCapture::new();
        let mut boxed: Box<dyn SpeechCapture> = Box::new(observer.clone());
        boxed.start().unwrap();
        boxed.stop();
        assert_eq!(observer.log().stops, 1);
        assert!(!observer.is_running());
    }

    #[test]
    fn test_mock_output_tracks_current_utterance() {
        let observer = MockOutput::new();
        let mut output = observer.clone();
        output.speak(Utterance::prepare(3, "xin chào", "vi-VN", &[]));
        assert!(observer.is_speaking());
        assert_eq!(observer.finish_current(), Some(3));
        assert!(!observer.is_speaking());
        assert_eq!(observer.log().texts(), vec!["xin chào"]);
    }

    #[tokio::test]
    async fn test_mock_permission() {
        assert!(MockPermission::granted().request().await.is_ok());
        assert!(matches!(
            MockPermission::denied().request().await,
            Err(CloneVoiceError::PermissionDenied { .. })
        ));
    }
}
