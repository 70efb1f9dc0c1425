//! Speech engine seams: capture (speech-to-text), output (text-to-speech)
//! and microphone permission.

pub mod capture;
pub mod mock;
pub mod output;
pub mod permission;
pub mod terminal;

pub use capture::{CaptureErrorKind, CaptureStartError, SpeechCapture};
pub use output::{SpeechOutput, Utterance, UtteranceId, Voice, select_voice};
pub use permission::{AlwaysGranted, MicrophonePermission};
pub use terminal::{ConsoleSpeech, LineCapture};
