//! clonevoice - voice chat with an AI clone assistant
//!
//! A turn-taking controller (listen → transcribe → ask the backend → speak
//! → listen again) driven by pluggable speech engines, plus a client for the
//! assistant's REST backend and the personal-clone features built on it.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod backend;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clone;
pub mod config;
pub mod conversation;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod output;
pub mod speech;
pub mod turn;

// Engine and backend seams
pub use backend::{ChatBackend, ChatRequest, CloneBackend, HttpBackend, MockBackend};
pub use speech::{MicrophonePermission, SpeechCapture, SpeechOutput};

// Turn loop
pub use turn::{Phase, SessionEvent, SessionSink, TurnController, VoiceSession};

// Conversation
pub use conversation::{ConversationStore, Message, Role};

// Error handling
pub use error::{CloneVoiceError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        // In a git repo build, GIT_HASH is set → expect "0.1.0+<hash>"
        // In CI without git, expect plain "0.1.0"
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
            let hash_part = ver.split('+').nth(1).unwrap_or("");
            assert_eq!(
                hash_part.len(),
                7,
                "Git hash should be 7 chars, got: {}",
                hash_part
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
