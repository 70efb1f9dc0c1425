//! Default configuration constants for clonevoice.
//!
//! Shared by the config layer, the turn controller and the CLI so the
//! canned texts and timings live in one place.

/// Default backend base URL.
pub const API_URL: &str = "https://aiclone-backend.onrender.com";

/// Default HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Locale requested from the speech engines.
pub const LOCALE: &str = "vi-VN";

/// Greeting spoken when a voice session is activated.
pub const GREETING: &str = "Xin chào! Tôi là AI-Bot. Hãy nói chuyện với tôi!";

/// Reply used when the backend cannot be reached or answers with an error.
pub const APOLOGY: &str = "Xin lỗi, có lỗi xảy ra. Hãy thử lại!";

/// Reply used when the backend answers without any reply text.
pub const NOT_UNDERSTOOD: &str = "Tôi không hiểu, bạn có thể nói lại không?";

/// Delay between the end of synthesized speech and restarting capture.
///
/// Shorter values let the capture engine pick up the tail of our own voice.
pub const SPEECH_SETTLE_MS: u64 = 800;

/// Delay before relaunching a capture engine that stopped on its own.
pub const CAPTURE_RESTART_MS: u64 = 300;

/// Number of recent messages included in a clone persona prompt.
pub const PERSONA_HISTORY: usize = 6;

/// Name sent as `user_name` on text chat requests.
pub const USER_NAME: &str = "User";

/// Speech rate for a voice that matches the locale.
pub const SPEECH_RATE: f32 = 1.0;

/// Slower speech rate when falling back to a foreign voice.
pub const FOREIGN_VOICE_RATE: f32 = 0.8;

/// Starting value of a clone's mood meter (0-100).
pub const INITIAL_MOOD: u8 = 70;
