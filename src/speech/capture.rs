use std::fmt;

/// Error codes reported by a speech-to-text engine.
///
/// Codes follow the Web Speech API spelling (`no-speech`, `not-allowed`, ...)
/// since that is what the engines we wrap report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// The engine heard nothing before its silence timeout.
    NoSpeech,
    /// Capture was stopped by us; reported by some engines after `stop()`.
    Aborted,
    /// The recognition service could not be reached.
    Network,
    /// The user or platform refused microphone access.
    NotAllowed,
    /// No usable microphone.
    AudioCapture,
    /// Any code we do not recognize.
    Other(String),
}

impl CaptureErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "audio-capture" => Self::AudioCapture,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::Network => "network",
            Self::NotAllowed => "not-allowed",
            Self::AudioCapture => "audio-capture",
            Self::Other(code) => code,
        }
    }

    /// Fatal errors end the session and are shown to the user once.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotAllowed | Self::AudioCapture)
    }

    /// Text shown to the user for fatal errors.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::NotAllowed => {
                Some("⚠️ Vui lòng cho phép truy cập microphone trong trình duyệt!")
            }
            Self::AudioCapture => Some("⚠️ Không tìm thấy microphone! Vui lòng kiểm tra thiết bị."),
            _ => None,
        }
    }
}

impl fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Why a capture engine refused to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStartError {
    /// The engine is already listening. Starting is idempotent, so this is
    /// not a failure.
    AlreadyRunning,
    /// The engine reported an error while starting.
    Engine(CaptureErrorKind),
}

impl fmt::Display for CaptureStartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "capture already started"),
            Self::Engine(kind) => write!(f, "capture failed to start: {}", kind),
        }
    }
}

impl std::error::Error for CaptureStartError {}

/// A continuous speech-to-text engine.
///
/// Implementations translate engine callbacks into session events
/// (interim/final transcripts, end, error) and hold no turn logic.
pub trait SpeechCapture: Send {
    /// Begin listening.
    fn start(&mut self) -> Result<(), CaptureStartError>;

    /// Stop listening. The engine reports an end event afterwards.
    fn stop(&mut self);

    /// Name for logging.
    fn name(&self) -> &'static str {
        "capture"
    }
}

impl<T: SpeechCapture + ?Sized> SpeechCapture for Box<T> {
    fn start(&mut self) -> Result<(), CaptureStartError> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
