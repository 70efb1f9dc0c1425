use crate::defaults;

/// A voice offered by a speech synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    fn is_google(&self) -> bool {
        self.name.to_lowercase().contains("google")
    }
}

/// Identifies one utterance so late engine events can be matched to it.
pub type UtteranceId = u64;

/// Text to synthesize plus the engine settings chosen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub lang: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    /// Build an utterance, picking the best voice for `locale`.
    pub fn prepare(id: UtteranceId, text: &str, locale: &str, voices: &[Voice]) -> Self {
        let voice = select_voice(voices, locale).cloned();
        let rate = match &voice {
            Some(v) if !v.lang.starts_with(language_prefix(locale)) => defaults::FOREIGN_VOICE_RATE,
            _ => defaults::SPEECH_RATE,
        };
        Self {
            id,
            text: text.to_string(),
            lang: locale.to_string(),
            voice,
            rate,
            pitch: 1.0,
        }
    }
}

/// A text-to-speech engine.
///
/// Implementations report start/end of each utterance as session events,
/// tagged with the utterance id.
pub trait SpeechOutput: Send {
    /// Queue an utterance. Implementations play one utterance at a time.
    fn speak(&mut self, utterance: Utterance);

    /// Stop the current utterance and drop anything queued.
    fn cancel(&mut self);

    /// Voices the engine can use.
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    /// Name for logging.
    fn name(&self) -> &'static str {
        "output"
    }
}

impl<T: SpeechOutput + ?Sized> SpeechOutput for Box<T> {
    fn speak(&mut self, utterance: Utterance) {
        (**self).speak(utterance)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn voices(&self) -> Vec<Voice> {
        (**self).voices()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

fn language_prefix(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

/// Pick the voice to speak `locale` with.
///
/// Preference order: a Google voice for the exact locale, a Google voice
/// for the same language, any voice for the exact locale, any voice for the
/// same language, a Google English voice, then whatever comes first.
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str) -> Option<&'a Voice> {
    let prefix = language_prefix(locale);

    voices
        .iter()
        .find(|v| v.is_google() && v.lang == locale)
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.is_google() && v.lang.starts_with(prefix))
        })
        .or_else(|| voices.iter().find(|v| v.lang == locale))
        .or_else(|| voices.iter().find(|v| v.lang.starts_with(prefix)))
        .or_else(|| voices.iter().find(|v| v.is_google() && v.lang.starts_with("en")))
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Voice> {
        vec![
            Voice::new("Microsoft David", "en-US"),
            Voice::new("Google US English", "en-US"),
            Voice::new("Microsoft An", "vi-VN"),
            Voice::new("Google tiếng Việt", "vi-VN"),
        ]
    }

    #[test]
    fn test_prefers_google_voice_for_locale() {
        let voices = catalog();
        let chosen = select_voice(&voices, "vi-VN").unwrap();
        assert_eq!(chosen.name, "Google tiếng Việt");
    }

    #[test]
    fn test_falls_back_to_any_locale_voice() {
        let voices = vec![
            Voice::new("Google US English", "en-US"),
            Voice::new("Microsoft An", "vi-VN"),
        ];
        assert_eq!(select_voice(&voices, "vi-VN").unwrap().name, "Microsoft An");
    }

    #[test]
    fn test_same_language_other_region() {
        let voices = vec![
            Voice::new("Microsoft David", "en-US"),
            Voice::new("Local Vietnamese", "vi"),
        ];
        assert_eq!(
            select_voice(&voices, "vi-VN").unwrap().name,
            "Local Vietnamese"
        );
    }

    #[test]
    fn test_falls_back_to_google_english_then_first() {
        let voices = vec![
            Voice::new("Microsoft David", "en-US"),
            Voice::new("Google UK English Female", "en-GB"),
        ];
        assert_eq!(
            select_voice(&voices, "vi-VN").unwrap().name,
            "Google UK English Female"
        );

        let voices = vec![Voice::new("Thomas", "fr-FR")];
        assert_eq!(select_voice(&voices, "vi-VN").unwrap().name, "Thomas");

        assert!(select_voice(&[], "vi-VN").is_none());
    }

    #[test]
    fn test_prepare_slows_down_foreign_voice() {
        let voices = vec![Voice::new("Google US English", "en-US")];
        let utterance = Utterance::prepare(7, "Chào bạn!", "vi-VN", &voices);
        assert_eq!(utterance.id, 7);
        assert_eq!(utterance.lang, "vi-VN");
        assert_eq!(utterance.rate, 0.8);

        let utterance = Utterance::prepare(8, "Chào bạn!", "vi-VN", &catalog());
        assert_eq!(utterance.rate, 1.0);
    }

    #[test]
    fn test_prepare_without_voices_uses_engine_default() {
        let utterance = Utterance::prepare(1, "hi", "vi-VN", &[]);
        assert!(utterance.voice.is_none());
        assert_eq!(utterance.rate, 1.0);
        assert_eq!(utterance.pitch, 1.0);
    }
}
