//! Prompting the backend to answer as a clone, and tracking its mood.

use crate::clone::profile::CloneRecord;
use crate::conversation::{Message, Role};
use crate::defaults;

const USER_LABEL: &str = "Người dùng";

/// Build the prompt that makes the backend answer as `clone`.
///
/// `history` is the conversation before `user_message`; only its last
/// `history_len` messages are included.
pub fn build_prompt(
    clone: &CloneRecord,
    history: &[Message],
    user_message: &str,
    history_len: usize,
) -> String {
    let personality = clone
        .personality
        .iter()
        .map(|p| format!("{}: {}", p.category, p.response))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Bạn là {name}, một nhân bản AI của người dùng.\n\
         Đây là tính cách và cách nói của bạn:\n\
         {personality}\n\n\
         Phong cách nói chuyện mẫu:\n\
         {style}\n\n\
         QUAN TRỌNG: Hãy trả lời ĐÚNG như cách người dùng sẽ trả lời. \
         Sử dụng các câu cửa miệng, giọng điệu và tính cách đã được training.\n\
         Không nói \"Tôi là AI\" hay \"Tôi không thể\". \
         Hãy trả lời như một con người thực sự với tính cách đã cho.\n\n\
         Lịch sử trò chuyện:\n",
        name = clone.name,
        style = clone.speaking_style,
    );

    let start = history.len().saturating_sub(history_len);
    for message in &history[start..] {
        let speaker = match message.role() {
            Role::User => USER_LABEL,
            Role::Assistant => clone.name.as_str(),
        };
        prompt.push_str(&format!("{}: {}\n", speaker, message.content()));
    }

    prompt.push_str(&format!(
        "\n{USER_LABEL}: {user_message}\n{name}:",
        name = clone.name
    ));
    prompt
}

/// Expression shown on the clone's avatar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Emotion {
    Happy,
    Sad,
    Thinking,
    Surprised,
    #[default]
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Thinking => "thinking",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
        }
    }
}

const HAPPY: &[&str] = &["vui", "haha", "😊", "😄", "tuyệt", "hay", "thích"];
const SAD: &[&str] = &["buồn", "😢", "😭", "chán", "mệt"];
const THINKING: &[&str] = &["gì", "sao", "như thế nào", "?"];
const SURPRISED: &[&str] = &["wow", "ồ", "😮", "thật sao"];

/// Guess the emotion of a reply from keywords. First matching group wins.
pub fn detect_emotion(text: &str) -> Emotion {
    let lower = text.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if any(HAPPY) {
        Emotion::Happy
    } else if any(SAD) {
        Emotion::Sad
    } else if any(THINKING) {
        Emotion::Thinking
    } else if any(SURPRISED) {
        Emotion::Surprised
    } else {
        Emotion::Neutral
    }
}

/// 0–100 mood meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mood(u8);

impl Default for Mood {
    fn default() -> Self {
        Mood(defaults::INITIAL_MOOD)
    }
}

impl Mood {
    const STEP: u8 = 5;
    const MAX: u8 = 100;

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Happy replies raise the mood, sad ones lower it.
    pub fn apply(&mut self, emotion: Emotion) {
        self.0 = match emotion {
            Emotion::Happy => (self.0 + Self::STEP).min(Self::MAX),
            Emotion::Sad => self.0.saturating_sub(Self::STEP),
            _ => self.0,
        };
    }
}
