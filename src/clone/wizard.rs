//! Guided clone creation.
//!
//! Name → personality questions → speaking style → face (optional) → done.

use crate::clone::profile::{FaceFeatures, NewClone, PersonalityAnswer};
use crate::error::{CloneVoiceError, Result};

/// A personality question and the category its answer is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub category: String,
}

impl Question {
    pub fn new(prompt: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            category: category.into(),
        }
    }
}

pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new("Bạn mô tả tính cách của mình như thế nào?", "personality"),
        Question::new("Khi vui bạn thường nói gì?", "emotion"),
        Question::new("Khi buồn bạn thường làm gì?", "emotion"),
        Question::new("Câu nói cửa miệng của bạn là gì?", "speech"),
        Question::new(
            "Bạn thích nói chuyện kiểu nào? (hài hước, nghiêm túc, thân thiện...)",
            "style",
        ),
        Question::new("Sở thích của bạn là gì?", "interest"),
        Question::new("Bạn ghét điều gì nhất?", "dislike"),
        Question::new("Mục tiêu trong cuộc sống của bạn?", "goal"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Name,
    /// Waiting for the answer to question `index`.
    Personality {
        index: usize,
    },
    SpeakingStyle,
    Face,
    Done,
}

#[derive(Debug, Clone)]
pub struct CloneWizard {
    step: WizardStep,
    name: String,
    questions: Vec<Question>,
    answers: Vec<String>,
    speaking_style: String,
    face_image: Option<String>,
    face_features: Option<FaceFeatures>,
}

impl Default for CloneWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl CloneWizard {
    pub fn new() -> Self {
        Self::with_questions(default_questions())
    }

    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            step: WizardStep::Name,
            name: String::new(),
            questions,
            answers: Vec::new(),
            speaking_style: String::new(),
            face_image: None,
            face_features: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The question waiting for an answer, if any.
    pub fn current_question(&self) -> Option<&Question> {
        match self.step {
            WizardStep::Personality { index } => self.questions.get(index),
            _ => None,
        }
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.require_step(WizardStep::Name)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(incomplete("the clone needs a name"));
        }
        self.name = name.to_string();
        self.step = if self.questions.is_empty() {
            WizardStep::SpeakingStyle
        } else {
            WizardStep::Personality { index: 0 }
        };
        Ok(())
    }

    /// Answer the current question and move to the next one.
    pub fn answer(&mut self, response: &str) -> Result<()> {
        let WizardStep::Personality { index } = self.step else {
            return Err(incomplete("no question is waiting for an answer"));
        };
        let response = response.trim();
        if response.is_empty() {
            return Err(incomplete("answers cannot be empty"));
        }
        self.answers.push(response.to_string());
        self.step = if index + 1 < self.questions.len() {
            WizardStep::Personality { index: index + 1 }
        } else {
            WizardStep::SpeakingStyle
        };
        Ok(())
    }

    /// Sample conversation or catchphrases. May be empty.
    pub fn set_speaking_style(&mut self, style: &str) -> Result<()> {
        self.require_step(WizardStep::SpeakingStyle)?;
        self.speaking_style = style.trim().to_string();
        self.step = WizardStep::Face;
        Ok(())
    }

    pub fn set_face(&mut self, image: Option<String>, features: FaceFeatures) -> Result<()> {
        self.require_step(WizardStep::Face)?;
        self.face_image = image;
        self.face_features = Some(features);
        self.step = WizardStep::Done;
        Ok(())
    }

    pub fn skip_face(&mut self) -> Result<()> {
        self.require_step(WizardStep::Face)?;
        self.step = WizardStep::Done;
        Ok(())
    }

    pub fn personality(&self) -> Vec<PersonalityAnswer> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| PersonalityAnswer::new(q.category.clone(), a.clone()))
            .collect()
    }

    /// Produce the clone to create.
    pub fn finish(self) -> Result<NewClone> {
        if self.step != WizardStep::Done {
            return Err(incomplete(&format!("setup stopped at {:?}", self.step)));
        }
        let personality = self.personality();
        Ok(NewClone {
            name: self.name,
            personality,
            speaking_style: self.speaking_style,
            face_image: self.face_image,
            face_features: self.face_features,
            memories: Vec::new(),
        })
    }

    fn require_step(&self, step: WizardStep) -> Result<()> {
        if self.step == step {
            Ok(())
        } else {
            Err(incomplete(&format!(
                "expected step {:?}, wizard is at {:?}",
                step, self.step
            )))
        }
    }
}

fn incomplete(message: &str) -> CloneVoiceError {
    CloneVoiceError::CloneIncomplete {
        message: message.to_string(),
    }
}
