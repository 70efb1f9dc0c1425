//! Personal clones: guided creation, face colour sampling and persona
//! prompting.

pub mod face;
pub mod persona;
pub mod profile;
pub mod wizard;

pub use face::{Frame, analyze_frame};
pub use persona::{Emotion, Mood, build_prompt, detect_emotion};
pub use profile::{CloneRecord, FaceFeatures, NewClone, PersonalityAnswer};
pub use wizard::{CloneWizard, WizardStep};
