//! Clone records as stored by the backend.

use serde::{Deserialize, Deserializer, Serialize};

/// One answered personality question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityAnswer {
    pub category: String,
    pub response: String,
}

impl PersonalityAnswer {
    pub fn new(category: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            response: response.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceShape {
    #[default]
    Oval,
    Round,
    Square,
    Heart,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HairStyle {
    #[default]
    Short,
    Long,
    Bald,
}

/// Appearance used to render the clone's avatar.
///
/// Colours are CSS strings (`#rrggbb` or `rgb(r, g, b)`); geometry values
/// are proportions of the face height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceFeatures {
    pub skin_tone: String,
    pub hair_color: String,
    pub eye_color: String,
    pub face_shape: FaceShape,
    pub face_width: f32,
    pub face_length: f32,
    pub eye_size: f32,
    pub eye_distance: f32,
    pub nose_size: f32,
    pub mouth_width: f32,
    pub brow_thickness: f32,
    pub has_glasses: bool,
    pub hair_style: HairStyle,
}

impl Default for FaceFeatures {
    fn default() -> Self {
        Self {
            skin_tone: "#f5c6a5".to_string(),
            hair_color: "#1a1a1a".to_string(),
            eye_color: "#4a3728".to_string(),
            face_shape: FaceShape::Oval,
            face_width: 1.0,
            face_length: 1.2,
            eye_size: 0.2,
            eye_distance: 0.35,
            nose_size: 0.15,
            mouth_width: 0.3,
            brow_thickness: 0.08,
            has_glasses: false,
            hair_style: HairStyle::Short,
        }
    }
}

/// A remembered exchange with the clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneMemory {
    pub user_message: String,
    pub clone_response: String,
}

/// Body of `POST /api/clones/create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewClone {
    pub name: String,
    pub personality: Vec<PersonalityAnswer>,
    pub speaking_style: String,
    pub face_image: Option<String>,
    pub face_features: Option<FaceFeatures>,
    pub memories: Vec<CloneMemory>,
}

/// A stored clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub personality: Vec<PersonalityAnswer>,
    #[serde(default)]
    pub speaking_style: String,
    #[serde(default)]
    pub face_image: Option<String>,
    #[serde(default)]
    pub face_features: Option<FaceFeatures>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub memories: Vec<CloneMemory>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Entry of `GET /api/clones/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloneSummary {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub personality_count: usize,
    #[serde(default)]
    pub memories_count: usize,
}

/// Body of `PUT /api/clones/{id}`. Only set fields are changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloneUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaking_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<Vec<PersonalityAnswer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memories: Option<Vec<CloneMemory>>,
}

impl CloneUpdate {
    pub fn is_empty(&self) -> bool {
        *self == CloneUpdate::default()
    }
}

/// Reply from `POST /api/clones/{id}/memory`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryAdded {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub memories_count: usize,
}

/// Reply from `GET /api/clones/{id}/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloneStats {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub personality_answers: usize,
    #[serde(default)]
    pub total_memories: usize,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub has_face: bool,
    #[serde(default)]
    pub has_features: bool,
}

/// Ids arrive as strings from some deployments and integers from others.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(n) => n.to_string(),
    })
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<CloneMemory>, D::Error> {
    Ok(Option::<Vec<CloneMemory>>::deserialize(deserializer)?.unwrap_or_default())
}
