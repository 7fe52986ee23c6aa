use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumIter};

/// Closed set of chest X-ray classes. Fixed at process start; ordering
/// matches the classical label indexing used throughout the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum ClassLabel {
    Normal,
    Pneumonia,
    #[serde(rename = "COVID-19")]
    #[strum(serialize = "COVID-19")]
    Covid19,
    #[serde(rename = "Lung Opacity")]
    #[strum(serialize = "Lung Opacity")]
    LungOpacity,
}

impl ClassLabel {
    pub fn from_index(index: u64) -> Self {
        match index {
            0 => ClassLabel::Normal,
            1 => ClassLabel::Pneumonia,
            2 => ClassLabel::Covid19,
            _ => ClassLabel::LungOpacity,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct PredictionResponse {
    pub filename: String,
    pub prediction_class: ClassLabel,
    pub confidence: f32,
    pub heatmap_base64: String,
    pub original_image_base64: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct DatasetRequest {
    pub dataset_handle: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub rows: Option<usize>,
}

/// Bounded tabular preview. `shape` is the full table extent, not the size
/// of `head`.
#[derive(Serialize, Deserialize, Clone)]
pub struct FilePreview {
    pub columns: Vec<String>,
    pub shape: (usize, usize),
    pub head: Vec<Map<String, Value>>,
}
