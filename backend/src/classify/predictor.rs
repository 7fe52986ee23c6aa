use image::RgbImage;
use log::info;
use shared::ClassLabel;

use crate::classify::decider::Classifier;
use crate::classify::heatmap;

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("Image decode failed: {0}")]
    Decode(image::ImageError),
    #[error("Image encode failed: {0}")]
    Encode(image::ImageError),
}

/// Single prediction outcome: both fields present or the request failed.
pub struct PredictionResult {
    pub label: ClassLabel,
    pub confidence: f32,
    pub heatmap_base64: String,
}

/// Combines the classifier with the heatmap renderer. Constructed once at
/// startup and handed to request handlers.
#[derive(Clone)]
pub struct Predictor {
    classifier: Classifier,
}

impl Predictor {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Decode arbitrary image bytes into the RGB raster all pixel-derived
    /// decisions operate on.
    pub fn decode(bytes: &[u8]) -> Result<RgbImage, PredictError> {
        let image = image::load_from_memory(bytes).map_err(PredictError::Decode)?;
        Ok(image.to_rgb8())
    }

    pub fn predict(
        &self,
        image: &RgbImage,
        filename: &str,
    ) -> Result<PredictionResult, PredictError> {
        let (label, confidence) = self.classifier.classify(image, filename);
        let heatmap_base64 = heatmap::render_overlay(image).map_err(PredictError::Encode)?;

        info!("Predicted {} at {:.3} for '{}'", label, confidence, filename);
        Ok(PredictionResult {
            label,
            confidence,
            heatmap_base64,
        })
    }
}
