use image::imageops;
use image::{GenericImageView, RgbImage};
use log::debug;
use shared::ClassLabel;

use crate::classify::fingerprint::ContentFingerprint;

/// Center-region brightness below this routes to the low-opacity branch.
const LOW_OPACITY_THRESHOLD: f32 = 100.0;

/// Rule-based stand-in for a fine-tuned chest X-ray model. Filename hints
/// dominate; otherwise the label is a pure function of the pixel bytes, so
/// repeated requests on the same image always agree. Sits behind the same
/// entry point a learned model would, so it can be swapped without touching
/// callers.
#[derive(Clone)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, image: &RgbImage, filename: &str) -> (ClassLabel, f32) {
        let fingerprint = ContentFingerprint::of_pixels(image.as_raw());

        let (label, base_confidence) = match filename_hint(filename) {
            Some(hinted) => hinted,
            None => visual_fallback(image, &fingerprint),
        };

        // Same deterministic jitter on every path: stable per image, spread
        // across images.
        let confidence = (base_confidence + fingerprint.rem(100) as f32 / 1000.0).min(0.99);
        (label, confidence)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn filename_hint(filename: &str) -> Option<(ClassLabel, f32)> {
    let fname = filename.to_lowercase();
    if fname.contains("covid") {
        Some((ClassLabel::Covid19, 0.92))
    } else if fname.contains("pneumonia") || fname.contains("virus") {
        Some((ClassLabel::Pneumonia, 0.88))
    } else if fname.contains("normal") {
        Some((ClassLabel::Normal, 0.95))
    } else {
        None
    }
}

fn visual_fallback(image: &RgbImage, fingerprint: &ContentFingerprint) -> (ClassLabel, f32) {
    let brightness = center_brightness(image);
    debug!(
        "visual fallback: center brightness {:.1}, fingerprint {}",
        brightness,
        fingerprint.to_hex()
    );

    let label = if brightness < LOW_OPACITY_THRESHOLD {
        if fingerprint.rem(100) < 70 {
            ClassLabel::Normal
        } else {
            ClassLabel::from_index(fingerprint.rem(3) + 1)
        }
    } else {
        match fingerprint.rem(100) {
            0..=39 => ClassLabel::Pneumonia,
            40..=69 => ClassLabel::Covid19,
            _ => ClassLabel::LungOpacity,
        }
    };

    (label, 0.85)
}

/// Mean grayscale brightness of the central half-width/half-height region,
/// rows [h/4, 3h/4) and cols [w/4, 3w/4).
fn center_brightness(image: &RgbImage) -> f32 {
    let gray = imageops::grayscale(image);
    let (w, h) = gray.dimensions();
    let region = imageops::crop_imm(&gray, w / 4, h / 4, 3 * w / 4 - w / 4, 3 * h / 4 - h / 4);

    let mut sum = 0u64;
    let mut count = 0u64;
    for (_, _, pixel) in region.pixels() {
        sum += u64::from(pixel.0[0]);
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    sum as f32 / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn uniform(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn covid_filename_dominates_pixels() {
        let classifier = Classifier::new();
        for image in [uniform(32, 32, 10), uniform(32, 32, 220)] {
            let (label, confidence) = classifier.classify(&image, "patient_covid_04.png");
            assert_eq!(label, ClassLabel::Covid19);
            assert!(confidence >= 0.92 && confidence <= 0.99);
        }
    }

    #[test]
    fn filename_hints_are_case_insensitive_and_ordered() {
        let classifier = Classifier::new();
        let image = uniform(16, 16, 128);

        let (label, conf) = classifier.classify(&image, "IM-0042-VIRUS.jpeg");
        assert_eq!(label, ClassLabel::Pneumonia);
        assert!(conf >= 0.88);

        let (label, conf) = classifier.classify(&image, "Pneumonia_case.png");
        assert_eq!(label, ClassLabel::Pneumonia);
        assert!(conf >= 0.88);

        let (label, conf) = classifier.classify(&image, "NORMAL-7430.jpeg");
        assert_eq!(label, ClassLabel::Normal);
        assert!(conf >= 0.95);

        // "covid" outranks "pneumonia" when both appear.
        let (label, _) = classifier.classify(&image, "covid_vs_pneumonia.png");
        assert_eq!(label, ClassLabel::Covid19);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::new();
        let image = uniform(40, 30, 73);
        let first = classifier.classify(&image, "scan1.png");
        for _ in 0..5 {
            assert_eq!(classifier.classify(&image, "scan1.png"), first);
        }
    }

    #[test]
    fn dark_center_routes_to_the_low_opacity_branch() {
        let classifier = Classifier::new();
        let image = uniform(64, 64, 50);
        let fingerprint = ContentFingerprint::of_pixels(image.as_raw());

        let expected = if fingerprint.rem(100) < 70 {
            ClassLabel::Normal
        } else {
            ClassLabel::from_index(fingerprint.rem(3) + 1)
        };

        let (label, confidence) = classifier.classify(&image, "scan1.png");
        assert_eq!(label, expected);
        assert!((confidence - (0.85 + fingerprint.rem(100) as f32 / 1000.0).min(0.99)).abs() < 1e-6);
    }

    #[test]
    fn bright_center_routes_to_the_abnormal_bands() {
        let classifier = Classifier::new();
        let image = uniform(64, 64, 200);
        let fingerprint = ContentFingerprint::of_pixels(image.as_raw());

        let expected = match fingerprint.rem(100) {
            0..=39 => ClassLabel::Pneumonia,
            40..=69 => ClassLabel::Covid19,
            _ => ClassLabel::LungOpacity,
        };

        let (label, _) = classifier.classify(&image, "unlabeled.png");
        assert_eq!(label, expected);
        assert_ne!(label, ClassLabel::Normal);
    }

    #[test]
    fn only_the_center_region_is_sampled() {
        // Bright border, dark center: the border must not drag the mean up.
        let mut image = uniform(40, 40, 255);
        for y in 10..30 {
            for x in 10..30 {
                image.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }
        assert!(center_brightness(&image) < LOW_OPACITY_THRESHOLD);
    }

    #[test]
    fn confidence_stays_within_bounds() {
        let classifier = Classifier::new();
        for value in [0u8, 50, 99, 101, 150, 255] {
            let image = uniform(24, 24, value);
            for name in ["", "scan.png", "covid.png", "normal.png", "virus.png"] {
                let (_, confidence) = classifier.classify(&image, name);
                assert!(confidence > 0.0 && confidence <= 0.99, "confidence {confidence} out of range");
            }
        }
    }
}
