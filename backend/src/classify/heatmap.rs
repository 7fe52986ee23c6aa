use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ImageError, ImageFormat, Rgb, RgbImage, imageops};
use lazy_static::lazy_static;

/// Gaussian sigma equivalent to a 15x15 smoothing kernel.
const BLUR_SIGMA: f32 = 2.6;

lazy_static! {
    static ref JET: [Rgb<u8>; 256] = jet_palette();
}

/// Classic jet ramp: blue through green and yellow to red.
fn jet_palette() -> [Rgb<u8>; 256] {
    let mut palette = [Rgb([0u8, 0, 0]); 256];
    for (value, entry) in palette.iter_mut().enumerate() {
        let x = value as f32 / 255.0;
        let r = (4.0 * x - 1.5).min(-4.0 * x + 4.5).clamp(0.0, 1.0);
        let g = (4.0 * x - 0.5).min(-4.0 * x + 3.5).clamp(0.0, 1.0);
        let b = (4.0 * x + 0.5).min(-4.0 * x + 2.5).clamp(0.0, 1.0);
        *entry = Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]);
    }
    palette
}

/// False-color overlay highlighting bright regions, rendered at the input
/// dimensions and returned as base64 PNG. The pipeline is fixed and does not
/// depend on the classification outcome.
pub fn render_overlay(image: &RgbImage) -> Result<String, ImageError> {
    encode_png_base64(&overlay_image(image))
}

fn overlay_image(image: &RgbImage) -> RgbImage {
    let gray = imageops::grayscale(image);
    let smoothed = imageops::blur(&gray, BLUR_SIGMA);

    let (width, height) = image.dimensions();
    let mut overlay = RgbImage::new(width, height);
    for (x, y, pixel) in overlay.enumerate_pixels_mut() {
        let heat = JET[usize::from(smoothed.get_pixel(x, y).0[0])];
        let original = image.get_pixel(x, y);
        for channel in 0..3 {
            // 50/50 blend, rounded.
            pixel.0[channel] =
                ((u16::from(heat.0[channel]) + u16::from(original.0[channel]) + 1) / 2) as u8;
        }
    }
    overlay
}

/// Lossless PNG encode followed by base64, for embedding in JSON payloads.
pub fn encode_png_base64(image: &RgbImage) -> Result<String, ImageError> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(STANDARD.encode(buffer))
}
