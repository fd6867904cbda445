use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, RgbImage, RgbaImage};

use crate::error::{CompressionError, DecodeError};

/// Sniff the image format from the raw byte signature.
pub(crate) fn sniff_format(input: &[u8]) -> Result<ImageFormat, DecodeError> {
    image::guess_format(input).map_err(|_| DecodeError::UnsupportedFormat)
}

/// Decode input bytes into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, DecodeError> {
    sniff_format(input)?;
    image::load_from_memory(input).map_err(classify_decode_error)
}

fn classify_decode_error(err: image::ImageError) -> DecodeError {
    match err {
        image::ImageError::Unsupported(_) => DecodeError::UnsupportedFormat,
        image::ImageError::IoError(ref io)
            if io.kind() == std::io::ErrorKind::UnexpectedEof =>
        {
            DecodeError::Truncated
        }
        other => DecodeError::Corrupt(other.to_string()),
    }
}

/// Compute output dimensions for a single downscale pass.
///
/// Dimensions already within bounds are returned unchanged (no upscaling).
/// Otherwise one uniform scale factor `min(max_w/w, max_h/h)` is applied to
/// both axes and each result is rounded to the nearest integer, floored at 1,
/// so the aspect ratio is preserved and neither bound is exceeded.
pub(crate) fn target_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Downscale the image to fit within `max_width` × `max_height`.
///
/// Returns the input untouched when it already fits. Lanczos3 resampling is
/// deterministic for identical inputs, which the encode determinism tests
/// rely on.
pub(crate) fn resize_to_fit(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (src_w, src_h) = (image.width(), image.height());
    let (new_w, new_h) = target_dimensions(src_w, src_h, max_width, max_height);

    if (new_w, new_h) == (src_w, src_h) {
        return image;
    }

    log::debug!("resizing {src_w}x{src_h} -> {new_w}x{new_h}");
    image.resize_exact(new_w, new_h, FilterType::Lanczos3)
}

/// Flatten any alpha channel by compositing onto an opaque white background.
///
/// JPEG has no transparency, so this is the documented background-fill policy
/// rather than leaving the composite to the encoder.
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba: RgbaImage = image.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let out_r = (r as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_g = (g as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_b = (b as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        rgb.put_pixel(x, y, image::Rgb([out_r, out_g, out_b]));
    }

    rgb
}

/// Encode the image as JPEG at the given quality (0.0–1.0).
///
/// Pure function of `(image, quality)`: identical inputs produce
/// byte-identical output. The reported size is the actual encoded buffer
/// length, not an approximation.
pub(crate) fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>, CompressionError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(CompressionError::InvalidQuality(quality));
    }

    // The JPEG encoder expects 1–100.
    let quality_percent = ((quality * 100.0).round() as u8).max(1);

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CompressionError::Encode(e.to_string()))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageEncoder;

    fn make_test_rgb(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            // Simple gradient pattern
            *pixel = image::Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ]);
        }
        img
    }

    fn make_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = make_test_rgb(width, height);
        let mut buffer = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
        encoder
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    #[test]
    fn decode_valid_png() {
        let png = make_test_png(32, 24);
        let decoded = decode_image(&png).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 24);
    }

    #[test]
    fn decode_unrecognized_signature() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat)));
    }

    #[test]
    fn decode_truncated_png_classified_as_truncated() {
        let png = make_test_png(64, 64);
        // Keep the signature and header, cut off the pixel data
        let result = decode_image(&png[..png.len() / 2]);
        assert!(
            matches!(result, Err(DecodeError::Truncated)),
            "expected Truncated, got {result:?}"
        );
    }

    #[test]
    fn target_dimensions_no_upscale() {
        assert_eq!(target_dimensions(400, 300, 1280, 720), (400, 300));
    }

    #[test]
    fn target_dimensions_exact_fit_unchanged() {
        assert_eq!(target_dimensions(1280, 720, 1280, 720), (1280, 720));
    }

    #[test]
    fn target_dimensions_width_bound() {
        // 2560x720: scale = min(0.5, 1.0) = 0.5
        assert_eq!(target_dimensions(2560, 720, 1280, 720), (1280, 360));
    }

    #[test]
    fn target_dimensions_height_bound() {
        // 1600x1200: scale = min(0.8, 0.6) = 0.6
        assert_eq!(target_dimensions(1600, 1200, 1280, 720), (960, 720));
    }

    #[test]
    fn target_dimensions_never_zero() {
        // Extreme aspect: 10000x1 into 100x100 scales height to 0.01
        let (w, h) = target_dimensions(10000, 1, 100, 100);
        assert_eq!(w, 100);
        assert_eq!(h, 1);
    }

    #[test]
    fn resize_returns_input_when_within_bounds() {
        let img = DynamicImage::ImageRgb8(make_test_rgb(200, 100));
        let resized = resize_to_fit(img, 1280, 720);
        assert_eq!(resized.width(), 200);
        assert_eq!(resized.height(), 100);
    }

    #[test]
    fn resize_preserves_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(make_test_rgb(1600, 1200));
        let resized = resize_to_fit(img, 1280, 720);
        assert_eq!(resized.width(), 960);
        assert_eq!(resized.height(), 720);
    }

    #[test]
    fn flatten_alpha_composites_over_white() {
        // Fully transparent pixel should become white
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([255, 0, 0, 0]));
        let dynamic = DynamicImage::ImageRgba8(rgba);
        let rgb = flatten_alpha(&dynamic);
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn flatten_alpha_preserves_opaque() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([100, 150, 200, 255]));
        let dynamic = DynamicImage::ImageRgba8(rgba);
        let rgb = flatten_alpha(&dynamic);
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([100, 150, 200]));
    }

    #[test]
    fn flatten_alpha_blends_semitransparent() {
        let mut rgba = RgbaImage::new(1, 1);
        // 50% transparent red → should blend with white
        rgba.put_pixel(0, 0, image::Rgba([255, 0, 0, 128]));
        let dynamic = DynamicImage::ImageRgba8(rgba);
        let rgb = flatten_alpha(&dynamic);
        let pixel = rgb.get_pixel(0, 0);
        assert!((pixel.0[0] as i16 - 255).abs() <= 1);
        assert!((pixel.0[1] as i16 - 127).abs() <= 2);
        assert!((pixel.0[2] as i16 - 127).abs() <= 2);
    }

    #[test]
    fn flatten_alpha_passthrough_without_alpha() {
        let img = DynamicImage::ImageRgb8(make_test_rgb(4, 4));
        let rgb = flatten_alpha(&img);
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([0, 0, 128]));
    }

    #[test]
    fn encode_jpeg_produces_valid_output() {
        let img = make_test_rgb(48, 64);
        let data = encode_jpeg(&img, 0.8).unwrap();
        assert!(!data.is_empty());
        // JPEG magic bytes
        assert_eq!(data[0], 0xFF);
        assert_eq!(data[1], 0xD8);
    }

    #[test]
    fn encode_jpeg_is_deterministic() {
        let img = make_test_rgb(64, 48);
        let first = encode_jpeg(&img, 0.7).unwrap();
        let second = encode_jpeg(&img, 0.7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn encode_jpeg_lower_quality_is_smaller() {
        let img = make_test_rgb(128, 128);
        let high = encode_jpeg(&img, 0.9).unwrap();
        let low = encode_jpeg(&img, 0.1).unwrap();
        assert!(
            low.len() <= high.len(),
            "quality 0.1 ({}) should not exceed quality 0.9 ({})",
            low.len(),
            high.len()
        );
    }

    #[test]
    fn encode_jpeg_rejects_out_of_range_quality() {
        let img = make_test_rgb(8, 8);
        assert!(matches!(
            encode_jpeg(&img, 1.5),
            Err(CompressionError::InvalidQuality(_))
        ));
        assert!(matches!(
            encode_jpeg(&img, -0.1),
            Err(CompressionError::InvalidQuality(_))
        ));
    }
}
