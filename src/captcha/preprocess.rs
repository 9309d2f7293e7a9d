use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageError, Luma};
use std::fs;
use std::path::Path;

use crate::error::CaptchaError;

/// Width of the normalized captcha matrix.
pub const MATRIX_WIDTH: u32 = 70;
/// Height of the normalized captcha matrix.
pub const MATRIX_HEIGHT: u32 = 20;
/// Pixels strictly brighter than this become 255, everything else 0.
pub const BINARIZE_THRESHOLD: u8 = 128;

/// Source of one captcha challenge.
#[derive(Debug, Clone, Copy)]
pub enum CaptchaImage<'a> {
    File(&'a Path),
    Bytes(&'a [u8]),
}

/// Decodes, resizes and binarizes a captcha into a 70x20 matrix of 0/255 pixels.
///
/// Pure function of the input bytes.
pub fn preprocess(image: CaptchaImage<'_>) -> Result<GrayImage, CaptchaError> {
    let decoded = match image {
        CaptchaImage::File(path) => {
            let bytes = fs::read(path).map_err(ImageError::IoError)?;
            image::load_from_memory(&bytes)?
        }
        CaptchaImage::Bytes(bytes) => image::load_from_memory(bytes)?,
    };

    let luma = to_luminance(&decoded);
    let resized = imageops::resize(&luma, MATRIX_WIDTH, MATRIX_HEIGHT, FilterType::CatmullRom);
    Ok(binarize(&resized, BINARIZE_THRESHOLD))
}

/// Converts to single-channel luminance with BT.601 weights.
///
/// Y = 0.299*R + 0.587*G + 0.114*B in 16-bit fixed point, rounded. Alpha is ignored.
pub fn to_luminance(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let r = pixel[0] as u32;
        let g = pixel[1] as u32;
        let b = pixel[2] as u32;
        let luminance = (r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16;
        output.put_pixel(x, y, Luma([luminance as u8]));
    }

    output
}

/// Maps pixels above `threshold` to 255 and all others to 0.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel[0] > threshold { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn noisy_capture() -> Vec<u8> {
        // 140x40 RGB with gradients and stripes, like a real element screenshot
        let img = RgbImage::from_fn(140, 40, |x, y| {
            let v = ((x * 7 + y * 13) % 256) as u8;
            Rgb([v, v.wrapping_mul(3), 255 - v])
        });
        encode_png(DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn test_output_has_fixed_dimensions_and_binary_pixels() {
        let bytes = noisy_capture();
        let matrix = preprocess(CaptchaImage::Bytes(&bytes)).unwrap();

        assert_eq!(matrix.dimensions(), (MATRIX_WIDTH, MATRIX_HEIGHT));
        assert!(matrix.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let bytes = noisy_capture();
        let first = preprocess(CaptchaImage::Bytes(&bytes)).unwrap();
        for _ in 0..3 {
            let again = preprocess(CaptchaImage::Bytes(&bytes)).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_file_and_bytes_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captcha.png");
        let bytes = noisy_capture();
        std::fs::write(&path, &bytes).unwrap();

        let from_file = preprocess(CaptchaImage::File(&path)).unwrap();
        let from_bytes = preprocess(CaptchaImage::Bytes(&bytes)).unwrap();
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn test_binarize_threshold_is_strict() {
        let mut img = GrayImage::new(4, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([128]));
        img.put_pixel(2, 0, Luma([129]));
        img.put_pixel(3, 0, Luma([255]));

        let result = binarize(&img, BINARIZE_THRESHOLD);

        assert_eq!(result.get_pixel(0, 0)[0], 0);
        assert_eq!(result.get_pixel(1, 0)[0], 0, "128 is not strictly greater");
        assert_eq!(result.get_pixel(2, 0)[0], 255);
        assert_eq!(result.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn test_luminance_weights() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([255, 255, 255]),
        });
        let luma = to_luminance(&DynamicImage::ImageRgb8(img));

        assert_eq!(luma.get_pixel(0, 0)[0], 76);
        assert_eq!(luma.get_pixel(1, 0)[0], 150);
        assert_eq!(luma.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_same_size_binary_image_is_unchanged() {
        let img = GrayImage::from_fn(MATRIX_WIDTH, MATRIX_HEIGHT, |x, y| {
            Luma([if (x + y) % 3 == 0 { 255 } else { 0 }])
        });
        let bytes = encode_png(DynamicImage::ImageLuma8(img.clone()));

        assert_eq!(preprocess(CaptchaImage::Bytes(&bytes)).unwrap(), img);
    }

    #[test]
    fn test_corrupt_bytes_fail_to_decode() {
        let err = preprocess(CaptchaImage::Bytes(b"definitely not a png")).unwrap_err();
        assert!(matches!(err, CaptchaError::ImageDecode(_)));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = preprocess(CaptchaImage::File(Path::new("/nonexistent/captcha.png"))).unwrap_err();
        assert!(matches!(err, CaptchaError::ImageDecode(ImageError::IoError(_))));
    }
}
