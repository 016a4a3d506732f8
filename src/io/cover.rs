//! Cover image fitting for the image column.

use std::io::Cursor;

use image::ImageFormat;
use image::imageops::FilterType;

/// Decodes a cover, resizes it to exactly `width` x `height` pixels with
/// Lanczos resampling and re-encodes it as PNG.
pub fn fit_cover(bytes: &[u8], (width, height): (u32, u32)) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let resized = decoded.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3);

    let mut encoded = Cursor::new(Vec::new());
    resized.write_to(&mut encoded, ImageFormat::Png)?;
    Ok(encoded.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).expect("png encoded");
        buffer.into_inner()
    }

    #[test]
    fn resizes_to_exact_cell_size() {
        let fitted = fit_cover(&png(85, 120), (117, 149)).expect("cover fitted");
        let decoded = image::load_from_memory(&fitted).expect("fitted cover decodes");
        assert_eq!(decoded.dimensions(), (117, 149));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(fit_cover(b"not an image", (10, 10)).is_err());
    }
}
