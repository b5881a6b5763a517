//! Avatar transformer
//!
//! Every avatar is cover-fit to a fixed square and re-encoded to WebP, so the
//! stored file never depends on what the client uploaded.

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

/// Edge length of the stored avatar, in pixels
pub const AVATAR_SIZE: u32 = 256;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// A transformed avatar ready to be stored.
#[derive(Debug, Clone)]
pub struct AvatarImage {
    pub data: Bytes,
}

impl AvatarImage {
    /// File extension matching the output codec
    pub const EXTENSION: &'static str = "webp";
    /// Content type matching the output codec
    pub const CONTENT_TYPE: &'static str = "image/webp";
}

pub struct AvatarTransformer;

impl AvatarTransformer {
    /// Decode `data`, cover-fit it to `AVATAR_SIZE`x`AVATAR_SIZE` and encode as WebP.
    ///
    /// The crop keeps the center of the image. CPU-bound: async callers should run
    /// it on the blocking pool.
    pub fn transform(data: &[u8]) -> Result<AvatarImage, ProcessingError> {
        let img = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()
            .map_err(ProcessingError::Decode)?;

        let (orig_width, orig_height) = img.dimensions();
        let resized = Self::cover_fit(&img, AVATAR_SIZE);

        // The WebP encoder only takes 8-bit buffers
        let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());
        let (width, height) = rgba.dimensions();

        let mut buffer = Vec::with_capacity((width * height) as usize);
        rgba.write_to(&mut Cursor::new(&mut buffer), ImageFormat::WebP)
            .map_err(ProcessingError::Encode)?;

        tracing::debug!(
            orig_width,
            orig_height,
            width,
            height,
            size_bytes = buffer.len(),
            "Avatar transformed"
        );

        Ok(AvatarImage {
            data: Bytes::from(buffer),
        })
    }

    /// Scale to cover a `size`x`size` square, then crop the overflow evenly.
    fn cover_fit(img: &DynamicImage, size: u32) -> DynamicImage {
        img.resize_to_fill(size, size, FilterType::Lanczos3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn decode_dimensions(data: &[u8]) -> (u32, u32) {
        image::load_from_memory_with_format(data, ImageFormat::WebP)
            .unwrap()
            .dimensions()
    }

    #[test]
    fn test_landscape_png_becomes_square_webp() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(640, 200, Rgba([200, 10, 10, 255])));
        let avatar = AvatarTransformer::transform(&encode(img, ImageFormat::Png)).unwrap();

        assert_eq!(decode_dimensions(&avatar.data), (AVATAR_SIZE, AVATAR_SIZE));
    }

    #[test]
    fn test_small_jpeg_is_upscaled() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            16,
            40,
            image::Rgb([0, 128, 255]),
        ));
        let avatar = AvatarTransformer::transform(&encode(img, ImageFormat::Jpeg)).unwrap();

        assert_eq!(decode_dimensions(&avatar.data), (256, 256));
    }

    #[test]
    fn test_output_is_webp() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(300, 300, Rgba([1, 2, 3, 255])));
        let avatar = AvatarTransformer::transform(&encode(img, ImageFormat::Png)).unwrap();

        assert_eq!(
            image::guess_format(&avatar.data).unwrap(),
            ImageFormat::WebP
        );
        assert_eq!(AvatarImage::CONTENT_TYPE, "image/webp");
    }

    #[test]
    fn test_non_image_rejected() {
        let result = AvatarTransformer::transform(b"definitely not an image");
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }
}
