// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, flatten transparency onto white, fit into a box,
// and re-encode. Operates on in-memory images using the `image` crate.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mailpdf_core::error::ConversionError;
use tracing::{debug, instrument};

/// Image pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining:
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&png)?
///     .flatten_onto_white()
///     .fit_within(480.0, 700.0)
///     .to_jpeg_bytes(85)?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw bytes (PNG, JPEG, GIF, BMP, TIFF, WebP).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ConversionError> {
        let img = image::load_from_memory(data)
            .map_err(|err| ConversionError::ImageDecode(format!("failed to decode image: {err}")))?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return three-channel pixels.
    pub fn into_rgb8(self) -> RgbImage {
        self.image.into_rgb8()
    }

    // -- Transformations ------------------------------------------------------

    /// Composite onto an opaque white background and drop to RGB.
    ///
    /// Anything that is not already plain 8-bit RGB goes through RGBA, with
    /// alpha as the blend mask. Without this, transparent PNG/GIF regions come
    /// out black once the alpha channel is discarded.
    pub fn flatten_onto_white(self) -> Self {
        if matches!(self.image, DynamicImage::ImageRgb8(_)) {
            return self;
        }

        let rgba = self.image.to_rgba8();
        let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let alpha = a as f32 / 255.0;
            let blend = |channel: u8| -> u8 {
                (channel as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8
            };
            Rgb([blend(r), blend(g), blend(b)])
        });

        debug!("Flattened image onto white background");
        Self {
            image: DynamicImage::ImageRgb8(flattened),
        }
    }

    /// Uniform scale that fits the image inside `box_w` x `box_h`.
    pub fn fit_scale(&self, box_w: f32, box_h: f32) -> f32 {
        let w = self.image.width().max(1) as f32;
        let h = self.image.height().max(1) as f32;
        (box_w / w).min(box_h / h)
    }

    /// Resize so the image fills `box_w` x `box_h` as far as it can without
    /// distortion or cropping. Uses Lanczos3 in both directions.
    #[instrument(skip(self), fields(box_w, box_h))]
    pub fn fit_within(self, box_w: f32, box_h: f32) -> Self {
        let scale = self.fit_scale(box_w, box_h);
        let new_w = ((self.image.width() as f32 * scale).round() as u32).max(1);
        let new_h = ((self.image.height() as f32 * scale).round() as u32).max(1);
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            new_w,
            new_h,
            scale,
            "Resizing image to fit"
        );
        let resized = self
            .image
            .resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Round-trip through lossy JPEG at `quality`, keeping the decoded result.
    pub fn jpeg_roundtrip(self, quality: u8) -> Result<Self, ConversionError> {
        let jpeg = self.to_jpeg_bytes(quality)?;
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .map_err(|err| ConversionError::ImageDecode(format!("JPEG re-decode failed: {err}")))?;
        debug!(jpeg_bytes = jpeg.len(), quality, "JPEG intermediate encoded");
        Ok(Self { image: decoded })
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, ConversionError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| ConversionError::ImageDecode(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn transparent_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = ImageProcessor::from_bytes(b"definitely not an image").err().unwrap();
        assert!(matches!(err, ConversionError::ImageDecode(_)));
    }

    #[test]
    fn transparency_becomes_white() {
        let rgb = ImageProcessor::from_bytes(&transparent_png(4, 4))
            .unwrap()
            .flatten_onto_white()
            .into_rgb8();
        assert!(rgb.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn half_alpha_blends() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let rgb = ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(img))
            .flatten_onto_white()
            .into_rgb8();
        let v = rgb.get_pixel(0, 0).0[0];
        assert!((126..=128).contains(&v), "{v}");
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(200, 100));
        let fitted = ImageProcessor::from_dynamic(img).fit_within(100.0, 100.0);
        assert_eq!((fitted.width(), fitted.height()), (100, 50));
    }

    #[test]
    fn small_images_scale_up_to_box() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 20));
        let processor = ImageProcessor::from_dynamic(img);
        assert_eq!(processor.fit_scale(100.0, 100.0), 5.0);
    }
}
