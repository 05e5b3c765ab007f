// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image attachment → single-page PDF.

use mailpdf_core::error::{ConversionError, Result};
use mailpdf_core::{AppConfig, PaperSize};
use printpdf::{
    Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use super::processor::ImageProcessor;
use crate::pdf::layout::{self, PageGeometry, Rgb3};

const MARGIN_MM: f32 = 15.0;
const TITLE_SIZE: f32 = 12.0;
/// Vertical space reserved for the filename line above the image.
const TITLE_BAND: f32 = 24.0;
const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Converts raster images into one-page PDF documents.
pub struct ImageRasterizer {
    geometry: PageGeometry,
    jpeg_quality: u8,
}

impl ImageRasterizer {
    pub fn new(paper_size: PaperSize, jpeg_quality: u8) -> Self {
        Self {
            geometry: PageGeometry::new(paper_size, MARGIN_MM),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn a4() -> Self {
        Self::new(PaperSize::A4, DEFAULT_JPEG_QUALITY)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.paper_size, config.jpeg_quality)
    }

    /// Area available to the image, in points: below the title band,
    /// inside the margins.
    fn image_box(&self) -> (f32, f32) {
        let g = &self.geometry;
        (g.content_width(), g.height - 2.0 * g.margin - TITLE_BAND)
    }

    /// Decode `image_bytes` and lay it out on one page under a title line
    /// showing `display_name`.
    ///
    /// Fails with [`ConversionError::ImageDecode`] when the bytes are not a
    /// supported raster format.
    #[instrument(skip(self, image_bytes), fields(bytes_len = image_bytes.len()))]
    pub fn rasterize(&self, image_bytes: &[u8], display_name: &str) -> Result<Vec<u8>> {
        let (box_w, box_h) = self.image_box();

        let rgb = ImageProcessor::from_bytes(image_bytes)?
            .flatten_onto_white()
            .fit_within(box_w, box_h)
            .jpeg_roundtrip(self.jpeg_quality)?
            .into_rgb8();

        let (px_w, px_h) = (rgb.width(), rgb.height());
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: px_w as usize,
            height: px_h as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(display_name);
        let xobject_id = doc.add_image(&raw);

        let g = self.geometry;
        let mut ops: Vec<Op> = Vec::new();
        layout::push_text(
            &mut ops,
            display_name,
            g.margin,
            g.top() - TITLE_SIZE,
            TITLE_SIZE,
            true,
            Rgb3::BLACK,
        );

        // At 72 dpi one pixel is one point, so the resized image already has
        // its final on-page size.
        let img_w = px_w as f32;
        let img_h = px_h as f32;
        let x_offset = g.margin + (box_w - img_w).max(0.0) / 2.0;
        let y_offset = g.top() - TITLE_BAND - img_h;

        ops.push(Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_offset)),
                translate_y: Some(Pt(y_offset)),
                scale_x: None,
                scale_y: None,
                dpi: Some(72.0),
                rotate: None,
            },
        });

        doc.with_pages(vec![PdfPage::new(g.width_mm, g.height_mm, ops)]);
        debug!(img_w, img_h, x_offset, y_offset, "Image placed on page");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !output.starts_with(b"%PDF") {
            return Err(ConversionError::Render(format!(
                "image page for {display_name} has no PDF header"
            )));
        }

        info!(display_name, bytes = output.len(), "Image converted to PDF");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    use super::*;
    use crate::pdf::reader::page_count;

    fn png_with_alpha() -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(64, 32, Rgba([0, 0, 0, 0]));
        for x in 0..32 {
            img.put_pixel(x, 16, Rgba([200, 10, 10, 255]));
        }
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn transparent_png_gives_one_page() {
        let pdf = ImageRasterizer::a4().rasterize(&png_with_alpha(), "photo.png").unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(page_count(&pdf).unwrap(), 1);
    }

    #[test]
    fn gif_and_bmp_decode() {
        for format in [ImageFormat::Gif, ImageFormat::Bmp] {
            let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])));
            let mut buffer = Vec::new();
            img.write_to(&mut std::io::Cursor::new(&mut buffer), format).unwrap();
            let pdf = ImageRasterizer::a4().rasterize(&buffer, "x").unwrap();
            assert_eq!(page_count(&pdf).unwrap(), 1, "{format:?}");
        }
    }

    #[test]
    fn undecodable_bytes_fail() {
        let err = ImageRasterizer::a4()
            .rasterize(b"GIF89a but not really", "broken.gif")
            .unwrap_err();
        assert!(matches!(err, ConversionError::ImageDecode(_)));
    }

    #[test]
    fn box_excludes_title_band() {
        let rasterizer = ImageRasterizer::a4();
        let (w, h) = rasterizer.image_box();
        assert!(w < rasterizer.geometry.width);
        assert!(h < rasterizer.geometry.height - TITLE_BAND);
    }
}
