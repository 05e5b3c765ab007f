// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attachment classification by filename extension.

use mailpdf_core::AttachmentDisposition;

/// Extension → disposition. Anything absent from the table is unsupported.
const EXTENSION_TABLE: &[(&str, AttachmentDisposition)] = &[
    ("pdf", AttachmentDisposition::PdfPassthrough),
    ("jpg", AttachmentDisposition::ImageConvert),
    ("jpeg", AttachmentDisposition::ImageConvert),
    ("png", AttachmentDisposition::ImageConvert),
    ("gif", AttachmentDisposition::ImageConvert),
    ("bmp", AttachmentDisposition::ImageConvert),
    ("tiff", AttachmentDisposition::ImageConvert),
    ("tif", AttachmentDisposition::ImageConvert),
    ("webp", AttachmentDisposition::ImageConvert),
];

/// Lowercased text after the last dot, if any.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim_end_matches('\0').trim())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Decide how an attachment is handled from its name alone.
pub fn classify(filename: &str) -> AttachmentDisposition {
    let Some(ext) = extension(filename) else {
        return AttachmentDisposition::Unsupported;
    };
    EXTENSION_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, disposition)| *disposition)
        .unwrap_or(AttachmentDisposition::Unsupported)
}

pub fn is_supported(filename: &str) -> bool {
    classify(filename).is_supported()
}

/// Coarse type column for the attachment summary table.
pub fn type_label(filename: &str) -> String {
    match classify(filename) {
        AttachmentDisposition::PdfPassthrough => "PDF".into(),
        AttachmentDisposition::ImageConvert => "Image".into(),
        AttachmentDisposition::Unsupported => extension(filename)
            .map(|ext| ext.to_ascii_uppercase())
            .unwrap_or_else(|| "FILE".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_passes_through() {
        assert_eq!(classify("report.pdf"), AttachmentDisposition::PdfPassthrough);
        assert_eq!(classify("REPORT.PDF"), AttachmentDisposition::PdfPassthrough);
    }

    #[test]
    fn every_image_extension_converts() {
        for ext in ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"] {
            assert_eq!(
                classify(&format!("photo.{ext}")),
                AttachmentDisposition::ImageConvert,
                "{ext}"
            );
            assert_eq!(
                classify(&format!("photo.{}", ext.to_uppercase())),
                AttachmentDisposition::ImageConvert
            );
        }
    }

    #[test]
    fn everything_else_is_unsupported() {
        for name in ["notes.txt", "budget.xlsx", "README", "trailing.", "", "archive.pdf.zip"] {
            assert_eq!(classify(name), AttachmentDisposition::Unsupported, "{name:?}");
            assert!(!is_supported(name));
        }
    }

    #[test]
    fn labels() {
        assert_eq!(type_label("a.pdf"), "PDF");
        assert_eq!(type_label("a.PNG"), "Image");
        assert_eq!(type_label("a.docx"), "DOCX");
        assert_eq!(type_label("Makefile"), "FILE");
    }
}
