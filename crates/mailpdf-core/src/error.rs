// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for mailpdf.

use thiserror::Error;

/// Accepted attachment types, as shown to the caller on a strict-mode rejection.
pub const ACCEPTED_TYPES: &str = "PDF and images (JPG, JPEG, PNG, GIF, BMP, TIFF, TIF, WEBP)";

/// Top-level error type for all conversion operations.
#[derive(Debug, Error)]
pub enum ConversionError {
    // -- Call-level failures --
    #[error("failed to parse message: {0}")]
    Parse(String),

    #[error(
        "unauthorized attachment(s): {}. Accepted types: {}",
        filenames.join(", "),
        ACCEPTED_TYPES
    )]
    UnauthorizedAttachment { filenames: Vec<String> },

    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("PDF merge failed: {0}")]
    Merge(String),

    #[error("conversion failed: {0}")]
    Conversion(String),

    // -- Attachment-local failures --
    #[error("image decoding failed: {0}")]
    ImageDecode(String),

    // -- Environment --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless view of a [`ConversionError`], handy for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ParseFailure,
    UnauthorizedAttachment,
    RenderFailure,
    MergeFailure,
    ConversionFailure,
    ImageDecodeFailure,
    Config,
    Io,
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::ParseFailure,
            Self::UnauthorizedAttachment { .. } => ErrorKind::UnauthorizedAttachment,
            Self::Render(_) => ErrorKind::RenderFailure,
            Self::Merge(_) => ErrorKind::MergeFailure,
            Self::Conversion(_) => ErrorKind::ConversionFailure,
            Self::ImageDecode(_) => ErrorKind::ImageDecodeFailure,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Wrap a failure raised while rendering into [`ConversionError::Conversion`].
    ///
    /// Strict-mode rejections and parse failures keep their identity; callers
    /// rely on telling a policy rejection apart from an internal fault.
    pub fn into_conversion_failure(self) -> Self {
        match self {
            Self::UnauthorizedAttachment { .. } | Self::Parse(_) | Self::Conversion(_) => self,
            other => Self::Conversion(other.to_string()),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_message_lists_every_file() {
        let err = ConversionError::UnauthorizedAttachment {
            filenames: vec!["notes.txt".into(), "budget.xlsx".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("notes.txt, budget.xlsx"));
        assert!(msg.contains(ACCEPTED_TYPES));
    }

    #[test]
    fn render_failure_is_wrapped() {
        let err = ConversionError::Render("font table missing".into()).into_conversion_failure();
        assert_eq!(err.kind(), ErrorKind::ConversionFailure);
        assert!(err.to_string().contains("font table missing"));
    }

    #[test]
    fn unauthorized_is_never_wrapped() {
        let err = ConversionError::UnauthorizedAttachment {
            filenames: vec!["a.exe".into()],
        }
        .into_conversion_failure();
        assert_eq!(err.kind(), ErrorKind::UnauthorizedAttachment);
    }
}
