// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the mailpdf conversion pipeline.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one conversion call, carried through every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Send date of a message as the parser found it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageDate {
    /// A timestamp the parser could decode.
    Structured(DateTime<FixedOffset>),
    /// A free-form value passed through verbatim.
    Text(String),
}

/// A message as produced by the parser collaborator. Read-only to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub sender: Option<String>,
    /// Display list of primary recipients.
    pub to: Option<String>,
    pub cc: Option<String>,
    pub subject: Option<String>,
    pub date: Option<MessageDate>,
    pub body: Option<String>,
    pub attachments: Vec<RawAttachment>,
}

/// One attachment exactly as stored in the message container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttachment {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub data: Option<Vec<u8>>,
}

impl RawAttachment {
    /// Convenience constructor used by tests and in-memory callers.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            long_name: Some(name.into()),
            short_name: None,
            data: Some(data.into()),
        }
    }

    /// Payload bytes, empty when the container carried none.
    pub fn payload(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.payload().len()
    }

    /// Name shown to users and used for classification.
    ///
    /// Long name, then short name, then `attachment_<index>`. Trailing NUL
    /// padding and surrounding whitespace are stripped; a name that is empty
    /// after stripping falls through to the next candidate.
    pub fn display_name(&self, index: usize) -> String {
        [self.long_name.as_deref(), self.short_name.as_deref()]
            .into_iter()
            .flatten()
            .map(clean_name)
            .find(|name| !name.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("attachment_{index}"))
    }
}

fn clean_name(raw: &str) -> &str {
    raw.trim_end_matches('\0').trim()
}

/// How an attachment is handled, decided from its filename extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentDisposition {
    /// Already a PDF; appended verbatim.
    PdfPassthrough,
    /// Raster image converted to a one-page PDF.
    ImageConvert,
    /// Anything else; dropped, or rejected under strict mode.
    Unsupported,
}

impl AttachmentDisposition {
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// What the attachment pipeline did with one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentOutcome {
    /// A PDF was produced and will be merged.
    Included(AttachmentDisposition),
    /// Supported type but no payload.
    SkippedEmpty,
    /// Type outside the supported set.
    SkippedUnsupported,
    /// Conversion failed; the attachment was left out.
    Failed(String),
}

/// Per-call telemetry, returned alongside the PDFs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    pub request_id: RequestId,
    pub attachments: Vec<(String, AttachmentOutcome)>,
    pub main_pdf_bytes: usize,
    pub elapsed: Duration,
}

impl ConversionReport {
    /// Attachments that made it into the output. Failed conversions do not count.
    pub fn processed(&self) -> usize {
        self.attachments
            .iter()
            .filter(|(_, outcome)| matches!(outcome, AttachmentOutcome::Included(_)))
            .count()
    }
}

/// Output of a conversion call. The pipeline keeps no reference to it.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub main_pdf: Vec<u8>,
    pub attachment_pdfs: Vec<Vec<u8>>,
    pub report: ConversionReport,
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}
