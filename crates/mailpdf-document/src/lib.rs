// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mailpdf-document: Outlook message to PDF conversion.
//
// Renders the message headers and body into a main PDF, turns PDF and image
// attachments into PDFs of their own, and optionally merges everything into
// one document.

pub mod attachment;
pub mod convert;
pub mod image;
pub mod msg;
pub mod pdf;
pub mod text;

// Re-export the primary entry points so callers can use `mailpdf_document::MessageConverter` etc.
pub use attachment::{AttachmentPipeline, ProcessedAttachments, classify, is_supported, validate_strict};
pub use convert::MessageConverter;
pub use self::image::{ImageProcessor, ImageRasterizer};
pub use msg::{MessageHandle, MessageParser, OutlookHandle, OutlookParser};
pub use pdf::{DocumentRenderer, MessageRenderer, merge, page_count};
pub use text::{format_metadata, sanitize};
