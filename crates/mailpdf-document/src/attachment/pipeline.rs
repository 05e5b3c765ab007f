// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attachment pipeline: turn each supported attachment into a PDF, in order.

use mailpdf_core::{AppConfig, AttachmentDisposition, AttachmentOutcome, RawAttachment};
use tracing::{debug, error, info, instrument, warn};

use super::classify::classify;
use crate::image::ImageRasterizer;

/// PDFs produced from a message's attachments, with what happened to each.
#[derive(Debug, Default)]
pub struct ProcessedAttachments {
    /// Attachment-derived PDFs in original attachment order.
    pub pdfs: Vec<Vec<u8>>,
    /// One entry per input attachment, keyed by display name.
    pub outcomes: Vec<(String, AttachmentOutcome)>,
}

pub struct AttachmentPipeline {
    rasterizer: ImageRasterizer,
}

impl AttachmentPipeline {
    pub fn new(rasterizer: ImageRasterizer) -> Self {
        Self { rasterizer }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ImageRasterizer::from_config(config))
    }

    /// Convert attachments to PDFs.
    ///
    /// Problems with a single attachment never fail the call: empty payloads,
    /// unsupported types and images that do not decode are recorded and
    /// skipped. Under `strict_mode` the caller must already have rejected
    /// unsupported attachments.
    #[instrument(skip(self, attachments), fields(count = attachments.len()))]
    pub fn process(&self, attachments: &[RawAttachment], strict_mode: bool) -> ProcessedAttachments {
        let mut processed = ProcessedAttachments::default();

        for (index, attachment) in attachments.iter().enumerate() {
            let name = attachment.display_name(index);
            let outcome = self.process_one(attachment, &name, strict_mode);
            if let Some(pdf) = outcome.1 {
                processed.pdfs.push(pdf);
            }
            processed.outcomes.push((name, outcome.0));
        }

        info!(
            total = attachments.len(),
            converted = processed.pdfs.len(),
            "Attachments processed"
        );
        processed
    }

    fn process_one(
        &self,
        attachment: &RawAttachment,
        name: &str,
        strict_mode: bool,
    ) -> (AttachmentOutcome, Option<Vec<u8>>) {
        let disposition = classify(name);
        let payload = attachment.payload();

        match disposition {
            AttachmentDisposition::Unsupported => {
                if strict_mode {
                    error!(name, "Unsupported attachment reached the pipeline in strict mode");
                    debug_assert!(false, "strict validation must run before the pipeline");
                }
                debug!(name, "Unsupported attachment dropped");
                (AttachmentOutcome::SkippedUnsupported, None)
            }
            _ if payload.is_empty() => {
                warn!(name, "Attachment has no data, skipped");
                (AttachmentOutcome::SkippedEmpty, None)
            }
            AttachmentDisposition::PdfPassthrough => {
                debug!(name, bytes = payload.len(), "PDF attachment passed through");
                (AttachmentOutcome::Included(disposition), Some(payload.to_vec()))
            }
            AttachmentDisposition::ImageConvert => match self.rasterizer.rasterize(payload, name) {
                Ok(pdf) => (AttachmentOutcome::Included(disposition), Some(pdf)),
                Err(err) => {
                    warn!(name, %err, "Image attachment could not be converted, skipped");
                    (AttachmentOutcome::Failed(err.to_string()), None)
                }
            },
        }
    }
}

impl Default for AttachmentPipeline {
    fn default() -> Self {
        Self::new(ImageRasterizer::a4())
    }
}
