// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion orchestration: parse → (strict check) → render + attachments,
// then an optional merge into a single PDF.
//
// Parse errors surface as `Parse` and strict-mode rejections surface
// untouched. Everything that goes wrong after parsing is reported as
// `Conversion`. Attachment-local failures never get this far; the pipeline
// absorbs them.

use std::path::Path;
use std::time::Instant;

use mailpdf_core::error::{ConversionError, Result};
use mailpdf_core::{AppConfig, ConversionReport, ConversionResult, RequestId};
use tracing::{debug, info, instrument, warn};

use crate::attachment::{AttachmentPipeline, validate_strict};
use crate::msg::{MessageHandle, MessageParser, OutlookParser};
use crate::pdf::{self, DocumentRenderer, MessageRenderer};

/// Where a conversion call currently is. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Parsing,
    Validating,
    Rendering,
    Merging,
    Done,
    Failed,
}

fn enter(request_id: RequestId, stage: Stage) {
    debug!(%request_id, ?stage, "Conversion stage");
}

/// Closes the wrapped handle when dropped, on every exit path.
struct HandleGuard<H: MessageHandle>(H);

impl<H: MessageHandle> HandleGuard<H> {
    fn message(&self) -> &mailpdf_core::ParsedMessage {
        self.0.message()
    }
}

impl<H: MessageHandle> Drop for HandleGuard<H> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Turns a message file into a main PDF plus one PDF per usable attachment.
///
/// Holds only immutable settings; one converter can serve any number of
/// calls.
pub struct MessageConverter<P: MessageParser = OutlookParser, R: MessageRenderer = DocumentRenderer> {
    parser: P,
    renderer: R,
    pipeline: AttachmentPipeline,
}

impl MessageConverter<OutlookParser> {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_parser(OutlookParser::new(), config)
    }
}

impl Default for MessageConverter<OutlookParser> {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl<P: MessageParser> MessageConverter<P> {
    pub fn with_parser(parser: P, config: &AppConfig) -> Self {
        Self::with_renderer(parser, DocumentRenderer::from_config(config), config)
    }
}

impl<P: MessageParser, R: MessageRenderer> MessageConverter<P, R> {
    pub fn with_renderer(parser: P, renderer: R, config: &AppConfig) -> Self {
        Self {
            parser,
            renderer,
            pipeline: AttachmentPipeline::from_config(config),
        }
    }

    /// Parse `path` and produce the main PDF and the attachment PDFs.
    ///
    /// With `strict_mode`, any unsupported attachment fails the whole call
    /// with [`ConversionError::UnauthorizedAttachment`] before any output is
    /// produced.
    #[instrument(skip(self, path, request_id), fields(%request_id, path = %path.display()))]
    pub fn convert(
        &self,
        path: &Path,
        request_id: RequestId,
        strict_mode: bool,
    ) -> Result<ConversionResult> {
        let started = Instant::now();

        enter(request_id, Stage::Parsing);
        let handle = self.parser.parse(path).map_err(|err| {
            enter(request_id, Stage::Failed);
            warn!(%err, "Message could not be parsed");
            match err {
                ConversionError::Parse(_) => err,
                other => ConversionError::Parse(other.to_string()),
            }
        })?;
        let guard = HandleGuard(handle);
        let message = guard.message();

        if strict_mode {
            enter(request_id, Stage::Validating);
            if let Err(err) = validate_strict(&message.attachments) {
                enter(request_id, Stage::Failed);
                return Err(err);
            }
        }

        enter(request_id, Stage::Rendering);
        let main_pdf = self.renderer.render(message).map_err(|err| {
            enter(request_id, Stage::Failed);
            err.into_conversion_failure()
        })?;
        let processed = self.pipeline.process(&message.attachments, strict_mode);
        drop(guard);

        enter(request_id, Stage::Done);
        let report = ConversionReport {
            request_id,
            attachments: processed.outcomes,
            main_pdf_bytes: main_pdf.len(),
            elapsed: started.elapsed(),
        };
        info!(
            main_pdf_bytes = report.main_pdf_bytes,
            attachment_pdfs = processed.pdfs.len(),
            processed = report.processed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Conversion finished"
        );

        Ok(ConversionResult {
            main_pdf,
            attachment_pdfs: processed.pdfs,
            report,
        })
    }

    /// Append the attachment PDFs to the main PDF. Fails with
    /// [`ConversionError::Merge`] only when the main PDF itself is unusable.
    #[instrument(skip_all, fields(%request_id, attachments = attachment_pdfs.len()))]
    pub fn merge(
        &self,
        main_pdf: &[u8],
        attachment_pdfs: &[Vec<u8>],
        request_id: RequestId,
    ) -> Result<Vec<u8>> {
        enter(request_id, Stage::Merging);
        match pdf::merge(main_pdf, attachment_pdfs) {
            Ok(merged) => {
                enter(request_id, Stage::Done);
                Ok(merged)
            }
            Err(err) => {
                enter(request_id, Stage::Failed);
                Err(err)
            }
        }
    }

    /// [`convert`](Self::convert), then [`merge`](Self::merge) when `merge`
    /// is set. Returns the final PDF and the report; without merging the
    /// final PDF is the main PDF alone.
    pub fn convert_and_merge(
        &self,
        path: &Path,
        request_id: RequestId,
        strict_mode: bool,
        merge: bool,
    ) -> Result<(Vec<u8>, ConversionReport)> {
        let result = self.convert(path, request_id, strict_mode)?;
        if !merge {
            debug!(%request_id, "Merge not requested, returning main PDF");
            return Ok((result.main_pdf, result.report));
        }
        let merged = self.merge(&result.main_pdf, &result.attachment_pdfs, request_id)?;
        Ok((merged, result.report))
    }
}
