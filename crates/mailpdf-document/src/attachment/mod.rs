// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attachment module: classification, strict policy, and conversion to PDF.

pub mod classify;
pub mod pipeline;
pub mod strict;

pub use classify::{classify, is_supported};
pub use pipeline::{AttachmentPipeline, ProcessedAttachments};
pub use strict::validate_strict;
