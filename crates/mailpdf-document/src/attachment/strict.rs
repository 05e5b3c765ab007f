// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strict attachment policy: reject the whole conversion if any attachment
// falls outside the supported set.

use mailpdf_core::RawAttachment;
use mailpdf_core::error::{ConversionError, Result};
use tracing::{debug, warn};

use super::classify::is_supported;

/// Pass/fail check over every attachment. Performs no transformation.
pub fn validate_strict(attachments: &[RawAttachment]) -> Result<()> {
    if attachments.is_empty() {
        debug!("No attachments, strict validation skipped");
        return Ok(());
    }

    let rejected: Vec<String> = attachments
        .iter()
        .enumerate()
        .map(|(index, attachment)| attachment.display_name(index))
        .filter(|name| !is_supported(name))
        .collect();

    if rejected.is_empty() {
        debug!(count = attachments.len(), "All attachments allowed");
        return Ok(());
    }

    warn!(rejected = ?rejected, "Strict mode rejected attachments");
    Err(ConversionError::UnauthorizedAttachment { filenames: rejected })
}
