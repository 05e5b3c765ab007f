// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Message parsing seam. The converter only sees these traits; the shipped
// implementation reads Outlook .msg compound files.

use std::path::Path;

use mailpdf_core::ParsedMessage;
use mailpdf_core::error::Result;

pub mod reader;

pub use reader::{OutlookHandle, OutlookParser};

/// An open parsed message. The holder must call [`MessageHandle::close`]
/// exactly once when done with it.
pub trait MessageHandle {
    fn message(&self) -> &ParsedMessage;

    /// Release whatever the parser holds for this message.
    fn close(&mut self);
}

/// Produces a [`MessageHandle`] from a file on disk.
pub trait MessageParser {
    type Handle: MessageHandle;

    /// Fails with `ConversionError::Parse` on unreadable or malformed input.
    fn parse(&self, path: &Path) -> Result<Self::Handle>;
}
