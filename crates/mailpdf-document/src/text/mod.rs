// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text module: body sanitisation, header formatting, and paragraph markup.

pub mod markup;
pub mod metadata;
pub mod sanitize;

pub use metadata::{MetadataField, format_metadata};
pub use sanitize::{DEFAULT_WRAP_WIDTH, sanitize, sanitize_with_width};
