// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: render the message page, merge attachment PDFs.

pub mod layout;
pub mod reader;
pub mod writer;

pub use reader::{merge, page_count};
pub use writer::{DocumentRenderer, MessageRenderer};
