// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decode, flatten, fit, and place images on a PDF page.

pub mod processor;
pub mod rasterizer;

pub use processor::ImageProcessor;
pub use rasterizer::ImageRasterizer;
