// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry and low-level drawing ops shared by the message renderer and
// the image rasterizer.
//
// printpdf places the origin at the bottom-left of the page. Everything here
// takes PDF coordinates in points; callers track their own top-down cursor.

use mailpdf_core::PaperSize;
use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PaintMode, Point, Polygon, PolygonRing, Pt, Rgb,
    TextItem, WindingOrder,
};

/// Printable area of a page, in points.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub width_mm: Mm,
    pub height_mm: Mm,
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub fn new(paper_size: PaperSize, margin_mm: f32) -> Self {
        let (w_mm, h_mm) = paper_size.dimensions_mm();
        let width_mm = Mm(w_mm as f32);
        let height_mm = Mm(h_mm as f32);
        Self {
            width_mm,
            height_mm,
            width: width_mm.into_pt().0,
            height: height_mm.into_pt().0,
            margin: Mm(margin_mm).into_pt().0,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Y of the first baseline region (top margin).
    pub fn top(&self) -> f32 {
        self.height - self.margin
    }

    pub fn bottom(&self) -> f32 {
        self.margin
    }
}

/// RGB colour with 0..1 components.
#[derive(Debug, Clone, Copy)]
pub struct Rgb3(pub f32, pub f32, pub f32);

impl Rgb3 {
    pub const BLACK: Rgb3 = Rgb3(0.0, 0.0, 0.0);
    pub const WHITE_SMOKE: Rgb3 = Rgb3(0.96, 0.96, 0.96);
    pub const DARK_BLUE: Rgb3 = Rgb3(0.0, 0.0, 0.55);
    pub const DARK_GREY: Rgb3 = Rgb3(0.33, 0.33, 0.33);
    pub const GREY: Rgb3 = Rgb3(0.5, 0.5, 0.5);
    pub const BEIGE: Rgb3 = Rgb3(0.96, 0.96, 0.86);

    fn color(self) -> Color {
        Color::Rgb(Rgb {
            r: self.0,
            g: self.1,
            b: self.2,
            icc_profile: None,
        })
    }
}

/// Approximate advance width of one character. Helvetica averages roughly
/// half the font size; the bold cut runs a little wider.
pub fn char_width(font_size: f32, bold: bool) -> f32 {
    if bold {
        0.55 * font_size
    } else {
        0.50 * font_size
    }
}

/// How many characters fit in `width` points.
pub fn chars_per_width(width: f32, font_size: f32, bold: bool) -> usize {
    ((width / char_width(font_size, bold)) as usize).max(1)
}

pub fn estimate_width(text: &str, font_size: f32, bold: bool) -> f32 {
    text.chars().count() as f32 * char_width(font_size, bold)
}

/// Replace characters the builtin fonts cannot show.
///
/// Builtin PDF fonts only cover Latin-1; anything outside becomes `?` and a
/// few typographic characters are folded to ASCII.
pub fn printable(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) < 0x100 => c,
            _ => '?',
        })
        .collect()
}

/// Emit one line of text with its baseline at `(x, y)`.
pub fn push_text(
    ops: &mut Vec<Op>,
    text: &str,
    x: f32,
    y: f32,
    font_size: f32,
    bold: bool,
    color: Rgb3,
) {
    if text.is_empty() {
        return;
    }
    let font = if bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    };
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(font_size),
        font,
    });
    ops.push(Op::SetFillColor { col: color.color() });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(printable(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

fn corner(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Filled rectangle with its top-left corner at `(x, top)`.
pub fn push_fill_rect(ops: &mut Vec<Op>, x: f32, top: f32, width: f32, height: f32, fill: Rgb3) {
    let bottom = top - height;
    ops.push(Op::SetFillColor { col: fill.color() });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    corner(x, bottom),
                    corner(x + width, bottom),
                    corner(x + width, top),
                    corner(x, top),
                ],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

/// Rectangle outline with its top-left corner at `(x, top)`.
pub fn push_stroke_rect(ops: &mut Vec<Op>, x: f32, top: f32, width: f32, height: f32, thickness: f32) {
    let bottom = top - height;
    ops.push(Op::SetOutlineColor {
        col: Rgb3::BLACK.color(),
    });
    ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![
                corner(x, top),
                corner(x + width, top),
                corner(x + width, bottom),
                corner(x, bottom),
            ],
            is_closed: true,
        },
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_in_points() {
        let geometry = PageGeometry::new(PaperSize::A4, 20.0);
        assert!((geometry.width - 595.3).abs() < 1.0);
        assert!((geometry.height - 841.9).abs() < 1.0);
        assert!(geometry.content_width() < geometry.width);
    }

    #[test]
    fn non_latin_is_replaced() {
        assert_eq!(printable("caf\u{e9} \u{2014} \u{4e2d}"), "caf\u{e9} - ?");
    }
}
