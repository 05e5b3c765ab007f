// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Message renderer: lays a parsed message out as a paginated PDF using
// `printpdf` 0.8.
//
// Rendering happens in two passes. First the message is turned into a story:
// an ordered list of blocks (title, metadata rows, body paragraphs, the
// attachment table). Then the paginator walks the story top to bottom,
// wrapping text and breaking pages, and emits one `PdfPage` per page.

use mailpdf_core::error::{ConversionError, Result};
use mailpdf_core::{AppConfig, PaperSize, ParsedMessage};
use printpdf::{Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg};
use tracing::{debug, info, instrument};

use crate::attachment::classify::type_label;
use crate::pdf::layout::{self, PageGeometry, Rgb3};
use crate::text::markup::{self, Span};
use crate::text::sanitize::{sanitize_with_width, wrap_line};
use crate::text::{DEFAULT_WRAP_WIDTH, format_metadata};

const DOCUMENT_TITLE: &str = "Outlook message";
const NO_CONTENT: &str = "No text content available";
const MARGIN_MM: f32 = 20.0;

/// Visual style of a paragraph block.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub leading: f32,
    pub color: Rgb3,
    pub indent: f32,
    pub space_after: f32,
}

impl TextStyle {
    pub const TITLE: TextStyle = TextStyle {
        size: 16.0,
        leading: 20.0,
        color: Rgb3::DARK_BLUE,
        indent: 0.0,
        space_after: 12.0,
    };
    pub const HEADING: TextStyle = TextStyle {
        size: 14.0,
        leading: 18.0,
        color: Rgb3::DARK_BLUE,
        indent: 0.0,
        space_after: 6.0,
    };
    pub const META: TextStyle = TextStyle {
        size: 10.0,
        leading: 13.0,
        color: Rgb3::DARK_GREY,
        indent: 0.0,
        space_after: 6.0,
    };
    pub const CONTENT: TextStyle = TextStyle {
        size: 11.0,
        leading: 14.0,
        color: Rgb3::BLACK,
        indent: 14.4,
        space_after: 12.0,
    };
}

/// A table with fixed column widths (points) and plain-text cells.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<(String, f32)>,
    pub rows: Vec<Vec<String>>,
}

/// One element of the story, in reading order.
#[derive(Debug, Clone)]
pub enum Block {
    /// Bold heading line.
    Heading { text: String, style: TextStyle },
    /// Flowing paragraph in inline markup (see [`crate::text::markup`]).
    Paragraph { markup: String, style: TextStyle },
    Spacer(f32),
    Table(Table),
}

/// Produces the main PDF for a parsed message.
pub trait MessageRenderer {
    fn render(&self, message: &ParsedMessage) -> Result<Vec<u8>>;
}

/// Renders a [`ParsedMessage`] into the main PDF.
pub struct DocumentRenderer {
    geometry: PageGeometry,
    wrap_width: usize,
}

impl DocumentRenderer {
    pub fn new(paper_size: PaperSize, wrap_width: usize) -> Self {
        Self {
            geometry: PageGeometry::new(paper_size, MARGIN_MM),
            wrap_width,
        }
    }

    pub fn a4() -> Self {
        Self::new(PaperSize::A4, DEFAULT_WRAP_WIDTH)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.paper_size, config.wrap_width)
    }

    /// Render the message. Missing optional fields never fail; only a broken
    /// PDF serialisation surfaces as [`ConversionError::Render`].
    #[instrument(skip_all, fields(attachments = message.attachments.len()))]
    pub fn render(&self, message: &ParsedMessage) -> Result<Vec<u8>> {
        let story = self.build_story(message);
        debug!(blocks = story.len(), "Story built");

        let pages = Paginator::new(self.geometry).run(story);
        let page_count = pages.len();

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        if !output.starts_with(b"%PDF") {
            return Err(ConversionError::Render(
                "serialised document has no PDF header".into(),
            ));
        }

        info!(pages = page_count, bytes = output.len(), "Main PDF rendered");
        Ok(output)
    }

    /// Turn the message into an ordered story of blocks.
    pub fn build_story(&self, message: &ParsedMessage) -> Vec<Block> {
        let mut story = Vec::new();
        self.push_header(&mut story, message);
        self.push_body(&mut story, message);
        self.push_attachment_table(&mut story, message);
        story
    }

    fn push_header(&self, story: &mut Vec<Block>, message: &ParsedMessage) {
        story.push(Block::Heading {
            text: DOCUMENT_TITLE.into(),
            style: TextStyle::TITLE,
        });
        for field in format_metadata(message) {
            story.push(Block::Paragraph {
                markup: markup::labelled(field.label, &field.value),
                style: TextStyle::META,
            });
        }
        story.push(Block::Spacer(14.0));
    }

    fn push_body(&self, story: &mut Vec<Block>, message: &ParsedMessage) {
        story.push(Block::Heading {
            text: "Content".into(),
            style: TextStyle::HEADING,
        });

        let cleaned = sanitize_with_width(message.body.as_deref(), self.wrap_width);
        let paragraphs: Vec<&str> = cleaned
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if paragraphs.is_empty() {
            story.push(Block::Paragraph {
                markup: markup::escape(NO_CONTENT),
                style: TextStyle {
                    color: Rgb3::GREY,
                    ..TextStyle::CONTENT
                },
            });
            return;
        }

        for paragraph in paragraphs {
            story.push(Block::Paragraph {
                markup: markup::escape(paragraph),
                style: TextStyle::CONTENT,
            });
        }
    }

    fn push_attachment_table(&self, story: &mut Vec<Block>, message: &ParsedMessage) {
        if message.attachments.is_empty() {
            return;
        }

        story.push(Block::Spacer(20.0));
        story.push(Block::Heading {
            text: "Attachments".into(),
            style: TextStyle::HEADING,
        });

        let fixed = 36.0 + 60.0 + 80.0;
        let name_width = (self.geometry.content_width() - fixed).max(60.0);
        let rows = message
            .attachments
            .iter()
            .enumerate()
            .map(|(index, attachment)| {
                let name = attachment.display_name(index);
                vec![
                    (index + 1).to_string(),
                    type_label(&name),
                    name,
                    human_size(attachment.size()),
                ]
            })
            .collect();

        story.push(Block::Table(Table {
            columns: vec![
                ("#".into(), 36.0),
                ("Type".into(), 60.0),
                ("File name".into(), name_width),
                ("Size".into(), 80.0),
            ],
            rows,
        }));
    }
}

impl MessageRenderer for DocumentRenderer {
    fn render(&self, message: &ParsedMessage) -> Result<Vec<u8>> {
        DocumentRenderer::render(self, message)
    }
}

/// Byte count as `N bytes`, `X.Y KB`, or `X.Y MB`.
pub fn human_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    if bytes < KIB {
        format!("{bytes} bytes")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

// -- Pagination ---------------------------------------------------------------

const CELL_PADDING: f32 = 4.0;
const TABLE_FONT: f32 = 10.0;
const TABLE_LEADING: f32 = 12.0;

/// Walks a story and produces pages. Owns the page being filled.
struct Paginator {
    geometry: PageGeometry,
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    /// Top of the free area on the current page, in PDF coordinates.
    y: f32,
}

impl Paginator {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            ops: Vec::new(),
            y: geometry.top(),
        }
    }

    fn run(mut self, story: Vec<Block>) -> Vec<PdfPage> {
        for block in story {
            match block {
                Block::Heading { text, style } => self.heading(&text, style),
                Block::Paragraph { markup, style } => self.paragraph(&markup, style),
                Block::Spacer(height) => self.spacer(height),
                Block::Table(table) => self.table(&table),
            }
        }
        self.finish()
    }

    fn at_page_top(&self) -> bool {
        self.y >= self.geometry.top()
    }

    fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(PdfPage::new(
            self.geometry.width_mm,
            self.geometry.height_mm,
            ops,
        ));
        self.y = self.geometry.top();
    }

    /// Start a new page unless `height` still fits. A fresh page always
    /// accepts the element, so oversized elements cannot loop forever.
    fn ensure(&mut self, height: f32) {
        if self.y - height < self.geometry.bottom() && !self.at_page_top() {
            self.break_page();
        }
    }

    fn spacer(&mut self, height: f32) {
        if self.y - height < self.geometry.bottom() {
            self.break_page();
        } else {
            self.y -= height;
        }
    }

    fn heading(&mut self, text: &str, style: TextStyle) {
        // Keep a heading with at least one following line.
        self.ensure(style.leading * 2.0);
        let baseline = self.y - style.size;
        layout::push_text(
            &mut self.ops,
            text,
            self.geometry.margin,
            baseline,
            style.size,
            true,
            style.color,
        );
        self.y -= style.leading + style.space_after;
    }

    fn paragraph(&mut self, markup: &str, style: TextStyle) {
        let width = self.geometry.content_width() - style.indent;
        for line in flow_words(&markup::parse(markup), width, style.size) {
            self.ensure(style.leading);
            let baseline = self.y - style.size;
            let mut x = self.geometry.margin + style.indent;
            for run in line {
                layout::push_text(
                    &mut self.ops,
                    &run.text,
                    x,
                    baseline,
                    style.size,
                    run.bold,
                    style.color,
                );
                x += layout::estimate_width(&run.text, style.size, run.bold)
                    + layout::char_width(style.size, false);
            }
            self.y -= style.leading;
        }
        self.y -= style.space_after;
    }

    fn table(&mut self, table: &Table) {
        self.table_row(&table.columns, None, true);
        for row in &table.rows {
            let height = row_height(&table.columns, row);
            if self.y - height < self.geometry.bottom() {
                self.break_page();
                self.table_row(&table.columns, None, true);
            }
            self.table_row(&table.columns, Some(row), false);
        }
    }

    /// Draw one row. With `cells == None` the column titles are drawn.
    fn table_row(&mut self, columns: &[(String, f32)], cells: Option<&Vec<String>>, header: bool) {
        let texts: Vec<String> = match cells {
            Some(cells) => cells.clone(),
            None => columns.iter().map(|(title, _)| title.clone()).collect(),
        };
        let height = row_height(columns, &texts);
        self.ensure(height);

        let (fill, text_color) = if header {
            (Rgb3::GREY, Rgb3::WHITE_SMOKE)
        } else {
            (Rgb3::BEIGE, Rgb3::BLACK)
        };

        let top = self.y;
        let mut x = self.geometry.margin;
        for ((_, width), text) in columns.iter().zip(&texts) {
            layout::push_fill_rect(&mut self.ops, x, top, *width, height, fill);
            layout::push_stroke_rect(&mut self.ops, x, top, *width, height, 1.0);
            for (i, line) in wrap_cell(text, *width, header).iter().enumerate() {
                let baseline = top - CELL_PADDING - TABLE_FONT - i as f32 * TABLE_LEADING;
                layout::push_text(
                    &mut self.ops,
                    line,
                    x + CELL_PADDING,
                    baseline,
                    TABLE_FONT,
                    header,
                    text_color,
                );
            }
            x += width;
        }
        self.y -= height;
    }

    fn finish(mut self) -> Vec<PdfPage> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

fn row_height(columns: &[(String, f32)], cells: &[String]) -> f32 {
    let lines = columns
        .iter()
        .zip(cells)
        .map(|((_, width), text)| wrap_cell(text, *width, false).len())
        .max()
        .unwrap_or(1)
        .max(1);
    lines as f32 * TABLE_LEADING + 2.0 * CELL_PADDING
}

/// Wrap cell text to the column, hard-splitting words that cannot fit.
fn wrap_cell(text: &str, width: f32, bold: bool) -> Vec<String> {
    let capacity = layout::chars_per_width(width - 2.0 * CELL_PADDING, TABLE_FONT, bold);
    let mut lines = Vec::new();
    for line in wrap_line(text, capacity) {
        let chars: Vec<char> = line.chars().collect();
        lines.extend(chars.chunks(capacity).map(|chunk| chunk.iter().collect::<String>()));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Greedy line filling over styled words. Each output line is a list of runs
/// (consecutive words sharing a style, joined by single spaces).
fn flow_words(spans: &[Span], width: f32, size: f32) -> Vec<Vec<Span>> {
    let space = layout::char_width(size, false);
    let mut lines: Vec<Vec<Span>> = Vec::new();
    let mut line: Vec<Span> = Vec::new();
    let mut line_width = 0.0f32;

    let words = spans.iter().flat_map(|span| {
        span.text
            .split_whitespace()
            .map(move |word| (word, span.bold))
    });

    for (word, bold) in words {
        let word_width = layout::estimate_width(word, size, bold);
        let needed = if line.is_empty() {
            word_width
        } else {
            line_width + space + word_width
        };

        if !line.is_empty() && needed > width {
            lines.push(std::mem::take(&mut line));
            line_width = word_width;
        } else {
            line_width = needed;
        }

        match line.last_mut() {
            Some(run) if run.bold == bold => {
                run.text.push(' ');
                run.text.push_str(word);
            }
            _ => line.push(Span {
                text: word.to_owned(),
                bold,
            }),
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
