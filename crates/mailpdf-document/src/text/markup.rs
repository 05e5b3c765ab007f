// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inline paragraph markup understood by the layout engine.
//
// Paragraph text is a tiny markup language: `<b>…</b>` toggles bold and the
// entities `&amp;`, `&lt;`, `&gt;` stand for the literal characters. Anything
// taken from a message must go through `escape` before it is placed in a
// paragraph, otherwise a body containing `<b>` would restyle the document.

/// A run of text with uniform style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

/// Escape `&`, `<`, `>` so the text renders literally.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Build a bold-label row such as `<b>From:</b> alice@example.com`.
pub fn labelled(label: &str, value: &str) -> String {
    format!("<b>{}:</b> {}", escape(label), escape(value))
}

/// Parse markup into styled spans. Unknown tags and entities pass through as text.
pub fn parse(markup: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut current = String::new();
    let mut bold = false;
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        if let Some((toggle, len)) = tag_at(rest) {
            if toggle != bold {
                push_span(&mut spans, std::mem::take(&mut current), bold);
                bold = toggle;
            }
            rest = &rest[len..];
            continue;
        }
        if let Some((ch, len)) = entity_at(rest) {
            current.push(ch);
            rest = &rest[len..];
            continue;
        }
        current.push(c);
        rest = &rest[c.len_utf8()..];
    }
    push_span(&mut spans, current, bold);
    spans
}

fn tag_at(s: &str) -> Option<(bool, usize)> {
    if s.starts_with("<b>") {
        Some((true, 3))
    } else if s.starts_with("</b>") {
        Some((false, 4))
    } else {
        None
    }
}

fn entity_at(s: &str) -> Option<(char, usize)> {
    [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>')]
        .into_iter()
        .find(|(entity, _)| s.starts_with(entity))
        .map(|(entity, ch)| (ch, entity.len()))
}

fn push_span(spans: &mut Vec<Span>, text: String, bold: bool) {
    if !text.is_empty() {
        spans.push(Span { text, bold });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_then_parse_is_literal() {
        let body = "if a < b && c > d then <b>shout</b>";
        let spans = parse(&escape(body));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, body);
        assert!(!spans[0].bold);
    }

    #[test]
    fn label_is_bold() {
        let spans = parse(&labelled("Subject", "R&D <update>"));
        assert_eq!(
            spans,
            vec![
                Span {
                    text: "Subject:".into(),
                    bold: true
                },
                Span {
                    text: " R&D <update>".into(),
                    bold: false
                },
            ]
        );
    }

    #[test]
    fn stray_ampersand_passes_through() {
        let spans = parse("fish & chips");
        assert_eq!(spans[0].text, "fish & chips");
    }
}
