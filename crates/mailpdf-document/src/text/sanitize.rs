// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Body text sanitiser: strips control characters, normalises whitespace and
// blank-line runs, and word-wraps long lines so the layout engine never sees
// anything it cannot place.

/// Default maximum line width, in characters.
pub const DEFAULT_WRAP_WIDTH: usize = 80;

/// Blank-line runs longer than this collapse to a single blank line.
const MAX_BLANK_RUN: usize = 2;

/// Sanitise message body text with the default wrap width.
pub fn sanitize(text: Option<&str>) -> String {
    sanitize_with_width(text, DEFAULT_WRAP_WIDTH)
}

/// Sanitise message body text, wrapping at `width` characters.
///
/// Never fails: malformed input degrades to best-effort output, and the
/// result is a fixed point (`sanitize(sanitize(x)) == sanitize(x)`).
pub fn sanitize_with_width(text: Option<&str>, width: usize) -> String {
    let Some(text) = text else {
        return String::new();
    };
    if text.is_empty() {
        return String::new();
    }

    let width = width.max(1);
    let stripped = strip_controls(text);

    let mut out: Vec<String> = Vec::new();
    let mut blank_run = 0usize;

    for raw_line in stripped.split('\n') {
        let line = collapse_spaces(raw_line);
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }

        // Leading blank lines are dropped; interior runs are capped.
        if !out.is_empty() {
            flush_blank_run(&mut out, blank_run);
        }
        blank_run = 0;

        if line.chars().count() > width {
            out.extend(wrap_line(&line, width));
        } else {
            out.push(line);
        }
    }

    out.join("\n")
}

/// Drop control characters below U+0020 except tab and line breaks, and turn
/// CRLF / lone CR into LF.
fn strip_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\n' | '\t' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

/// Collapse every run of spaces and tabs to one space.
fn collapse_spaces(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_run = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn flush_blank_run(out: &mut Vec<String>, run: usize) {
    let emitted = if run > MAX_BLANK_RUN { 1 } else { run };
    out.extend(std::iter::repeat_n(String::new(), emitted));
}

/// Greedy word packing. A word wider than `width` goes on its own line whole.
///
/// Only ASCII spaces are break points; no-break spaces stay inside their word.
pub(crate) fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in line.split([' ', '\t']).filter(|word| !word.is_empty()) {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_give_empty() {
        assert_eq!(sanitize(None), "");
        assert_eq!(sanitize(Some("")), "");
    }

    #[test]
    fn strips_controls_but_keeps_tab_and_newline() {
        let cleaned = sanitize(Some("Normal text\x00\x01\x02\nsecond\tline\x1b"));
        assert_eq!(cleaned, "Normal text\nsecond line");
        assert!(cleaned.chars().all(|c| c as u32 >= 0x20 || c == '\n'));
    }

    #[test]
    fn crlf_becomes_lf() {
        assert_eq!(sanitize(Some("Hello\r\n\r\nWorld\r")), "Hello\n\nWorld");
    }

    #[test]
    fn collapses_space_runs() {
        assert_eq!(sanitize(Some("a  \t  b\t\tc")), "a b c");
    }

    #[test]
    fn long_blank_runs_collapse_to_one() {
        assert_eq!(sanitize(Some("a\n\n\n\n\nb")), "a\n\nb");
        // Three blank lines are the shortest run that collapses.
        assert_eq!(sanitize(Some("a\n\n\n\nb")), "a\n\nb");
        assert_eq!(sanitize(Some("a\r\n \r\n\t\r\n\r\nb")), "a\n\nb");
        // One or two blank lines are left alone.
        assert_eq!(sanitize(Some("a\n\nb")), "a\n\nb");
        assert_eq!(sanitize(Some("a\n\n\nb")), "a\n\n\nb");
    }

    #[test]
    fn no_break_space_is_not_a_wrap_point() {
        let glued = format!("{}\u{a0}{}", "a".repeat(50), "b".repeat(50));
        assert_eq!(sanitize(Some(&glued)), glued);

        let mixed = format!("{} {}\u{3000}{}", "x".repeat(60), "y".repeat(30), "z".repeat(30));
        let lines: Vec<String> = sanitize(Some(&mixed)).lines().map(String::from).collect();
        assert_eq!(lines, vec!["x".repeat(60), format!("{}\u{3000}{}", "y".repeat(30), "z".repeat(30))]);
    }

    #[test]
    fn wraps_long_lines_within_width() {
        let line = "Very long line that exceeds the maximum length limit and should be split \
                    into multiple lines for better readability in the PDF document";
        let cleaned = sanitize(Some(line));
        assert!(cleaned.lines().count() > 1);
        for l in cleaned.lines() {
            assert!(l.chars().count() <= DEFAULT_WRAP_WIDTH, "{l:?}");
        }
    }

    #[test]
    fn oversized_word_stands_alone() {
        let word = "x".repeat(120);
        let cleaned = sanitize(Some(&format!("short {word} tail")));
        let lines: Vec<&str> = cleaned.lines().collect();
        assert_eq!(lines, vec!["short", word.as_str(), "tail"]);
    }

    #[test]
    fn idempotent() {
        let wide = format!("{} {}", "y".repeat(95), "z ".repeat(60));
        let inputs: [&str; 4] = [
            "Hello\n\nWorld",
            "  indented\t\ttext \x07with bell\r\n\r\n\r\n\r\n\r\nafter",
            wide.as_str(),
            " \n \n \n \n",
        ];
        for input in inputs {
            let once = sanitize(Some(input));
            assert_eq!(sanitize(Some(&once)), once, "input {input:?}");
        }
    }
}
