// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Header fields (From / To / Cc / Subject / Date) as display rows.

use std::fmt::Write as _;

use mailpdf_core::{MessageDate, ParsedMessage};

const NOT_SPECIFIED: &str = "Not specified";
const NO_SUBJECT: &str = "No subject";
const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One label/value row of the metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub label: &'static str,
    pub value: String,
}

impl MetadataField {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// Build the metadata rows in display order. Cc is left out when empty.
pub fn format_metadata(message: &ParsedMessage) -> Vec<MetadataField> {
    let mut fields = vec![
        MetadataField::new("From", or_default(message.sender.as_deref(), NOT_SPECIFIED)),
        MetadataField::new("To", or_default(message.to.as_deref(), NOT_SPECIFIED)),
    ];

    if let Some(cc) = non_blank(message.cc.as_deref()) {
        fields.push(MetadataField::new("Cc", cc));
    }

    fields.push(MetadataField::new(
        "Subject",
        or_default(message.subject.as_deref(), NO_SUBJECT),
    ));
    fields.push(MetadataField::new("Date", format_date(message.date.as_ref())));
    fields
}

/// Render a send date for display. Never fails.
pub fn format_date(date: Option<&MessageDate>) -> String {
    match date {
        None => NOT_SPECIFIED.to_owned(),
        Some(MessageDate::Text(text)) if text.trim().is_empty() => NOT_SPECIFIED.to_owned(),
        Some(MessageDate::Text(text)) => text.clone(),
        Some(MessageDate::Structured(dt)) => {
            let mut out = String::new();
            match write!(out, "{}", dt.format(DATE_FORMAT)) {
                Ok(()) => out,
                Err(_) => dt.to_string(),
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    non_blank(value).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    fn labels(fields: &[MetadataField]) -> Vec<&'static str> {
        fields.iter().map(|f| f.label).collect()
    }

    #[test]
    fn full_message_in_fixed_order() {
        let message = ParsedMessage {
            sender: Some("alice@example.com".into()),
            to: Some("bob@example.com".into()),
            cc: Some("carol@example.com".into()),
            subject: Some("Quarterly numbers".into()),
            date: Some(MessageDate::Text("Mon, 2 Jan 2023 10:00:00 +0100".into())),
            ..Default::default()
        };
        let fields = format_metadata(&message);
        assert_eq!(labels(&fields), ["From", "To", "Cc", "Subject", "Date"]);
        assert_eq!(fields[4].value, "Mon, 2 Jan 2023 10:00:00 +0100");
    }

    #[test]
    fn empty_cc_is_omitted_and_defaults_apply() {
        let message = ParsedMessage {
            cc: Some("  ".into()),
            ..Default::default()
        };
        let fields = format_metadata(&message);
        assert_eq!(labels(&fields), ["From", "To", "Subject", "Date"]);
        assert_eq!(fields[0].value, "Not specified");
        assert_eq!(fields[2].value, "No subject");
        assert_eq!(fields[3].value, "Not specified");
    }

    #[test]
    fn structured_date_is_day_first() {
        let dt = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2023, 1, 15, 14, 30, 45)
            .unwrap();
        assert_eq!(
            format_date(Some(&MessageDate::Structured(dt))),
            "15/01/2023 14:30:45"
        );
    }
}
