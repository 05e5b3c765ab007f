// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing error messages.
//
// Every conversion error maps onto one of two signals: the caller sent
// something we refuse to process, or we failed internally. Front ends use the
// signal to pick a status (exit code, response class) and show the message.

use crate::error::ConversionError;

/// Coarse outcome reported to whoever invoked the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerSignal {
    /// The input or a policy rejected the request; retrying won't help.
    ClientRejection,
    /// Something went wrong on our side.
    Failure,
}

/// A caller-facing error with a plain message and a suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub signal: CallerSignal,
}

/// Convert a `ConversionError` into its caller-facing form.
pub fn humanize_error(err: &ConversionError) -> HumanError {
    match err {
        ConversionError::UnauthorizedAttachment { .. } => HumanError {
            // The full message names the offending files; keep it intact.
            message: err.to_string(),
            suggestion: "Remove the listed attachments or convert without strict mode.".into(),
            signal: CallerSignal::ClientRejection,
        },

        ConversionError::Config(detail) => HumanError {
            message: format!("The request could not be accepted: {detail}"),
            suggestion: "Check the input file and settings, then try again.".into(),
            signal: CallerSignal::ClientRejection,
        },

        ConversionError::Parse(_) => HumanError {
            message: "The message file could not be read.".into(),
            suggestion: "Make sure the file is an Outlook .msg file and is not damaged.".into(),
            signal: CallerSignal::Failure,
        },

        ConversionError::Render(_)
        | ConversionError::Merge(_)
        | ConversionError::Conversion(_)
        | ConversionError::ImageDecode(_) => HumanError {
            message: format!("Conversion failed: {err}"),
            suggestion: "Try again; if it keeps failing, report the file that caused it.".into(),
            signal: CallerSignal::Failure,
        },

        ConversionError::Io(_) => HumanError {
            message: "Internal error while handling files.".into(),
            suggestion: "Check disk space and permissions, then try again.".into(),
            signal: CallerSignal::Failure,
        },
    }
}

/// Shortcut for front ends that only need the signal.
pub fn caller_signal(err: &ConversionError) -> CallerSignal {
    humanize_error(err).signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_rejection_is_client_side() {
        let err = ConversionError::UnauthorizedAttachment {
            filenames: vec!["notes.txt".into()],
        };
        let human = humanize_error(&err);
        assert_eq!(human.signal, CallerSignal::ClientRejection);
        assert!(human.message.contains("notes.txt"));
    }

    #[test]
    fn internal_faults_are_failures() {
        for err in [
            ConversionError::Parse("bad header".into()),
            ConversionError::Render("x".into()),
            ConversionError::Merge("x".into()),
            ConversionError::Conversion("x".into()),
        ] {
            assert_eq!(caller_signal(&err), CallerSignal::Failure, "{err}");
        }
    }
}
