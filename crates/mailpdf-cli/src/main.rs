// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mailpdf: convert an Outlook .msg file to PDF, attachments included.
//
// Entry point. Loads configuration, initialises logging, authenticates the
// caller, runs the conversion, and writes the output files.
//
// Exit codes: 0 success, 1 internal failure, 2 rejected input or caller.

mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mailpdf_core::error::ConversionError;
use mailpdf_core::human_errors::{CallerSignal, humanize_error};
use mailpdf_core::{AppConfig, ConversionReport, RequestId};
use mailpdf_document::MessageConverter;
use mailpdf_security::{AuthError, Authenticator};
use tracing::{debug, info};

use services::data_dir::config_path;
use services::input::{attachment_output, default_output, validate_input};

#[derive(Parser)]
#[command(name = "mailpdf", version, about = "Convert Outlook .msg files to PDF")]
struct Cli {
    /// Outlook message to convert
    #[arg(value_name = "INPUT.msg")]
    input: PathBuf,

    /// Where to write the PDF (default: next to the input, with a .pdf extension)
    #[arg(short, long, value_name = "OUTPUT.pdf")]
    output: Option<PathBuf>,

    /// Fail if any attachment is not a PDF or a supported image
    #[arg(long)]
    strict: bool,

    /// Do not append attachment pages to the output
    #[arg(long)]
    no_merge: bool,

    /// With --no-merge, also write each attachment PDF into this directory
    #[arg(long, value_name = "DIR")]
    attachments_dir: Option<PathBuf>,

    /// Configuration file (default: <config dir>/mailpdf/config.json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bearer token, required when authentication is enabled
    #[arg(long, env = "MAILPDF_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

/// A run that stopped early, with the signal it should exit with.
struct Stop {
    signal: CallerSignal,
    message: String,
    suggestion: Option<String>,
}

impl From<ConversionError> for Stop {
    fn from(err: ConversionError) -> Self {
        let human = humanize_error(&err);
        Self {
            signal: human.signal,
            message: human.message,
            suggestion: Some(human.suggestion),
        }
    }
}

impl From<AuthError> for Stop {
    fn from(err: AuthError) -> Self {
        let signal = if err.is_client_error() {
            CallerSignal::ClientRejection
        } else {
            CallerSignal::Failure
        };
        Self {
            signal,
            message: format!("Authentication failed: {err}"),
            suggestion: None,
        }
    }
}

impl From<anyhow::Error> for Stop {
    fn from(err: anyhow::Error) -> Self {
        Self {
            signal: CallerSignal::Failure,
            message: format!("{err:#}"),
            suggestion: None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return report(Stop::from(err)),
    };
    init_logging(&config.log_level);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(stop) => report(stop),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConversionError> {
    AppConfig::load(&config_path(explicit))?.with_env_overrides()
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report(stop: Stop) -> ExitCode {
    eprintln!("error: {}", stop.message);
    if let Some(suggestion) = stop.suggestion {
        eprintln!("hint: {suggestion}");
    }
    match stop.signal {
        CallerSignal::ClientRejection => ExitCode::from(2),
        CallerSignal::Failure => ExitCode::from(1),
    }
}

fn run(cli: &Cli, config: &AppConfig) -> Result<(), Stop> {
    let request_id = RequestId::new();
    let size = validate_input(&cli.input, config.max_input_bytes)?;
    info!(%request_id, input = %cli.input.display(), size, "Conversion requested");

    let authenticator = Authenticator::from_config(&config.auth)?;
    let principal = authenticator.authenticate(cli.token.as_deref())?;
    info!(%request_id, user = %principal.subject, "Caller authenticated");

    let converter = MessageConverter::new(config);
    let strict = cli.strict || config.strict_mode;
    let merge = !cli.no_merge && config.merge_attachments;
    let output = cli.output.clone().unwrap_or_else(|| default_output(&cli.input));

    let result = converter.convert(&cli.input, request_id, strict)?;
    let final_pdf = if merge {
        converter.merge(&result.main_pdf, &result.attachment_pdfs, request_id)?
    } else {
        if let Some(dir) = &cli.attachments_dir {
            write_attachments(dir, &cli.input, &result.attachment_pdfs)?;
        }
        result.main_pdf
    };

    std::fs::write(&output, &final_pdf)
        .with_context(|| format!("writing {}", output.display()))?;

    let report = &result.report;
    info!(
        %request_id,
        output = %output.display(),
        bytes = final_pdf.len(),
        attachments_converted = report.processed(),
        attachments_processed = merged_attachments(report, merge),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "PDF written"
    );
    if let Ok(json) = serde_json::to_string(report) {
        debug!(%request_id, report = %json, "Conversion report");
    }
    println!("{}", output.display());
    Ok(())
}

/// Attachments whose pages ended up in the written PDF.
fn merged_attachments(report: &ConversionReport, merged: bool) -> usize {
    if merged { report.processed() } else { 0 }
}

fn write_attachments(dir: &Path, input: &Path, pdfs: &[Vec<u8>]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (index, pdf) in pdfs.iter().enumerate() {
        let path = attachment_output(dir, input, index + 1);
        std::fs::write(&path, pdf).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), bytes = pdf.len(), "Attachment PDF written");
    }
    if pdfs.is_empty() {
        info!(dir = %dir.display(), "Message had no convertible attachments");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mailpdf_core::{AttachmentDisposition, AttachmentOutcome};

    use super::*;

    fn report() -> ConversionReport {
        ConversionReport {
            request_id: RequestId::new(),
            attachments: vec![
                (
                    "a.pdf".into(),
                    AttachmentOutcome::Included(AttachmentDisposition::PdfPassthrough),
                ),
                ("b.txt".into(), AttachmentOutcome::SkippedUnsupported),
            ],
            main_pdf_bytes: 1024,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn processed_count_is_zero_without_merge() {
        assert_eq!(merged_attachments(&report(), true), 1);
        assert_eq!(merged_attachments(&report(), false), 0);
    }

    #[test]
    fn attachments_are_written_numbered_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let pdfs = vec![b"%PDF-a".to_vec(), b"%PDF-b".to_vec()];
        write_attachments(dir.path(), Path::new("inbox/mail.msg"), &pdfs).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("mail_attachment_2.pdf")).unwrap(),
            b"%PDF-b"
        );
        assert!(dir.path().join("mail_attachment_1.pdf").is_file());
    }
}
