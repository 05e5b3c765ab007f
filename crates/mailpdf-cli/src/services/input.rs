// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input checks and output naming.

use std::path::{Path, PathBuf};

use mailpdf_core::error::{ConversionError, Result};

/// Reject inputs that are not worth handing to the converter: missing
/// files, anything not named `*.msg`, and files over `max_bytes`.
///
/// Returns the file size on success.
pub fn validate_input(path: &Path, max_bytes: u64) -> Result<u64> {
    let is_msg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("msg"));
    if !is_msg {
        return Err(ConversionError::Config(format!(
            "{} is not a .msg file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|_| ConversionError::Config(format!("{} does not exist", path.display())))?;
    if !metadata.is_file() {
        return Err(ConversionError::Config(format!("{} is not a file", path.display())));
    }

    let size = metadata.len();
    if size > max_bytes {
        return Err(ConversionError::Config(format!(
            "{} is {size} bytes, the limit is {max_bytes}",
            path.display()
        )));
    }
    Ok(size)
}

/// `<input stem>.pdf` next to the input.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

/// `<dir>/<input stem>_attachment_<n>.pdf`, numbered from 1.
pub fn attachment_output(dir: &Path, input: &Path, n: usize) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("message");
    dir.join(format!("{stem}_attachment_{n}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_small_msg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail.MSG");
        std::fs::write(&path, b"0123456789").unwrap();
        assert_eq!(validate_input(&path, 100).unwrap(), 10);
    }

    #[test]
    fn rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail.eml");
        std::fs::write(&path, b"x").unwrap();
        let err = validate_input(&path, 100).unwrap_err();
        assert!(err.to_string().contains("not a .msg file"));
    }

    #[test]
    fn rejects_missing_file() {
        let err = validate_input(Path::new("/nowhere/mail.msg"), 100).unwrap_err();
        assert!(matches!(err, ConversionError::Config(_)));
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.msg");
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        assert!(validate_input(&path, 63).is_err());
    }

    #[test]
    fn output_names() {
        let input = Path::new("/in/Quarterly report.msg");
        assert_eq!(default_output(input), PathBuf::from("/in/Quarterly report.pdf"));
        assert_eq!(
            attachment_output(Path::new("/out"), input, 2),
            PathBuf::from("/out/Quarterly report_attachment_2.pdf")
        );
    }
}
