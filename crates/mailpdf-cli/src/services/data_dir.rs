// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration directory resolution.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "mailpdf";
const CONFIG_FILE: &str = "config.json";

/// Directory holding `config.json`. Not created; a missing config file just
/// means defaults.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(fallback_base)
        .join(APP_DIR)
}

/// The config file to load: `explicit` when given, else the platform default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_dir().join(CONFIG_FILE))
}

fn fallback_base() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = config_path(Some(Path::new("/etc/mailpdf.json")));
        assert_eq!(path, PathBuf::from("/etc/mailpdf.json"));
    }

    #[test]
    fn default_path_ends_in_app_dir() {
        let path = config_path(None);
        assert!(path.ends_with("mailpdf/config.json"));
    }
}
