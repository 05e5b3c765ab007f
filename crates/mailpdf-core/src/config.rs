// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, Result};

/// Settings for the conversion pipeline and the front end around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page size for the rendered message and converted images.
    pub paper_size: crate::PaperSize,
    /// Maximum characters per line after body sanitisation.
    pub wrap_width: usize,
    /// JPEG quality (1-100) used when embedding converted images.
    pub jpeg_quality: u8,
    /// Largest `.msg` input accepted by the front end.
    pub max_input_bytes: u64,
    /// Append attachment PDFs to the main document.
    pub merge_attachments: bool,
    /// Reject the whole conversion when any attachment is unsupported.
    pub strict_mode: bool,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paper_size: crate::PaperSize::A4,
            wrap_width: 80,
            jpeg_quality: 85,
            max_input_bytes: 50 * 1024 * 1024,
            merge_attachments: true,
            strict_mode: false,
            log_level: "info".into(),
            auth: AuthConfig::default(),
        }
    }
}

/// Token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false, every caller is treated as the development principal.
    pub enabled: bool,
    pub jwks_url: String,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    /// How long a fetched key set is trusted.
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jwks_url: "https://example.com/.well-known/jwks.json".into(),
            audience: None,
            issuer: None,
            cache_ttl_secs: 3600,
            fetch_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        let config: Self = serde_json::from_str(&data).map_err(|err| {
            ConversionError::Config(format!("{}: {}", path.display(), err))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MAILPDF_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("MAILPDF_JWKS_URL") {
            self.auth.jwks_url = url;
        }
        if let Some(audience) = lookup("MAILPDF_JWT_AUDIENCE") {
            self.auth.audience = Some(audience);
        }
        if let Some(issuer) = lookup("MAILPDF_JWT_ISSUER") {
            self.auth.issuer = Some(issuer);
        }
        if let Some(flag) = lookup("MAILPDF_DISABLE_AUTH") {
            self.auth.enabled = !parse_flag(&flag)?;
        }
        if let Some(level) = lookup("MAILPDF_LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.wrap_width < 10 {
            return Err(ConversionError::Config(format!(
                "wrap_width must be at least 10, got {}",
                self.wrap_width
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConversionError::Config(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.auth.enabled && self.auth.jwks_url.is_empty() {
            return Err(ConversionError::Config(
                "auth is enabled but jwks_url is empty".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConversionError::Config(format!(
            "expected a boolean, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.wrap_width, 80);
        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.auth.cache_ttl_secs, 3600);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"strict_mode": true, "auth": {"enabled": true}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert!(config.strict_mode);
        assert!(config.auth.enabled);
        assert!(config.merge_attachments);
        assert_eq!(config.auth.fetch_timeout_secs, 10);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConversionError::Config(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn env_overrides_apply() {
        let config = AppConfig {
            auth: AuthConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        }
        .with_overrides(|key| match key {
            "MAILPDF_JWKS_URL" => Some("http://localhost:8080/jwks.json".into()),
            "MAILPDF_DISABLE_AUTH" => Some("true".into()),
            "MAILPDF_LOG_LEVEL" => Some("DEBUG".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.auth.jwks_url, "http://localhost:8080/jwks.json");
        assert!(!config.auth.enabled);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn bad_quality_rejected() {
        let config = AppConfig {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert!(config.with_overrides(|_| None).is_err());
    }
}
