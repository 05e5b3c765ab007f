// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RS256 bearer-token verification.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mailpdf_core::AuthConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::AuthError;
use crate::jwks::decode_b64url;
use crate::key_cache::{HttpKeySource, SigningKeyCache};

/// Who a verified token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Identity used when authentication is switched off.
    pub fn development() -> Self {
        Self {
            subject: "dev-user-123".into(),
            email: Some("dev@example.com".into()),
            roles: vec!["user".into(), "admin".into()],
            expires_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, wanted: &str) -> bool {
        match self {
            Self::One(aud) => aud == wanted,
            Self::Many(list) => list.iter().any(|aud| aud == wanted),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
}

enum Mode {
    Disabled,
    Verify {
        keys: SigningKeyCache,
        audience: Option<String>,
        issuer: Option<String>,
    },
}

/// Verifies bearer tokens, or waves everything through when disabled.
pub struct Authenticator {
    mode: Mode,
}

impl Authenticator {
    pub fn disabled() -> Self {
        Self { mode: Mode::Disabled }
    }

    pub fn new(keys: SigningKeyCache, audience: Option<String>, issuer: Option<String>) -> Self {
        Self {
            mode: Mode::Verify {
                keys,
                audience,
                issuer,
            },
        }
    }

    /// Build from configuration, using the HTTP key source when enabled.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        if !config.enabled {
            info!("Authentication disabled, development identity in use");
            return Ok(Self::disabled());
        }
        let source = HttpKeySource::new(
            config.jwks_url.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        )?;
        let keys = SigningKeyCache::new(source, Duration::from_secs(config.cache_ttl_secs));
        Ok(Self::new(keys, config.audience.clone(), config.issuer.clone()))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, Mode::Verify { .. })
    }

    /// Check `token` and return its principal.
    #[instrument(skip_all, fields(enabled = self.is_enabled()))]
    pub fn authenticate(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        let Mode::Verify {
            keys,
            audience,
            issuer,
        } = &self.mode
        else {
            return Ok(Principal::development());
        };

        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        match verify(token, keys, audience.as_deref(), issuer.as_deref(), Utc::now()) {
            Ok(principal) => {
                debug!(subject = %principal.subject, "Token verified");
                Ok(principal)
            }
            Err(err) => {
                warn!(%err, "Authentication failed");
                Err(err)
            }
        }
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str, what: &str) -> Result<T, AuthError> {
    let raw = decode_b64url(segment)?;
    serde_json::from_slice(&raw).map_err(|err| AuthError::Malformed(format!("bad {what}: {err}")))
}

fn verify(
    token: &str,
    keys: &SigningKeyCache,
    audience: Option<&str>,
    issuer: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Principal, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Malformed("expected three dot-separated segments".into()));
    };

    let header: Header = decode_segment(header_b64, "header")?;
    if header.alg != "RS256" {
        return Err(AuthError::Malformed(format!("algorithm {} not accepted", header.alg)));
    }
    let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
    let key = keys.signing_key(&kid)?;

    let signature = decode_b64url(signature_b64)?;
    let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
    key.verify_rs256(signing_input.as_bytes(), &signature)?;

    let claims: Claims = decode_segment(claims_b64, "claims")?;
    let exp = claims
        .exp
        .ok_or_else(|| AuthError::InvalidClaim("missing 'exp'".into()))?;
    if exp <= now.timestamp() {
        return Err(AuthError::Expired);
    }
    if let Some(wanted) = audience
        && !claims.aud.as_ref().is_some_and(|aud| aud.contains(wanted))
    {
        return Err(AuthError::InvalidClaim(format!("audience is not '{wanted}'")));
    }
    if let Some(wanted) = issuer
        && claims.iss.as_deref() != Some(wanted)
    {
        return Err(AuthError::InvalidClaim(format!("issuer is not '{wanted}'")));
    }

    Ok(Principal {
        subject: claims.sub.unwrap_or_else(|| "unknown".into()),
        email: claims.email,
        roles: claims.roles,
        expires_at: DateTime::from_timestamp(exp, 0),
    })
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use ring::rand::SystemRandom;
    use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
    use serde_json::json;

    use super::*;
    use crate::key_cache::StaticKeySource;
    use crate::key_cache::tests::FIXTURE;

    const PRIVATE_KEY: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/test_rsa_2048.pk8"
    ));

    fn sign(header: serde_json::Value, claims: serde_json::Value) -> String {
        let encode = |value: &serde_json::Value| URL_SAFE_NO_PAD.encode(value.to_string());
        let input = format!("{}.{}", encode(&header), encode(&claims));
        let key_pair = RsaKeyPair::from_pkcs8(PRIVATE_KEY).unwrap();
        let mut signature = vec![0u8; 256];
        key_pair
            .sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), input.as_bytes(), &mut signature)
            .unwrap();
        format!("{input}.{}", URL_SAFE_NO_PAD.encode(signature))
    }

    fn header() -> serde_json::Value {
        json!({ "alg": "RS256", "typ": "JWT", "kid": "test-key-1" })
    }

    fn in_an_hour() -> i64 {
        Utc::now().timestamp() + 3600
    }

    fn authenticator(audience: Option<&str>, issuer: Option<&str>) -> Authenticator {
        let keys = SigningKeyCache::new(
            StaticKeySource::from_json(FIXTURE).unwrap(),
            Duration::from_secs(3600),
        );
        Authenticator::new(keys, audience.map(String::from), issuer.map(String::from))
    }

    #[test]
    fn valid_token_yields_principal() {
        let token = sign(
            header(),
            json!({
                "sub": "user-42",
                "email": "user@example.com",
                "roles": ["user"],
                "exp": in_an_hour(),
                "aud": "mailpdf",
                "iss": "https://issuer.example.com",
            }),
        );
        let principal = authenticator(Some("mailpdf"), Some("https://issuer.example.com"))
            .authenticate(Some(format!("Bearer {token}").as_str()))
            .unwrap();
        assert_eq!(principal.subject, "user-42");
        assert_eq!(principal.email.as_deref(), Some("user@example.com"));
        assert_eq!(principal.roles, vec!["user".to_string()]);
        assert!(principal.expires_at.is_some());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign(header(), json!({ "sub": "u", "exp": Utc::now().timestamp() - 10 }));
        assert_eq!(
            authenticator(None, None).authenticate(Some(token.as_str())).unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn missing_kid_is_rejected() {
        let token = sign(json!({ "alg": "RS256" }), json!({ "exp": in_an_hour() }));
        assert_eq!(
            authenticator(None, None).authenticate(Some(token.as_str())).unwrap_err(),
            AuthError::MissingKeyId
        );
    }

    #[test]
    fn unknown_kid_is_rejected() {
        let token = sign(
            json!({ "alg": "RS256", "kid": "someone-else" }),
            json!({ "exp": in_an_hour() }),
        );
        assert_eq!(
            authenticator(None, None).authenticate(Some(token.as_str())).unwrap_err(),
            AuthError::UnknownKeyId("someone-else".into())
        );
    }

    #[test]
    fn tampered_claims_fail_signature() {
        let token = sign(header(), json!({ "sub": "u", "exp": in_an_hour() }));
        let forged = URL_SAFE_NO_PAD.encode(json!({ "sub": "admin", "exp": in_an_hour() }).to_string());
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged;
        let tampered = parts.join(".");
        assert_eq!(
            authenticator(None, None)
                .authenticate(Some(tampered.as_str()))
                .unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let token = sign(header(), json!({ "exp": in_an_hour(), "aud": ["other"] }));
        let err = authenticator(Some("mailpdf"), None)
            .authenticate(Some(token.as_str()))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim(_)));
    }

    #[test]
    fn garbage_and_absent_tokens() {
        let auth = authenticator(None, None);
        assert!(matches!(auth.authenticate(Some("abc")), Err(AuthError::Malformed(_))));
        assert_eq!(auth.authenticate(None).unwrap_err(), AuthError::MissingToken);
        assert_eq!(auth.authenticate(Some("  ")).unwrap_err(), AuthError::MissingToken);
    }

    #[test]
    fn disabled_mode_returns_development_identity() {
        let auth = Authenticator::disabled();
        assert!(!auth.is_enabled());
        assert_eq!(auth.authenticate(None).unwrap(), Principal::development());
    }

    #[test]
    fn from_config_respects_enabled_flag() {
        let config = AuthConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!Authenticator::from_config(&config).unwrap().is_enabled());
    }
}
