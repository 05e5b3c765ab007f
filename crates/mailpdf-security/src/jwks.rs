// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON Web Key Sets and RSA public keys built from them.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::signature::{RSA_PKCS1_2048_8192_SHA256, RsaPublicKeyComponents};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// One entry of a JWKS document. Only the RSA members are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        serde_json::from_str(json).map_err(|err| AuthError::Malformed(format!("invalid JWKS: {err}")))
    }

    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }
}

/// Big-endian RSA modulus and exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    n: Vec<u8>,
    e: Vec<u8>,
}

impl RsaPublicKey {
    /// Check a PKCS#1 v1.5 SHA-256 signature over `message`.
    pub fn verify_rs256(&self, message: &[u8], signature: &[u8]) -> Result<(), AuthError> {
        RsaPublicKeyComponents {
            n: &self.n,
            e: &self.e,
        }
        .verify(&RSA_PKCS1_2048_8192_SHA256, message, signature)
        .map_err(|_| AuthError::InvalidSignature)
    }
}

impl TryFrom<&Jwk> for RsaPublicKey {
    type Error = AuthError;

    fn try_from(jwk: &Jwk) -> Result<Self, AuthError> {
        if jwk.kty != "RSA" {
            return Err(AuthError::UnsupportedKeyType(jwk.kty.clone()));
        }
        let member = |value: &Option<String>, name: &str| -> Result<Vec<u8>, AuthError> {
            let encoded = value
                .as_deref()
                .ok_or_else(|| AuthError::Malformed(format!("RSA key without '{name}'")))?;
            decode_b64url(encoded)
        };
        Ok(Self {
            n: member(&jwk.n, "n")?,
            e: member(&jwk.e, "e")?,
        })
    }
}

/// Unpadded base64url, tolerating stray padding.
pub(crate) fn decode_b64url(encoded: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|err| AuthError::Malformed(format!("bad base64url: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/jwks.json"));

    #[test]
    fn parses_fixture_set() {
        let set = JwkSet::from_json(FIXTURE).unwrap();
        let key = set.find("test-key-1").unwrap();
        assert_eq!(key.key_use.as_deref(), Some("sig"));
        assert!(RsaPublicKey::try_from(key).is_ok());
        assert!(set.find("other").is_none());
    }

    #[test]
    fn non_rsa_keys_are_refused() {
        let jwk = Jwk {
            kty: "EC".into(),
            kid: Some("ec".into()),
            alg: None,
            key_use: None,
            n: None,
            e: None,
        };
        assert_eq!(
            RsaPublicKey::try_from(&jwk).unwrap_err(),
            AuthError::UnsupportedKeyType("EC".into())
        );
    }

    #[test]
    fn missing_modulus_is_malformed() {
        let set = JwkSet::from_json(r#"{"keys":[{"kty":"RSA","kid":"k","e":"AQAB"}]}"#).unwrap();
        let err = RsaPublicKey::try_from(set.find("k").unwrap()).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn garbage_json_is_malformed() {
        assert!(matches!(JwkSet::from_json("{"), Err(AuthError::Malformed(_))));
    }
}
