// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Authentication failures.

use thiserror::Error;

/// Why a bearer token was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authentication token required")]
    MissingToken,

    #[error("token header carries no 'kid'")]
    MissingKeyId,

    #[error("no signing key with id '{0}'")]
    UnknownKeyId(String),

    #[error("unsupported key type '{0}'")]
    UnsupportedKeyType(String),

    #[error("token expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    #[error("signing keys unavailable: {0}")]
    KeySourceUnavailable(String),
}

impl AuthError {
    /// Failures caused by the token itself, as opposed to the key source.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::KeySourceUnavailable(_))
    }
}
