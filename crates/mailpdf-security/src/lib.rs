// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mailpdf-security: bearer-token authentication for mailpdf.
//
// Tokens are RS256 JWTs. Their signing keys come from a JWKS document that is
// fetched once and cached process-wide for a fixed time.

pub mod error;
pub mod jwks;
pub mod key_cache;
pub mod token;

pub use error::AuthError;
pub use jwks::{Jwk, JwkSet, RsaPublicKey};
pub use key_cache::{Clock, HttpKeySource, KeySource, SigningKeyCache, StaticKeySource, SystemClock};
pub use token::{Authenticator, Principal};
