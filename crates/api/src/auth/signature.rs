//! Verification of signed dispatch triggers.
//!
//! The scheduler signs every trigger with an HS256 JWT carried in the
//! `upstash-signature` header. The token names the URL it was issued for
//! (`sub`) and the SHA-256 of the body (`body`, URL-safe base64). Two keys
//! are valid at any time so the scheduler can rotate them without downtime.
//!
//! Behind proxies the externally visible URL is ambiguous, so the verifier
//! derives an ordered list of candidate URLs and accepts the signature if it
//! matches any of them. The list is explicit so callers and tests can see
//! exactly which candidates were tried.

use std::fmt;

use axum::http::{HeaderMap, Uri};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Header carrying the signature token.
pub const SIGNATURE_HEADER: &str = "upstash-signature";

/// Required `iss` claim.
pub const EXPECTED_ISSUER: &str = "Upstash";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Signing keys and URL hints for trigger verification.
#[derive(Clone, Default)]
pub struct SigningConfig {
    pub current_key: Option<String>,
    pub next_key: Option<String>,
    /// Public base URL of this service, e.g. `https://plan.example.org`.
    pub app_base_url: Option<String>,
    /// Full URL the scheduler is configured to call, used verbatim.
    pub expected_url: Option<String>,
}

impl SigningConfig {
    /// Load signing configuration from environment variables.
    ///
    /// | Env Var                      | Required | Default |
    /// |------------------------------|----------|---------|
    /// | `QSTASH_CURRENT_SIGNING_KEY` | yes      | --      |
    /// | `QSTASH_NEXT_SIGNING_KEY`    | yes      | --      |
    /// | `APP_BASE_URL`               | no       | --      |
    /// | `QSTASH_EXPECTED_URL`        | no       | --      |
    ///
    /// Missing keys are not a startup error; every trigger is then rejected.
    pub fn from_env() -> Self {
        Self {
            current_key: non_empty_env("QSTASH_CURRENT_SIGNING_KEY"),
            next_key: non_empty_env("QSTASH_NEXT_SIGNING_KEY"),
            app_base_url: non_empty_env("APP_BASE_URL"),
            expected_url: non_empty_env("QSTASH_EXPECTED_URL"),
        }
    }

    /// Both the current and the next key are present.
    pub fn has_keys(&self) -> bool {
        self.current_key.is_some() && self.next_key.is_some()
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("current_key", &self.current_key.as_ref().map(|_| "<redacted>"))
            .field("next_key", &self.next_key.as_ref().map(|_| "<redacted>"))
            .field("app_base_url", &self.app_base_url)
            .field("expected_url", &self.expected_url)
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why a trigger was rejected before or during verification.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing {SIGNATURE_HEADER} header")]
    MissingSignature,

    #[error("Trigger signing keys are not configured")]
    NotConfigured,

    #[error("Invalid signature token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Body hash does not match the signed hash")]
    BodyMismatch,

    #[error("Signature does not match any candidate URL")]
    NoCandidateMatched,
}

// ---------------------------------------------------------------------------
// Token claims
// ---------------------------------------------------------------------------

/// The claims checked by hand; `iss`, `exp` and `nbf` are checked by
/// [`Validation`].
#[derive(Debug, Deserialize)]
struct SignatureClaims {
    #[serde(default)]
    body: String,
}

/// URL-safe, unpadded base64 of the body's SHA-256.
pub fn body_hash(body: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(body))
}

/// Verify one token against one key and one URL.
fn verify_token(token: &str, key: &str, url: &str, body: &[u8]) -> Result<(), SignatureError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[EXPECTED_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.sub = Some(url.to_string());

    let data = decode::<SignatureClaims>(
        token,
        &DecodingKey::from_secret(key.as_bytes()),
        &validation,
    )?;

    if data.claims.body.trim_end_matches('=') != body_hash(body) {
        return Err(SignatureError::BodyMismatch);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Authenticator
// ---------------------------------------------------------------------------

/// Result of checking a signature against the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Candidates tried, in order, up to and including the match.
    pub attempted: Vec<String>,
    /// The candidate the token was issued for.
    pub matched: String,
}

/// Verifies trigger signatures against the configured key pair.
#[derive(Debug, Clone)]
pub struct TriggerAuthenticator {
    config: SigningConfig,
}

impl TriggerAuthenticator {
    pub fn new(config: SigningConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.has_keys()
    }

    /// Ordered, de-duplicated URLs the trigger may have been signed for.
    ///
    /// 1. The request URI, when it arrived in absolute form.
    /// 2. `APP_BASE_URL` + path and query.
    /// 3. `QSTASH_EXPECTED_URL` verbatim.
    /// 4. `x-forwarded-proto` (default `https`) + first `x-forwarded-host`.
    /// 5. The same protocol + `host`.
    pub fn candidate_urls(&self, uri: &Uri, headers: &HeaderMap) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let mut push = |url: String| {
            if !url.is_empty() && !candidates.contains(&url) {
                candidates.push(url);
            }
        };

        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        if uri.scheme().is_some() && uri.authority().is_some() {
            push(uri.to_string());
        }

        if let Some(base) = &self.config.app_base_url {
            push(format!("{}{path_and_query}", base.trim_end_matches('/')));
        }

        if let Some(expected) = &self.config.expected_url {
            push(expected.clone());
        }

        let proto = first_header_value(headers, "x-forwarded-proto").unwrap_or("https");

        if let Some(forwarded_host) = first_header_value(headers, "x-forwarded-host") {
            push(format!("{proto}://{forwarded_host}{path_and_query}"));
        }

        if let Some(host) = first_header_value(headers, "host") {
            push(format!("{proto}://{host}{path_and_query}"));
        }

        candidates
    }

    /// Check `signature` against every candidate until one matches.
    ///
    /// Each candidate is tried with the current key, then the next key.
    /// Fails closed without a signature or without a configured key pair.
    /// A mismatch is logged with the full candidate list.
    pub fn verify(
        &self,
        signature: Option<&str>,
        candidates: &[String],
        body: &[u8],
    ) -> Result<Verification, SignatureError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingSignature)?;

        let (Some(current), Some(next)) = (&self.config.current_key, &self.config.next_key) else {
            tracing::warn!("Trigger rejected: signing keys are not configured");
            return Err(SignatureError::NotConfigured);
        };

        let mut attempted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            attempted.push(candidate.clone());
            for key in [current, next] {
                match verify_token(signature, key, candidate, body) {
                    Ok(()) => {
                        return Ok(Verification {
                            attempted,
                            matched: candidate.clone(),
                        })
                    }
                    Err(e) => {
                        tracing::trace!(candidate = %candidate, error = %e, "Signature candidate rejected");
                    }
                }
            }
        }

        tracing::warn!(candidates = ?attempted, "Invalid trigger signature");
        Err(SignatureError::NoCandidateMatched)
    }
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
