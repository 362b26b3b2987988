/// PKCE code challenge derivation and verification (RFC 7636)
use crate::error::{LinkerError, LinkerResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Code challenge transform methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMethod {
    /// Verifier passed through unchanged. Only acceptable where transport
    /// confidentiality is otherwise guaranteed; prefer S256.
    Plain,
    /// base64url(SHA-256(verifier)) without padding
    S256,
}

impl ChallengeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeMethod::Plain => "plain",
            ChallengeMethod::S256 => "S256",
        }
    }

    pub fn parse(s: &str) -> LinkerResult<Self> {
        match s {
            "plain" => Ok(ChallengeMethod::Plain),
            "S256" => Ok(ChallengeMethod::S256),
            other => Err(LinkerError::InvalidMethod(other.to_string())),
        }
    }
}

/// Derive a code challenge from a code verifier.
pub fn derive_challenge(code_verifier: &str, method: ChallengeMethod) -> String {
    match method {
        ChallengeMethod::Plain => code_verifier.to_string(),
        ChallengeMethod::S256 => {
            let mut hasher = Sha256::new();
            hasher.update(code_verifier.as_bytes());
            URL_SAFE_NO_PAD.encode(hasher.finalize())
        }
    }
}

/// Derive a code challenge with the method given as a wire string.
///
/// Fails with `InvalidMethod` for anything other than "plain" or "S256".
pub fn derive_challenge_str(code_verifier: &str, method: &str) -> LinkerResult<String> {
    Ok(derive_challenge(code_verifier, ChallengeMethod::parse(method)?))
}

/// Generate a cryptographically random code verifier.
///
/// 32 random bytes base64url-encode to 43 characters, the RFC 7636 minimum.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a random state token for CSRF binding.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify a presented verifier against a stored challenge.
///
/// The comparison is constant-time with respect to the challenge length:
/// the challenge guards a user's wiki-account ownership proof.
pub fn verify(code_verifier: &str, method: ChallengeMethod, stored_challenge: &str) -> bool {
    let derived = derive_challenge(code_verifier, method);
    constant_time_eq(&derived, stored_challenge)
}

/// Compare two strings in constant time.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        // Dummy comparison to keep timing consistent when lengths differ
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}
