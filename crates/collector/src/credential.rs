use std::fmt;

use sha2::{Digest, Sha256};

/// Access token for the hosting API. The secret never appears in `Debug`
/// output or cache keys; `identity` is a short digest of it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    identity: String,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into().trim().to_string();
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        Self {
            identity: hex[..16].to_string(),
            secret,
        }
    }

    /// Parses an `Authorization` header value (`Bearer <token>` or
    /// `token <token>`).
    pub fn from_authorization(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
            return None;
        }
        let credential = Self::new(token);
        (!credential.is_blank()).then_some(credential)
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_blank(&self) -> bool {
        self.secret.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
