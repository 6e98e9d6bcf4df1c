//! Idempotency keys
//!
//! A key identifies one logical submission. It is sent as the remote request
//! id and stored as a job label, so it is limited to 40 lowercase hex chars.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::domain::spec::JobDocument;
use crate::error::SpecError;

const KEY_LEN: usize = 40;

/// Stable idempotency key of a submission
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    /// Key for a caller-supplied correlation token
    pub fn from_token(token: &str) -> Self {
        Self::digest(&[b"token:".as_slice(), token.trim().as_bytes()])
    }

    /// Key derived from the canonical (RFC 8785) form of the submission
    pub fn derive(project_id: &str, region: &str, document: &JobDocument) -> Result<Self, SpecError> {
        let material = json!({
            "projectId": project_id,
            "region": region,
            "job": document.as_map(),
        });
        let canonical = serde_json_canonicalizer::to_vec(&material)
            .map_err(|e| SpecError::Malformed(e.to_string()))?;
        Ok(Self::digest(&[b"spec:".as_slice(), canonical.as_slice()]))
    }

    fn digest(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let mut hex = hex::encode(hasher.finalize());
        hex.truncate(KEY_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
