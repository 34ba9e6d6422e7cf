//! Request description passed to transports

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What to fetch: a target (URL or resource identifier) plus parameters.
///
/// Parameters are kept ordered so that two specs built in a different
/// order describe, and hash to, the same resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestSpec {
    pub target: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl RequestSpec {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add (or replace) a request parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Stable cache key for this target and parameter set.
    ///
    /// SHA-256 over the target and every `name=value` pair, truncated to
    /// 16 bytes and hex-encoded. Identical across processes, so it
    /// is safe as a persisted key.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.target.as_bytes());
        for (name, value) in &self.params {
            hasher.update([0u8]);
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        digest_prefix(hasher)
    }
}

/// Bytes of the SHA-256 digest kept in derived keys.
const DIGEST_BYTES: usize = 16;

/// Hex digest of an arbitrary key, used for file names derived from keys.
pub(crate) fn key_digest(key: &str) -> String {
    digest_prefix(Sha256::new_with_prefix(key.as_bytes()))
}

fn digest_prefix(hasher: Sha256) -> String {
    hex::encode(&hasher.finalize()[..DIGEST_BYTES])
}
