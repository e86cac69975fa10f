//! Authenticated content-gateway session.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};

/// Session token held for the duration of a job.
///
/// Exported as an opaque base64 blob so it can be stored and resumed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub login: String,
    pub token: String,
}

impl Session {
    pub fn new(login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            token: token.into(),
        }
    }

    /// Encode as an opaque blob.
    pub fn export(&self) -> SourceResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| SourceError::invalid_blob(format!("encode: {}", e)))?;
        Ok(STANDARD.encode(json))
    }

    /// Decode a blob produced by [`Session::export`].
    pub fn import(blob: &str) -> SourceResult<Self> {
        let bytes = STANDARD
            .decode(blob.trim())
            .map_err(|e| SourceError::invalid_blob(format!("base64: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::invalid_blob(format!("json: {}", e)))
    }
}
