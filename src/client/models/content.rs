//! Contents API file payloads

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `/repos/{owner}/{repo}/contents/{path}` and `/readme` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFile {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentFile {
    /// Decode the file body to text.
    ///
    /// GitHub wraps base64 content at 60 columns; whitespace is ignored.
    pub fn decode(&self) -> Result<String, ApiError> {
        let raw = self
            .content
            .as_deref()
            .ok_or_else(|| ApiError::InvalidResponse(format!("{} has no content", self.path)))?;

        match self.encoding.as_deref() {
            Some("base64") | None => {
                let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = general_purpose::STANDARD.decode(compact).map_err(|e| {
                    ApiError::InvalidResponse(format!("Invalid base64 in {}: {}", self.path, e))
                })?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some("utf-8") | Some("utf8") => Ok(raw.to_string()),
            Some(other) => Err(ApiError::InvalidResponse(format!(
                "Unsupported content encoding: {}",
                other
            ))),
        }
    }
}
