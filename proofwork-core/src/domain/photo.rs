//! Photo domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Proof-of-work photo attached to a job
///
/// A photo is either uploaded (`url` set by the backend) or captured on the
/// device and still waiting for upload (`local_handle` set, `url` empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: PhotoKind,
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_handle: Option<PathBuf>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Photo {
    /// Creates a photo captured on the device that has not been uploaded yet
    pub fn captured(kind: PhotoKind, local_handle: PathBuf) -> Self {
        Self {
            id: None,
            kind,
            url: None,
            local_handle: Some(local_handle),
            uploaded_at: None,
        }
    }

    /// Whether the backend has confirmed this photo
    pub fn is_uploaded(&self) -> bool {
        self.url.is_some()
    }
}

/// Which side of the visit a photo documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoKind {
    Before,
    After,
}

impl PhotoKind {
    /// Wire name used in multipart uploads
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoKind::Before => "before",
            PhotoKind::After => "after",
        }
    }
}

impl std::fmt::Display for PhotoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhotoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(PhotoKind::Before),
            "after" => Ok(PhotoKind::After),
            other => Err(format!("unknown photo type '{}'", other)),
        }
    }
}
