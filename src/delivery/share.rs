//! The platform share primitive seam.

use thiserror::Error;

/// An image wrapped as a named file for the share sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFile {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ShareFile {
    pub fn png(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: "image/png",
            bytes,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The user closed the share sheet without picking a target.
    #[error("share cancelled by the user")]
    Aborted,

    #[error("share failed: {0}")]
    Failed(String),
}

/// File-based share sheet provided by the host platform.
#[async_trait::async_trait]
pub trait SharePrimitive: Send + Sync {
    async fn share(&self, file: ShareFile, title: &str, text: &str) -> Result<(), ShareError>;
}
