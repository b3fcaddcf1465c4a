//! Delivery of captured share cards: platform share sheet, clipboard, or a
//! downloaded PNG.
//!
//! Which destinations are offered is decided once per card from the
//! environment's capabilities, and every action re-checks its own
//! feasibility before doing anything.

mod capability;
mod clipboard;
mod dispatcher;
mod download;
mod notify;
mod share;

pub use capability::{is_mobile_user_agent, Environment, ShareCapability};
pub use clipboard::{ClipboardSink, SystemClipboard};
pub use dispatcher::{CopiedIndicator, ShareCard};
pub use download::{export_filename, save_data_uri, slugify, unique_path};
pub use notify::{ConsoleNotifier, UserNotifier};
pub use share::{ShareError, ShareFile, SharePrimitive};

use std::fmt;
use std::path::PathBuf;

/// A user-initiated export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportAction {
    Share,
    Copy,
    Download,
}

impl ExportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Share => "share",
            Self::Copy => "copy",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for ExportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a card instance is in its export cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Capturing,
    Delivering,
    Failed,
}

/// What the user ends up with after an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Shared,
    /// The user dismissed the share sheet. Not a failure.
    ShareCancelled,
    Copied,
    Downloaded(PathBuf),
    /// Another export on the same card was still in flight.
    Ignored,
    /// The card was not mounted when the capture ran.
    CaptureUnavailable,
    /// The runtime lacks the primitive this action needs.
    Unsupported,
    Failed(String),
}

impl ExportOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Shared | Self::Copied | Self::Downloaded(_))
    }
}

/// Card-specific metadata the shared export logic is parameterised by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMeta {
    pub product: String,
    /// Logical category, used as the filename stem.
    pub category: String,
    pub share_title: String,
    pub share_text: String,
}
