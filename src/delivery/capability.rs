//! Runtime capability detection for export destinations.
//!
//! Detection probes for the primitive itself. The user agent is only
//! consulted to decide whether the share action should lead on mobile.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

use super::clipboard::ClipboardSink;
use super::notify::{ConsoleNotifier, UserNotifier};
use super::share::SharePrimitive;
use super::ExportAction;

static MOBILE_USER_AGENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)android|iphone|ipad|ipod|mobile").expect("mobile user agent pattern is valid")
});

/// Whether a user agent string looks like a phone or tablet.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    MOBILE_USER_AGENT.is_match(user_agent)
}

/// The primitives the host provides to share cards.
#[derive(Clone)]
pub struct Environment {
    pub user_agent: Option<String>,
    pub share: Option<Arc<dyn SharePrimitive>>,
    pub clipboard: Option<Arc<dyn ClipboardSink>>,
    pub notifier: Arc<dyn UserNotifier>,
    pub download_dir: PathBuf,
}

impl Environment {
    /// An environment with no share sheet and no clipboard.
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_agent: None,
            share: None,
            clipboard: None,
            notifier: Arc::new(ConsoleNotifier),
            download_dir: download_dir.into(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_share(mut self, share: Arc<dyn SharePrimitive>) -> Self {
        self.share = Some(share);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardSink>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn UserNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub(crate) fn image_clipboard(&self) -> Option<&Arc<dyn ClipboardSink>> {
        self.clipboard.as_ref().filter(|sink| sink.supports_images())
    }
}

/// Which export destinations a card should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShareCapability {
    pub can_share: bool,
    pub can_copy_image: bool,
    /// Mobile affordance: put share first when it is available.
    pub prefers_share: bool,
}

impl ShareCapability {
    pub fn detect(env: &Environment) -> Self {
        let capability = Self {
            can_share: env.share.is_some(),
            can_copy_image: env.image_clipboard().is_some(),
            prefers_share: env
                .user_agent
                .as_deref()
                .is_some_and(is_mobile_user_agent),
        };
        log::debug!("Detected share capability: {:?}", capability);
        capability
    }

    /// Actions to show, in display order. Unavailable ones are left out
    /// rather than shown as buttons that would predictably fail.
    pub fn offered_actions(&self) -> Vec<ExportAction> {
        let mut actions = Vec::with_capacity(3);
        if self.can_share && self.prefers_share {
            actions.push(ExportAction::Share);
        }
        if self.can_copy_image {
            actions.push(ExportAction::Copy);
        }
        actions.push(ExportAction::Download);
        if self.can_share && !self.prefers_share {
            actions.push(ExportAction::Share);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PngImage;
    use crate::delivery::share::{ShareError, ShareFile};
    use crate::error::AppError;
    use pretty_assertions::assert_eq;

    struct NoopShare;

    #[async_trait::async_trait]
    impl SharePrimitive for NoopShare {
        async fn share(&self, _: ShareFile, _: &str, _: &str) -> Result<(), ShareError> {
            Ok(())
        }
    }

    struct TextOnlyClipboard;

    impl ClipboardSink for TextOnlyClipboard {
        fn supports_images(&self) -> bool {
            false
        }

        fn write_image(&self, _: &PngImage) -> Result<(), AppError> {
            Err(AppError::Clipboard("text only".into()))
        }
    }

    const IPHONE: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
    const DESKTOP: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/124.0";

    #[test]
    fn test_mobile_user_agents() {
        assert!(is_mobile_user_agent(IPHONE));
        assert!(is_mobile_user_agent("Mozilla/5.0 (Linux; Android 14; Pixel 8)"));
        assert!(!is_mobile_user_agent(DESKTOP));
    }

    #[test]
    fn bare_environment_offers_download_only() {
        let capability = ShareCapability::detect(&Environment::new("."));
        assert_eq!(capability, ShareCapability::default());
        assert_eq!(capability.offered_actions(), vec![ExportAction::Download]);
    }

    #[test]
    fn mobile_user_agent_without_primitive_cannot_share() {
        let env = Environment::new(".").with_user_agent(IPHONE);
        let capability = ShareCapability::detect(&env);
        assert!(!capability.can_share);
        assert!(capability.prefers_share);
        assert!(!capability.offered_actions().contains(&ExportAction::Share));
    }

    #[test]
    fn share_leads_on_mobile_and_trails_on_desktop() {
        let mobile = Environment::new(".")
            .with_user_agent(IPHONE)
            .with_share(Arc::new(NoopShare));
        assert_eq!(
            ShareCapability::detect(&mobile).offered_actions(),
            vec![ExportAction::Share, ExportAction::Download]
        );

        let desktop = Environment::new(".")
            .with_user_agent(DESKTOP)
            .with_share(Arc::new(NoopShare));
        assert_eq!(
            ShareCapability::detect(&desktop).offered_actions(),
            vec![ExportAction::Download, ExportAction::Share]
        );
    }

    #[test]
    fn text_only_clipboard_does_not_offer_copy() {
        let env = Environment::new(".").with_clipboard(Arc::new(TextOnlyClipboard));
        let capability = ShareCapability::detect(&env);
        assert!(!capability.can_copy_image);
    }
}
