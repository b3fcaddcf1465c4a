//! Per-card export orchestration: configure → rasterize → deliver.
//!
//! Each [`ShareCard`] owns its own busy flag, so two cards can export at the
//! same time while a second request on the same card is turned away.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::capability::{Environment, ShareCapability};
use super::download::{export_filename, save_data_uri};
use super::share::{ShareError, ShareFile};
use super::{CardMeta, ExportAction, ExportOutcome, ExportState};
use crate::capture::{CaptureOptions, CaptureTarget, RasterForm, RasterResult, Rasterizer};
use crate::constants::COPIED_INDICATOR_WINDOW;
use crate::types::TradingDate;

/// Transient "copied" flag that switches itself off after a fixed window.
#[derive(Clone)]
pub struct CopiedIndicator {
    inner: Arc<IndicatorState>,
    window: Duration,
}

#[derive(Default)]
struct IndicatorState {
    copied: AtomicBool,
    generation: AtomicU64,
}

impl Default for CopiedIndicator {
    fn default() -> Self {
        Self::with_window(COPIED_INDICATOR_WINDOW)
    }
}

impl CopiedIndicator {
    pub fn with_window(window: Duration) -> Self {
        Self {
            inner: Arc::new(IndicatorState::default()),
            window,
        }
    }

    pub fn is_copied(&self) -> bool {
        self.inner.copied.load(Ordering::Acquire)
    }

    /// Turns the flag on and (re)starts the reset window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mark(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.copied.store(true, Ordering::Release);

        let state: Weak<IndicatorState> = Arc::downgrade(&self.inner);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // The card may be gone by now; a stale timer must not touch a newer window.
            if let Some(state) = state.upgrade() {
                if state.generation.load(Ordering::Acquire) == generation {
                    state.copied.store(false, Ordering::Release);
                }
            }
        });
    }
}

/// One share card instance and its export pipeline.
pub struct ShareCard {
    meta: CardMeta,
    target: CaptureTarget,
    options: CaptureOptions,
    rasterizer: Arc<dyn Rasterizer>,
    env: Environment,
    capability: ShareCapability,
    state: Mutex<ExportState>,
    busy: AtomicBool,
    copied: CopiedIndicator,
}

/// Clears the busy flag and returns to `Idle` however the export ends.
struct BusyGuard<'a> {
    card: &'a ShareCard,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.card.state.lock() = ExportState::Idle;
        self.card.busy.store(false, Ordering::Release);
    }
}

impl ShareCard {
    /// Mounts the export pipeline for a card. Capabilities are detected here,
    /// once.
    pub fn new(
        meta: CardMeta,
        target: CaptureTarget,
        options: CaptureOptions,
        rasterizer: Arc<dyn Rasterizer>,
        env: Environment,
    ) -> Self {
        let capability = ShareCapability::detect(&env);
        Self {
            meta,
            target,
            options,
            rasterizer,
            env,
            capability,
            state: Mutex::new(ExportState::Idle),
            busy: AtomicBool::new(false),
            copied: CopiedIndicator::default(),
        }
    }

    pub fn with_copied_indicator(mut self, indicator: CopiedIndicator) -> Self {
        self.copied = indicator;
        self
    }

    pub fn meta(&self) -> &CardMeta {
        &self.meta
    }

    pub fn capability(&self) -> ShareCapability {
        self.capability
    }

    pub fn offered_actions(&self) -> Vec<ExportAction> {
        self.capability.offered_actions()
    }

    pub fn state(&self) -> ExportState {
        *self.state.lock()
    }

    pub fn is_copied(&self) -> bool {
        self.copied.is_copied()
    }

    /// Filename used for both the shared file and the download.
    pub fn filename(&self) -> String {
        export_filename(&self.meta.product, &self.meta.category, TradingDate::today())
    }

    /// Runs one export. Never panics and never returns an error: every
    /// failure is reduced to an outcome the caller can display or ignore.
    pub async fn trigger(&self, action: ExportAction) -> ExportOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!(
                "Ignoring {} on '{}': export already in flight",
                action,
                self.meta.category
            );
            return ExportOutcome::Ignored;
        }
        let _guard = BusyGuard { card: self };

        if let Some(reason) = self.unsupported_reason(action) {
            log::info!("{} unavailable for '{}'", action, self.meta.category);
            self.env.notifier.alert(reason);
            return ExportOutcome::Unsupported;
        }

        self.set_state(ExportState::Capturing);
        let form = match action {
            ExportAction::Download => RasterForm::DataUri,
            ExportAction::Share | ExportAction::Copy => RasterForm::Blob,
        };

        let raster = match self
            .rasterizer
            .rasterize(&self.target, &self.options, form)
            .await
        {
            Ok(Some(raster)) => raster,
            Ok(None) => {
                self.capture_failed(action, "card is not mounted");
                return ExportOutcome::CaptureUnavailable;
            }
            Err(e) => {
                let message = e.to_string();
                self.capture_failed(action, &message);
                return ExportOutcome::Failed(message);
            }
        };

        self.set_state(ExportState::Delivering);
        match action {
            ExportAction::Share => self.deliver_share(raster).await,
            ExportAction::Copy => self.deliver_copy(raster).await,
            ExportAction::Download => self.deliver_download(raster).await,
        }
    }

    /// Re-checks feasibility right before acting.
    fn unsupported_reason(&self, action: ExportAction) -> Option<&'static str> {
        match action {
            ExportAction::Share if self.env.share.is_none() => {
                Some("Sharing is not supported here. Try copying or downloading the image instead.")
            }
            ExportAction::Copy if self.env.image_clipboard().is_none() => {
                Some("Copying images is not supported here. Try downloading the image instead.")
            }
            _ => None,
        }
    }

    fn set_state(&self, state: ExportState) {
        *self.state.lock() = state;
    }

    fn capture_failed(&self, action: ExportAction, reason: &str) {
        self.set_state(ExportState::Failed);
        log::warn!(
            "Capture for {} of '{}' failed: {}",
            action,
            self.meta.category,
            reason
        );
        // Clipboard failures are otherwise invisible to the user.
        if action == ExportAction::Copy {
            self.env
                .notifier
                .alert("Could not capture the card for copying. Please try again.");
        }
    }

    async fn deliver_share(&self, raster: RasterResult) -> ExportOutcome {
        let Some(share) = self.env.share.as_ref() else {
            return ExportOutcome::Unsupported;
        };
        let png = match raster.into_png() {
            Ok(png) => png,
            Err(e) => return self.delivery_failed(ExportAction::Share, e.to_string()),
        };

        let file = ShareFile::png(self.filename(), png.bytes);
        match share
            .share(file, &self.meta.share_title, &self.meta.share_text)
            .await
        {
            Ok(()) => {
                log::info!("Shared '{}'", self.meta.category);
                ExportOutcome::Shared
            }
            Err(ShareError::Aborted) => ExportOutcome::ShareCancelled,
            Err(ShareError::Failed(message)) => {
                self.delivery_failed(ExportAction::Share, message)
            }
        }
    }

    async fn deliver_copy(&self, raster: RasterResult) -> ExportOutcome {
        let Some(sink) = self.env.image_clipboard().cloned() else {
            return ExportOutcome::Unsupported;
        };
        let png = match raster.into_png() {
            Ok(png) => png,
            Err(e) => return self.copy_failed(e.to_string()),
        };

        let written = tokio::task::spawn_blocking(move || sink.write_image(&png)).await;
        match written {
            Ok(Ok(())) => {
                self.copied.mark();
                log::info!("Copied '{}' to clipboard", self.meta.category);
                ExportOutcome::Copied
            }
            Ok(Err(e)) => self.copy_failed(e.to_string()),
            Err(e) => self.copy_failed(e.to_string()),
        }
    }

    async fn deliver_download(&self, raster: RasterResult) -> ExportOutcome {
        let uri = match raster {
            RasterResult::DataUri(uri) => uri,
            RasterResult::Blob(png) => png.to_data_uri(),
        };

        match save_data_uri(&self.env.download_dir, &self.filename(), &uri) {
            Ok(path) => ExportOutcome::Downloaded(path),
            Err(e) => self.delivery_failed(ExportAction::Download, e.to_string()),
        }
    }

    fn copy_failed(&self, message: String) -> ExportOutcome {
        self.env
            .notifier
            .alert(&format!("Copying the image failed: {}", message));
        self.delivery_failed(ExportAction::Copy, message)
    }

    fn delivery_failed(&self, action: ExportAction, message: String) -> ExportOutcome {
        self.set_state(ExportState::Failed);
        log::error!(
            "{} of '{}' failed: {}",
            action,
            self.meta.category,
            message
        );
        ExportOutcome::Failed(message)
    }
}
