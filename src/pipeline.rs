// src/pipeline.rs
//! The share-card export pipeline: load the card's data, lay the card out,
//! mount it, capture it, and deliver it.
//!
//! Data loading sits behind [`SeriesSource`] so each stage can be exercised
//! without the network.

use std::sync::Arc;

use crate::capture::{configure, CardMount, Rasterizer};
use crate::cards::{layout, load_series, CardKind};
use crate::delivery::{Environment, ExportAction, ExportOutcome, ShareCard};
use crate::quotes::QuoteClient;
use crate::store::DataStore;
use crate::types::Theme;

/// Supplies the values a card plots.
#[async_trait::async_trait]
pub trait SeriesSource: Send + Sync {
    async fn series(&self, kind: CardKind) -> Vec<f64>;
}

/// Card data from the dashboard's store and quote relay.
pub struct DashboardData {
    store: Arc<dyn DataStore>,
    quotes: QuoteClient,
}

impl DashboardData {
    pub fn new(store: Arc<dyn DataStore>, quotes: QuoteClient) -> Self {
        Self { store, quotes }
    }
}

#[async_trait::async_trait]
impl SeriesSource for DashboardData {
    async fn series(&self, kind: CardKind) -> Vec<f64> {
        load_series(kind, self.store.as_ref(), &self.quotes).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub card: CardKind,
    pub theme: Theme,
    pub action: ExportAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub card: CardKind,
    pub action: ExportAction,
    /// Actions the card offered in this environment, in display order.
    pub offered: Vec<ExportAction>,
    pub points: usize,
    pub outcome: ExportOutcome,
}

pub struct ExportPipeline {
    source: Arc<dyn SeriesSource>,
    rasterizer: Arc<dyn Rasterizer>,
    env: Environment,
}

impl ExportPipeline {
    pub fn new(
        source: Arc<dyn SeriesSource>,
        rasterizer: Arc<dyn Rasterizer>,
        env: Environment,
    ) -> Self {
        Self {
            source,
            rasterizer,
            env,
        }
    }

    /// Runs one export end to end. Failures end up in the report's outcome.
    pub async fn run(&self, request: ExportRequest) -> ExportReport {
        let ExportRequest {
            card,
            theme,
            action,
        } = request;

        let series = self.source.series(card).await;
        log::info!("Loaded {} points for the {} card", series.len(), card);

        // The mount has to outlive the capture; the card only holds a weak handle.
        let mount = CardMount::new(layout(card, theme, &series));
        let options = configure(theme, card.dimensions(), card.pixel_ratio());
        let share_card = ShareCard::new(
            card.meta(),
            mount.target(),
            options,
            Arc::clone(&self.rasterizer),
            self.env.clone(),
        );

        let outcome = share_card.trigger(action).await;
        drop(mount);

        ExportReport {
            card,
            action,
            offered: share_card.offered_actions(),
            points: series.len(),
            outcome,
        }
    }
}
