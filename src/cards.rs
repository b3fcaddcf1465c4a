//! The share card catalogue: what each card is called, how large it
//! captures, which data it plots, and how its surface is laid out.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::capture::{CardDimensions, CardNode, Rect};
use crate::constants::{CORRELATION_SERIES, PRODUCT_NAME};
use crate::delivery::CardMeta;
use crate::error::AppError;
use crate::quotes::QuoteClient;
use crate::store::{tables, DataStore, Direction, Query};
use crate::types::{Theme, ValidationError};

const HEADER_HEIGHT: f32 = 56.0;
const PADDING: f32 = 16.0;
const ROW_HEIGHT: f32 = 24.0;
const ROW_GAP: f32 = 10.0;
const BAR_RADIUS: f32 = 4.0;

/// Points plotted on the store-backed cards.
const HISTORY_POINTS: usize = 12;
/// Days of headlines summarised on the news card.
const NEWS_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardKind {
    CurrencyDesk,
    MarketWeather,
    MoneyFlow,
    CreditBalance,
    Correlation,
    DailyNews,
}

impl CardKind {
    pub const ALL: [CardKind; 6] = [
        Self::CurrencyDesk,
        Self::MarketWeather,
        Self::MoneyFlow,
        Self::CreditBalance,
        Self::Correlation,
        Self::DailyNews,
    ];

    /// Category slug, also the filename stem of exports.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::CurrencyDesk => "currency-desk",
            Self::MarketWeather => "market-weather",
            Self::MoneyFlow => "money-flow",
            Self::CreditBalance => "credit-balance",
            Self::Correlation => "correlation",
            Self::DailyNews => "daily-news",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::CurrencyDesk => "Currency Desk",
            Self::MarketWeather => "Market Weather",
            Self::MoneyFlow => "Money Flow",
            Self::CreditBalance => "Credit Balance",
            Self::Correlation => "KOSPI / S&P 500 Correlation",
            Self::DailyNews => "Daily News",
        }
    }

    fn share_text(&self) -> &'static str {
        match self {
            Self::CurrencyDesk => "Today's exchange rates at a glance",
            Self::MarketWeather => "How the major indices are doing today",
            Self::MoneyFlow => "Where the money moved today",
            Self::CreditBalance => "Margin loan balance trend",
            Self::Correlation => "20-day rolling correlation between KOSPI and the S&P 500",
            Self::DailyNews => "This week's market headlines",
        }
    }

    pub fn dimensions(&self) -> CardDimensions {
        match self {
            Self::CurrencyDesk | Self::MarketWeather => CardDimensions::Fixed {
                width: 330,
                height: 440,
            },
            Self::Correlation | Self::CreditBalance => CardDimensions::Fixed {
                width: 360,
                height: 540,
            },
            Self::MoneyFlow | Self::DailyNews => CardDimensions::Auto { width: 360 },
        }
    }

    /// Fixed cards capture sharper; measured ones can run long.
    pub fn pixel_ratio(&self) -> f32 {
        match self.dimensions() {
            CardDimensions::Fixed { .. } => 3.0,
            CardDimensions::Auto { .. } => 2.0,
        }
    }

    pub fn meta(&self) -> CardMeta {
        CardMeta {
            product: PRODUCT_NAME.to_string(),
            category: self.slug().to_string(),
            share_title: format!("{} | {}", self.title(), PRODUCT_NAME),
            share_text: self.share_text().to_string(),
        }
    }

    /// Quote symbols behind the quote-driven cards.
    pub fn symbols(&self) -> &'static [&'static str] {
        match self {
            Self::CurrencyDesk => &["KRW=X", "JPYKRW=X", "EURKRW=X", "CNYKRW=X"],
            Self::MarketWeather => &["^KS11", "^KQ11", "^GSPC", "^IXIC", "^N225"],
            Self::MoneyFlow => &["069500.KS", "229200.KS", "SPY", "QQQ", "GLD", "TLT"],
            Self::CreditBalance | Self::Correlation | Self::DailyNews => &[],
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CardKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted)
            .ok_or_else(|| ValidationError::UnknownCard(s.to_string()))
    }
}

/// Lays out a card: a themed panel with a header band and one horizontal
/// bar per value, scaled to the largest magnitude.
///
/// Fixed cards keep their height and clip overflowing rows; auto cards grow
/// with the number of rows. An empty series renders a placeholder row.
pub fn layout(kind: CardKind, theme: Theme, series: &[f64]) -> CardNode {
    let palette = theme.palette();
    let dims = kind.dimensions();
    let width = dims.width() as f32;
    let inner_width = width - 2.0 * PADDING;

    let rows = series.len().max(1) as f32;
    let content_height = HEADER_HEIGHT + PADDING + rows * (ROW_HEIGHT + ROW_GAP) + PADDING;
    let height = dims
        .height()
        .map(|h| h as f32)
        .unwrap_or(content_height);

    let mut panel = CardNode::new(Rect::new(0.0, 0.0, width, height))
        .with_background(palette.panel)
        .with_radius(16.0)
        .with_child(
            CardNode::new(Rect::new(0.0, 0.0, width, HEADER_HEIGHT))
                .with_background(palette.header),
        );

    let row_y = |index: usize| HEADER_HEIGHT + PADDING + index as f32 * (ROW_HEIGHT + ROW_GAP);

    if series.is_empty() {
        return panel.with_child(
            CardNode::new(Rect::new(PADDING, row_y(0), inner_width, ROW_HEIGHT))
                .with_background(palette.muted)
                .with_radius(BAR_RADIUS),
        );
    }

    let peak = series
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    for (index, value) in series.iter().enumerate() {
        let y = row_y(index);
        if dims.height().is_some() && y + ROW_HEIGHT > height {
            break;
        }

        let fraction = if peak > 0.0 && value.is_finite() {
            (value.abs() / peak) as f32
        } else {
            0.0
        };
        let color = if *value < 0.0 {
            palette.negative
        } else {
            palette.positive
        };

        let track = CardNode::new(Rect::new(PADDING, y, inner_width, ROW_HEIGHT))
            .with_background(palette.muted.with_opacity(0.25))
            .with_radius(BAR_RADIUS);
        let bar_width = (inner_width * fraction).max(2.0);
        panel = panel.with_child(
            track.with_child(
                CardNode::new(Rect::new(0.0, 0.0, bar_width, ROW_HEIGHT))
                    .with_background(color)
                    .with_radius(BAR_RADIUS),
            ),
        );
    }

    panel
}

/// Values a card plots. Upstream failures yield an empty series so the card
/// still renders as a placeholder.
pub async fn load_series(kind: CardKind, store: &dyn DataStore, quotes: &QuoteClient) -> Vec<f64> {
    let loaded = match kind {
        CardKind::Correlation => {
            let query = Query::table(tables::CORRELATION)
                .eq("series_type", CORRELATION_SERIES)
                .order("date", Direction::Desc)
                .limit(HISTORY_POINTS);
            latest_first_column(store, &query, "value").await
        }
        CardKind::CreditBalance => {
            let query = Query::table(tables::CREDIT_BALANCE)
                .order("date", Direction::Desc)
                .limit(HISTORY_POINTS);
            latest_first_column(store, &query, "balance").await
        }
        CardKind::DailyNews => {
            let query = Query::table(tables::DAILY_NEWS)
                .order("date", Direction::Desc)
                .limit(NEWS_DAYS);
            store.select(&query).await.map(|rows| {
                rows.iter()
                    .rev()
                    .map(|row| headline_count(row) as f64)
                    .collect()
            })
        }
        CardKind::CurrencyDesk | CardKind::MarketWeather | CardKind::MoneyFlow => {
            let results = quotes.fetch_all(kind.symbols()).await;
            let changes: Vec<f64> = results
                .values()
                .filter_map(|lookup| lookup.quote().and_then(|q| q.change_percent))
                .collect();
            if changes.len() < results.len() {
                log::warn!(
                    "Only {} of {} quotes for the {} card resolved",
                    changes.len(),
                    results.len(),
                    kind
                );
            }
            return changes;
        }
    };

    loaded.unwrap_or_else(|e| {
        log::warn!("Could not load data for the {} card: {}", kind, e);
        Vec::new()
    })
}

/// Reads `column` from rows fetched newest first, returning them oldest first.
async fn latest_first_column(
    store: &dyn DataStore,
    query: &Query,
    column: &str,
) -> Result<Vec<f64>, AppError> {
    let rows = store.select(query).await?;
    Ok(rows
        .iter()
        .rev()
        .filter_map(|row| numeric(row.get(column)?))
        .collect())
}

/// Numbers stored either as JSON numbers or numeric strings.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn headline_count(row: &Value) -> usize {
    row.get("headlines")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}
