// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains. Reading
//! them top to bottom tells how captures are sized, how long indicators
//! linger, and how the API talks to its upstreams.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Share cards
// ---------------------------------------------------------------------------

/// Product name used as the first segment of every exported filename.
pub const PRODUCT_NAME: &str = "marketdesk";

/// Lowest device pixel ratio a capture is taken at.
pub const MIN_PIXEL_RATIO: f32 = 2.0;

/// Highest device pixel ratio a capture is taken at.
///
/// Beyond 3x the PNGs get large enough that clipboard writes stall on
/// some desktops, with no visible gain on social feeds.
pub const MAX_PIXEL_RATIO: f32 = 3.0;

/// How long the "copied" indicator stays on after a clipboard write.
pub const COPIED_INDICATOR_WINDOW: Duration = Duration::from_secs(2);

/// Upper bound on captured canvas size in pixels, per side.
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// Query parameter appended to remote assets so repeated captures refetch them.
pub const CACHE_BUST_PARAM: &str = "cacheBust";

// ---------------------------------------------------------------------------
// Dashboard API
// ---------------------------------------------------------------------------

/// Series identifier of the KOSPI / S&P 500 rolling correlation.
pub const CORRELATION_SERIES: &str = "KOSPI_SP500_20D";

/// Cache-Control header declared by the public read routes.
pub const PUBLIC_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=30";

/// How long the in-process route cache keeps a body (mirrors `s-maxage`).
pub const ROUTE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default number of news records returned by the listing route.
pub const NEWS_DEFAULT_LIMIT: usize = 30;

/// Largest page the news listing route will serve.
pub const NEWS_MAX_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Quote lookup
// ---------------------------------------------------------------------------

/// Per-symbol budget for the quote fan-out.
pub const QUOTE_TIMEOUT: Duration = Duration::from_secs(8);

/// Most symbols accepted in a single price lookup.
pub const QUOTE_MAX_SYMBOLS: usize = 20;

/// Default public CORS relay; `{url}` receives the encoded provider URL.
pub const DEFAULT_QUOTE_RELAY: &str = "https://corsproxy.io/?url={url}";

/// Default quote provider; `{symbol}` receives the encoded ticker.
pub const DEFAULT_QUOTE_PROVIDER: &str =
    "https://query1.finance.yahoo.com/v8/finance/chart/{symbol}?interval=1d&range=5d";

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
