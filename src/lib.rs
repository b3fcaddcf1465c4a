// src/lib.rs
//! marketdesk library: share-card export for the market dashboard and the
//! read-only API the dashboard reads from.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `Config`, `CommandLineInput`
//! - **Capture**: `configure`, `CaptureOptions`, `Rasterizer`, `CardMount`
//! - **Delivery**: `ShareCard`, `Environment`, `ExportAction`, `ExportOutcome`
//! - **Cards**: `CardKind`, `layout`, `load_series`
//! - **Data**: `DataStore`, `Query`, `RestStore`, `MemoryStore`, `QuoteClient`
//! - **Server**: `router`, `AppState`, `TagCache`
//! - **Audio**: `AudioSession`

pub mod audio;
pub mod capture;
pub mod cards;
pub mod config;
pub mod constants;
pub mod delivery;
pub mod error;
pub mod error_recovery;
pub mod pipeline;
pub mod quotes;
pub mod server;
pub mod store;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, StoreErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, Config};

// --- Domain Types ---
pub use crate::types::{Palette, Rgba, StoreKey, Symbol, Theme, TradingDate, ValidatedUrl};

// --- Capture ---
pub use crate::capture::{
    configure, CaptureOptions, CaptureTarget, CardDimensions, CardMount, CardNode, PngImage,
    RasterForm, RasterResult, Rasterizer, SurfaceRasterizer,
};

// --- Delivery ---
pub use crate::delivery::{
    CardMeta, Environment, ExportAction, ExportOutcome, ExportState, ShareCapability, ShareCard,
};

// --- Cards & Pipeline ---
pub use crate::cards::{layout, load_series, CardKind};
pub use crate::pipeline::{DashboardData, ExportPipeline, ExportReport, ExportRequest, SeriesSource};

// --- Data ---
pub use crate::quotes::{Quote, QuoteClient, QuoteLookup};
pub use crate::store::{DataStore, Direction, MemoryStore, Query, RestStore};

// --- Server ---
pub use crate::server::{router, AppState, TagCache};

// --- Audio ---
pub use crate::audio::{AudioBackend, AudioHandle, AudioSession};
