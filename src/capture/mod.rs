//! Share-card capture: configuring a capture and turning a mounted card
//! surface into PNG bytes.

mod assets;
mod options;
mod raster;
mod surface;

pub use assets::{cache_busted_url, AssetLoader};
pub use options::{configure, CaptureOptions, CardDimensions, StyleOverrides};
pub use raster::{PngImage, RasterForm, RasterResult, Rasterizer, SurfaceRasterizer};
pub use surface::{
    AssetRef, CaptureTarget, CardMount, CardNode, NodeContent, NodeStyle, Rect, Shadow,
};
