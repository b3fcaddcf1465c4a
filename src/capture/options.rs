//! Capture configuration: turns a card's theme and size into the request
//! the rasterizer consumes.

use crate::constants::{MAX_PIXEL_RATIO, MIN_PIXEL_RATIO};
use crate::types::{Rgba, Theme};

/// How large a card renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardDimensions {
    /// Fixed social-media aspect ratio; content that doesn't fit is clipped.
    Fixed { width: u32, height: u32 },
    /// Fixed width, height measured from content at capture time.
    Auto { width: u32 },
}

impl CardDimensions {
    pub fn width(&self) -> u32 {
        match self {
            Self::Fixed { width, .. } | Self::Auto { width } => *width,
        }
    }

    pub fn height(&self) -> Option<u32> {
        match self {
            Self::Fixed { height, .. } => Some(*height),
            Self::Auto { .. } => None,
        }
    }
}

/// Style adjustments applied to the capture root only, only while capturing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleOverrides {
    pub border_radius: Option<f32>,
    pub suppress_shadow: bool,
    pub reset_transform: bool,
}

/// A rendering request for one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Target width in CSS pixels.
    pub width: u32,
    /// Target height in CSS pixels; `None` means measure the content.
    pub height: Option<u32>,
    /// Device pixel ratio multiplier.
    pub pixel_ratio: f32,
    pub background: Rgba,
    pub style: StyleOverrides,
    pub cache_bust: bool,
}

impl CaptureOptions {
    /// Output size in device pixels for a given CSS height.
    pub fn output_size(&self, css_height: u32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32) * self.pixel_ratio).round().max(1.0) as u32;
        (scale(self.width), scale(css_height))
    }
}

/// Builds the capture request for a card.
///
/// The background always comes from the theme, never from whatever page the
/// card happens to sit on, and the preview transform is neutralised so the
/// card is captured at its true size.
pub fn configure(theme: Theme, dimensions: CardDimensions, pixel_ratio: f32) -> CaptureOptions {
    let pixel_ratio = if pixel_ratio.is_finite() {
        pixel_ratio.clamp(MIN_PIXEL_RATIO, MAX_PIXEL_RATIO)
    } else {
        MIN_PIXEL_RATIO
    };

    CaptureOptions {
        width: dimensions.width(),
        height: dimensions.height(),
        pixel_ratio,
        background: theme.background(),
        style: StyleOverrides {
            border_radius: Some(0.0),
            suppress_shadow: true,
            reset_transform: true,
        },
        cache_bust: true,
    }
}
