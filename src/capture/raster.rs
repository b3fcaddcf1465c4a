//! Rasterization of card surfaces into PNG images.
//!
//! The rasterizer snapshots the mounted tree, flattens it into absolutely
//! positioned paint operations with every inherited style resolved, fetches
//! all embedded images, and only then paints. The mounted tree is never
//! touched, so capture-only style overrides cannot leak into it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use super::assets::AssetLoader;
use super::options::{CaptureOptions, StyleOverrides};
use super::surface::{AssetRef, CaptureTarget, CardNode, NodeContent, Rect, Shadow};
use crate::constants::MAX_CANVAS_SIDE;
use crate::error::AppError;
use crate::types::Rgba;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Which representation a caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterForm {
    /// Binary PNG, for clipboard and share.
    Blob,
    /// `data:` URI, for anchor-style download.
    DataUri,
}

/// An encoded PNG with its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PngImage {
    /// Decodes a PNG data URI, reading the real dimensions from the payload.
    pub fn from_data_uri(uri: &str) -> Result<Self, AppError> {
        let payload = uri.strip_prefix(DATA_URI_PREFIX).ok_or_else(|| {
            AppError::Image("Expected a data:image/png;base64 URI".to_string())
        })?;
        let bytes = STANDARD.decode(payload.trim())?;
        let (width, height) = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?
            .to_rgba8()
            .dimensions();
        Ok(Self {
            bytes,
            width,
            height,
        })
    }

    pub fn to_data_uri(&self) -> String {
        format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(&self.bytes))
    }

    /// Decodes back into RGBA pixels, for sinks that want raw pixels.
    pub fn to_rgba(&self) -> Result<RgbaImage, AppError> {
        Ok(image::load_from_memory_with_format(&self.bytes, ImageFormat::Png)?.to_rgba8())
    }
}

/// Output of one capture. Exactly one representation is produced per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterResult {
    Blob(PngImage),
    DataUri(String),
}

impl RasterResult {
    pub fn into_png(self) -> Result<PngImage, AppError> {
        match self {
            RasterResult::Blob(png) => Ok(png),
            RasterResult::DataUri(uri) => PngImage::from_data_uri(&uri),
        }
    }
}

/// The DOM-to-image capability the export pipeline consumes.
///
/// `Ok(None)` means the target was not available (unmounted before or
/// during capture); the caller treats it as "capture unavailable".
#[async_trait::async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        target: &CaptureTarget,
        options: &CaptureOptions,
        form: RasterForm,
    ) -> Result<Option<RasterResult>, AppError>;
}

/// Rasterizer for card surfaces.
#[derive(Clone, Default)]
pub struct SurfaceRasterizer {
    assets: AssetLoader,
}

impl SurfaceRasterizer {
    pub fn new(assets: AssetLoader) -> Self {
        Self { assets }
    }
}

#[async_trait::async_trait]
impl Rasterizer for SurfaceRasterizer {
    async fn rasterize(
        &self,
        target: &CaptureTarget,
        options: &CaptureOptions,
        form: RasterForm,
    ) -> Result<Option<RasterResult>, AppError> {
        let Some(tree) = target.snapshot() else {
            log::debug!("Capture target is not mounted");
            return Ok(None);
        };

        let ops = compute_paint_ops(&tree, &options.style);

        let nonce = options
            .cache_bust
            .then(|| uuid::Uuid::new_v4().simple().to_string());
        let nonce = nonce.as_deref();
        let assets = &self.assets;
        let images = join_all(ops.iter().map(|op| async move {
            match &op.image {
                Some(asset) => assets.resolve(asset, nonce).await,
                None => None,
            }
        }))
        .await;

        // Assets can take a while; the card may have gone in the meantime.
        if !target.is_mounted() {
            log::debug!("Capture target unmounted while resolving assets");
            return Ok(None);
        }

        let css_height = match options.height {
            Some(height) => height,
            None => content_height(&ops).ceil().max(1.0) as u32,
        };
        let (width, height) = options.output_size(css_height);
        if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
            return Err(AppError::Image(format!(
                "Capture of {}x{} exceeds the {} pixel canvas limit",
                width, height, MAX_CANVAS_SIDE
            )));
        }

        let background = options.background;
        let ratio = options.pixel_ratio;
        let png = tokio::task::spawn_blocking(move || {
            let canvas = paint(width, height, ratio, background, &ops, &images);
            encode_png(&canvas)
        })
        .await??;

        log::debug!("Rasterized card at {}x{}", png.width, png.height);

        Ok(Some(match form {
            RasterForm::Blob => RasterResult::Blob(png),
            RasterForm::DataUri => RasterResult::DataUri(png.to_data_uri()),
        }))
    }
}

/// A node with every style resolved to absolute CSS-pixel terms.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PaintOp {
    pub rect: Rect,
    pub background: Option<Rgba>,
    pub radius: f32,
    pub shadow: Option<Shadow>,
    pub image: Option<AssetRef>,
    pub opacity: f32,
}

/// Flattens the tree, applying capture overrides to the root only.
pub(crate) fn compute_paint_ops(tree: &CardNode, overrides: &StyleOverrides) -> Vec<PaintOp> {
    let mut root = tree.clone();
    root.rect.x = 0.0;
    root.rect.y = 0.0;
    if overrides.reset_transform {
        root.style.scale = 1.0;
    }
    if overrides.suppress_shadow {
        root.style.shadow = None;
    }
    if let Some(radius) = overrides.border_radius {
        root.style.border_radius = radius;
    }

    let mut ops = Vec::new();
    flatten(&root, (0.0, 0.0), 1.0, 1.0, &mut ops);
    ops
}

fn flatten(
    node: &CardNode,
    origin: (f32, f32),
    parent_scale: f32,
    parent_opacity: f32,
    out: &mut Vec<PaintOp>,
) {
    let scale = parent_scale * node.style.scale;
    let opacity = parent_opacity * node.style.opacity.clamp(0.0, 1.0);
    let x = origin.0 + node.rect.x * parent_scale;
    let y = origin.1 + node.rect.y * parent_scale;

    out.push(PaintOp {
        rect: Rect::new(x, y, node.rect.width * scale, node.rect.height * scale),
        background: node.style.background,
        radius: node.style.border_radius * scale,
        shadow: node.style.shadow.map(|s| Shadow {
            offset_x: s.offset_x * scale,
            offset_y: s.offset_y * scale,
            color: s.color,
        }),
        image: match &node.content {
            NodeContent::Image(asset) => Some(asset.clone()),
            NodeContent::None => None,
        },
        opacity,
    });

    for child in &node.children {
        flatten(child, (x, y), scale, opacity, out);
    }
}

fn content_height(ops: &[PaintOp]) -> f32 {
    ops.iter().map(|op| op.rect.bottom()).fold(0.0, f32::max)
}

fn paint(
    width: u32,
    height: u32,
    ratio: f32,
    background: Rgba,
    ops: &[PaintOp],
    images: &[Option<RgbaImage>],
) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, image::Rgba(background.to_array()));

    for (op, image) in ops.iter().zip(images) {
        let device = Rect::new(
            op.rect.x * ratio,
            op.rect.y * ratio,
            op.rect.width * ratio,
            op.rect.height * ratio,
        );
        let radius = op.radius * ratio;

        if let Some(shadow) = op.shadow {
            let offset = Rect::new(
                device.x + shadow.offset_x * ratio,
                device.y + shadow.offset_y * ratio,
                device.width,
                device.height,
            );
            fill_rounded_rect(&mut canvas, offset, radius, shadow.color.with_opacity(op.opacity));
        }

        if let Some(color) = op.background {
            fill_rounded_rect(&mut canvas, device, radius, color.with_opacity(op.opacity));
        }

        if let Some(image) = image {
            draw_image(&mut canvas, device, image, op.opacity);
        }
    }

    canvas
}

/// Fills a rectangle with anti-aliased rounded corners, clipped to the canvas.
fn fill_rounded_rect(canvas: &mut RgbaImage, rect: Rect, radius: f32, color: Rgba) {
    if color.is_transparent() || rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let radius = radius.clamp(0.0, rect.width.min(rect.height) / 2.0);
    let Some((x0, y0, x1, y1)) = pixel_bounds(canvas, rect) else {
        return;
    };

    for py in y0..y1 {
        for px in x0..x1 {
            let cx = px as f32 + 0.5;
            let cy = py as f32 + 0.5;
            let coverage = corner_coverage(rect, radius, cx, cy);
            if coverage > 0.0 {
                blend(canvas.get_pixel_mut(px, py), color.to_array(), coverage);
            }
        }
    }
}

fn corner_coverage(rect: Rect, radius: f32, cx: f32, cy: f32) -> f32 {
    if radius <= 0.0 {
        return 1.0;
    }
    let left = rect.x + radius;
    let right = rect.x + rect.width - radius;
    let top = rect.y + radius;
    let bottom = rect.y + rect.height - radius;

    let dx = if cx < left {
        left - cx
    } else if cx > right {
        cx - right
    } else {
        0.0
    };
    let dy = if cy < top {
        top - cy
    } else if cy > bottom {
        cy - bottom
    } else {
        0.0
    };
    if dx == 0.0 || dy == 0.0 {
        return 1.0;
    }
    let distance = (dx * dx + dy * dy).sqrt();
    (radius - distance + 0.5).clamp(0.0, 1.0)
}

fn draw_image(canvas: &mut RgbaImage, rect: Rect, image: &RgbaImage, opacity: f32) {
    let target_w = rect.width.round() as u32;
    let target_h = rect.height.round() as u32;
    if target_w == 0 || target_h == 0 {
        return;
    }
    let scaled = image::imageops::resize(image, target_w, target_h, FilterType::Triangle);
    let origin_x = rect.x.round() as i64;
    let origin_y = rect.y.round() as i64;

    for (sx, sy, pixel) in scaled.enumerate_pixels() {
        let px = origin_x + sx as i64;
        let py = origin_y + sy as i64;
        if px < 0 || py < 0 || px >= canvas.width() as i64 || py >= canvas.height() as i64 {
            continue;
        }
        blend(canvas.get_pixel_mut(px as u32, py as u32), pixel.0, opacity);
    }
}

fn pixel_bounds(canvas: &RgbaImage, rect: Rect) -> Option<(u32, u32, u32, u32)> {
    let clamp_x = |v: f32| v.clamp(0.0, canvas.width() as f32) as u32;
    let clamp_y = |v: f32| v.clamp(0.0, canvas.height() as f32) as u32;
    let x0 = clamp_x(rect.x.floor());
    let y0 = clamp_y(rect.y.floor());
    let x1 = clamp_x((rect.x + rect.width).ceil());
    let y1 = clamp_y((rect.y + rect.height).ceil());
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Source-over compositing with straight alpha.
fn blend(dst: &mut image::Rgba<u8>, src: [u8; 4], coverage: f32) {
    let sa = (src[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for i in 0..3 {
        let sc = src[i] as f32;
        let dc = dst.0[i] as f32;
        let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst.0[i] = out.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn encode_png(canvas: &RgbaImage) -> Result<PngImage, AppError> {
    let mut bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(PngImage {
        bytes,
        width: canvas.width(),
        height: canvas.height(),
    })
}
