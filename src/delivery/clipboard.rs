//! Image clipboard writes.
//!
//! arboard is tried first. On Linux, where arboard can lose ownership races
//! with clipboard managers, the PNG is handed to `wl-copy` or `xclip` as a
//! fallback.

use std::borrow::Cow;

use crate::capture::PngImage;
use crate::error::AppError;

/// A clipboard that may accept image writes.
pub trait ClipboardSink: Send + Sync {
    /// Whether image MIME types can be written at all.
    fn supports_images(&self) -> bool;

    fn write_image(&self, png: &PngImage) -> Result<(), AppError>;
}

/// The desktop system clipboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    /// Feature-detects a usable clipboard; `None` on headless hosts.
    pub fn probe() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(_) => Some(Self),
            Err(e) => {
                log::debug!("No system clipboard available: {}", e);
                None
            }
        }
    }
}

impl ClipboardSink for SystemClipboard {
    fn supports_images(&self) -> bool {
        true
    }

    fn write_image(&self, png: &PngImage) -> Result<(), AppError> {
        log::debug!(
            "Copying {}x{} image ({} bytes) to clipboard",
            png.width,
            png.height,
            png.bytes.len()
        );

        match try_arboard_clipboard(png) {
            Ok(()) => {
                log::info!("Image copied to clipboard using arboard");
                return Ok(());
            }
            Err(e) => {
                log::debug!("Arboard failed: {}, trying platform-specific methods", e);
            }
        }

        let result = copy_with_platform_command(&png.bytes);

        match &result {
            Ok(()) => log::info!("Image copied to clipboard using platform command"),
            Err(e) => log::error!("Failed to copy image to clipboard: {}", e),
        }

        result
    }
}

fn try_arboard_clipboard(png: &PngImage) -> Result<(), AppError> {
    let rgba = png.to_rgba()?;
    let (width, height) = rgba.dimensions();

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| AppError::Clipboard(format!("Failed to access clipboard: {}", e)))?;

    clipboard
        .set_image(arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(rgba.into_raw()),
        })
        .map_err(|e| AppError::Clipboard(format!("Failed to set clipboard image: {}", e)))?;

    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_with_platform_command(png: &[u8]) -> Result<(), AppError> {
    let is_wayland = std::env::var("WAYLAND_DISPLAY").is_ok()
        || std::env::var("XDG_SESSION_TYPE").is_ok_and(|s| s == "wayland");

    if is_wayland {
        pipe_to_command("wl-copy", &["--type", "image/png"], png)
    } else {
        pipe_to_command(
            "xclip",
            &["-selection", "clipboard", "-t", "image/png"],
            png,
        )
    }
}

#[cfg(not(target_os = "linux"))]
fn copy_with_platform_command(_png: &[u8]) -> Result<(), AppError> {
    Err(AppError::Clipboard(
        "No image clipboard fallback on this platform".to_string(),
    ))
}

/// Writes the PNG to a clipboard helper's stdin and waits for it.
#[cfg(target_os = "linux")]
fn pipe_to_command(program: &str, args: &[&str], bytes: &[u8]) -> Result<(), AppError> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    log::debug!("Attempting to copy with {}", program);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AppError::Clipboard(format!("Failed to spawn {}: {}", program, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(bytes)
            .map_err(|e| AppError::Clipboard(format!("Failed to write to {}: {}", program, e)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| AppError::Clipboard(format!("Failed to wait for {}: {}", program, e)))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(AppError::Clipboard(format!("{} failed: {}", program, stderr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires clipboard access
    fn test_clipboard_image_write() {
        let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let png = PngImage {
            bytes,
            width: 8,
            height: 8,
        };
        let clipboard = SystemClipboard::probe().expect("clipboard available");
        assert!(clipboard.write_image(&png).is_ok());
    }
}
