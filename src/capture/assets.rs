//! Embedded image resolution for captures.
//!
//! Every image referenced by a card is fetched and decoded before any pixel
//! is painted. Resolution is best-effort: a failed fetch (typically a
//! cross-origin asset without CORS headers) skips the image and the capture
//! carries on.

use image::RgbaImage;
use reqwest::Client;
use url::Url;

use super::surface::AssetRef;
use crate::constants::CACHE_BUST_PARAM;

/// Fetches and decodes the images a card surface embeds.
#[derive(Clone, Default)]
pub struct AssetLoader {
    client: Client,
}

impl AssetLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolves one asset. `nonce` is appended to remote URLs when set.
    pub async fn resolve(&self, asset: &AssetRef, nonce: Option<&str>) -> Option<RgbaImage> {
        match asset {
            AssetRef::Inline(bytes) => decode(bytes, "inline asset"),
            AssetRef::Remote(url) => {
                let request_url = match nonce {
                    Some(nonce) => cache_busted_url(url, nonce)?,
                    None => url.clone(),
                };
                let bytes = self.fetch(&request_url).await?;
                decode(&bytes, url)
            }
        }
    }

    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        log::debug!("Fetching card asset {}", url);
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Skipping card asset {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            log::warn!(
                "Skipping card asset {}: HTTP {}",
                url,
                response.status().as_u16()
            );
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                log::warn!("Skipping card asset {}: {}", url, e);
                None
            }
        }
    }
}

fn decode(bytes: &[u8], source: &str) -> Option<RgbaImage> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => Some(decoded.to_rgba8()),
        Err(e) => {
            log::warn!("Skipping card asset {}: undecodable image ({})", source, e);
            None
        }
    }
}

/// Appends the cache-busting parameter so a repeat capture refetches the asset.
pub fn cache_busted_url(url: &str, nonce: &str) -> Option<String> {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Skipping card asset {}: invalid URL ({})", url, e);
            return None;
        }
    };
    parsed
        .query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, nonce);
    Some(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode test png");
        bytes
    }

    #[test]
    fn cache_bust_appends_nonce() {
        assert_eq!(
            cache_busted_url("https://cdn.example.com/logo.png", "abc").as_deref(),
            Some("https://cdn.example.com/logo.png?cacheBust=abc")
        );
        assert_eq!(
            cache_busted_url("https://cdn.example.com/logo.png?v=2", "abc").as_deref(),
            Some("https://cdn.example.com/logo.png?v=2&cacheBust=abc")
        );
        assert!(cache_busted_url("not a url", "abc").is_none());
    }

    #[tokio::test]
    async fn inline_assets_decode() {
        let loader = AssetLoader::default();
        let image = loader
            .resolve(&AssetRef::Inline(png_bytes(4, 3)), Some("n"))
            .await
            .expect("inline png decodes");
        assert_eq!(image.dimensions(), (4, 3));
    }

    #[tokio::test]
    async fn undecodable_assets_are_skipped() {
        let loader = AssetLoader::default();
        let image = loader
            .resolve(&AssetRef::Inline(b"not an image".to_vec()), None)
            .await;
        assert!(image.is_none());
    }

    #[tokio::test]
    async fn unreachable_remote_assets_are_skipped() {
        let loader = AssetLoader::default();
        let image = loader
            .resolve(&AssetRef::Remote("http://127.0.0.1:9/logo.png".into()), Some("n"))
            .await;
        assert!(image.is_none());
    }
}
