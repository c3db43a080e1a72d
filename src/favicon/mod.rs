//! Favicon fetching and normalization.
//!
//! Whatever the site serves (PNG, multi-resolution ICO, JPEG, ...) ends up as
//! a square RGBA bitmap with the icon scaled to fit and the remainder left
//! fully transparent.

pub mod ico;

use crate::{Error, Result};
use base64::Engine as _;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use log::debug;

/// Default edge length of the decoded favicon.
pub const DEFAULT_ICON_SIZE: u32 = 100;

/// A decoded, letterboxed favicon ready to be drawn onto a card.
pub type FaviconBitmap = RgbaImage;

/// Fetch the raw favicon bytes.
///
/// `data:` URLs are decoded in-process; anything else goes over HTTP. A
/// transport failure or a non-2xx status is an error and is not retried.
pub async fn fetch_favicon(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    if let Some(data_url) = url.strip_prefix("data:") {
        return decode_data_url(data_url).map(|(_, bytes)| bytes);
    }

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::NetworkError(format!("Favicon GET {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::NetworkError(format!(
            "Favicon GET {} returned HTTP {}",
            url,
            status.as_u16()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::NetworkError(format!("Failed to read favicon body: {}", e)))?;
    debug!("fetched favicon {} ({} bytes)", url, bytes.len());
    Ok(bytes.to_vec())
}

/// Split the part of a data URL after `data:` into its MIME type and payload.
fn decode_data_url(rest: &str) -> Result<(String, Vec<u8>)> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::AssetError("malformed data URL".into()))?;
    let mime = meta.split(';').next().unwrap_or_default().to_ascii_lowercase();

    let bytes = if meta.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| Error::AssetError(format!("invalid base64 in data URL: {}", e)))?
    } else {
        percent_encoding::percent_decode_str(payload).collect()
    };
    Ok((mime, bytes))
}

/// The lowercase file extension that selects the decode path.
///
/// Only the URL path is considered, so `favicon.ICO?v=3` yields `ico`. For
/// `data:` URLs the MIME type stands in for the extension.
pub fn favicon_extension(favicon_url: &str) -> Option<String> {
    if let Some(rest) = favicon_url.strip_prefix("data:") {
        let mime = rest.split([';', ',']).next()?.to_ascii_lowercase();
        return match mime.as_str() {
            "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico".to_string()),
            other => other.strip_prefix("image/").map(str::to_string),
        };
    }

    let path = match url::Url::parse(favicon_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => favicon_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Decode favicon bytes and fit them into a `size`×`size` transparent square.
///
/// ICO containers are recognized by extension, or by their header when the
/// URL carries none (`/favicon?v=2`, extensionless CDN paths).
pub fn decode_favicon(favicon_url: &str, bytes: &[u8], size: u32) -> Result<FaviconBitmap> {
    let source = match favicon_extension(favicon_url).as_deref() {
        Some("ico") => ico::decode_largest(bytes)?,
        None if ico::looks_like_ico(bytes) => ico::decode_largest(bytes)?,
        _ => image::load_from_memory(bytes)?,
    };
    contain(&source, size)
}

/// Scale `source` to fit entirely inside a `size`×`size` square, centered,
/// with fully transparent padding.
pub fn contain(source: &DynamicImage, size: u32) -> Result<FaviconBitmap> {
    if size == 0 {
        return Err(Error::ConfigError("favicon size must be positive".into()));
    }
    let (w, h) = (source.width(), source.height());
    if w == 0 || h == 0 {
        return Err(Error::AssetError("favicon has no pixels".into()));
    }

    let scale = (size as f64 / w as f64).min(size as f64 / h as f64);
    let fit_w = ((w as f64 * scale).round() as u32).clamp(1, size);
    let fit_h = ((h as f64 * scale).round() as u32).clamp(1, size);

    let resized = imageops::resize(&source.to_rgba8(), fit_w, fit_h, FilterType::Lanczos3);
    let mut square = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    imageops::replace(
        &mut square,
        &resized,
        ((size - fit_w) / 2) as i64,
        ((size - fit_h) / 2) as i64,
    );
    Ok(square)
}

/// Fetch and decode in one step.
pub async fn load_favicon(
    client: &reqwest::Client,
    favicon_url: &str,
    size: u32,
) -> Result<FaviconBitmap> {
    let bytes = fetch_favicon(client, favicon_url).await?;
    decode_favicon(favicon_url, &bytes, size)
}
