//! ICO container parsing.
//!
//! An ICO file is a 6-byte header followed by one 16-byte directory entry per
//! embedded image. Each entry points at either a PNG stream or a headerless
//! BMP (DIB) with a trailing AND mask. We read the directory ourselves so the
//! entry with the largest declared dimensions can be chosen explicitly, then
//! hand that single entry to the `image` crate for pixel decoding.

use crate::{Error, Result};
use image::{DynamicImage, ImageFormat};

const HEADER_LEN: usize = 6;
const ENTRY_LEN: usize = 16;
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Payload encoding of an embedded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcoPayload {
    Png,
    Bmp,
}

/// One directory entry of an ICO file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcoEntry {
    /// Position in the directory
    pub index: usize,
    /// Declared width in pixels (a stored 0 means 256)
    pub width: u32,
    /// Declared height in pixels (a stored 0 means 256)
    pub height: u32,
    pub bit_count: u16,
    /// Byte range of the payload inside the file
    pub offset: usize,
    pub size: usize,
    pub payload: IcoPayload,
}

impl IcoEntry {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

fn u16_at(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn u32_at(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn dimension(raw: u8) -> u32 {
    if raw == 0 {
        256
    } else {
        raw as u32
    }
}

/// Whether `data` starts with an ICO header.
pub fn looks_like_ico(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN && data[..4] == [0, 0, 1, 0]
}

/// Parse the directory of an ICO file. Entries whose payload range falls
/// outside the file are dropped.
pub fn read_directory(data: &[u8]) -> Result<Vec<IcoEntry>> {
    if data.len() < HEADER_LEN {
        return Err(Error::AssetError("ICO data too short for header".into()));
    }
    if u16_at(data, 0) != 0 || u16_at(data, 2) != 1 {
        return Err(Error::AssetError("not an ICO file".into()));
    }

    let count = u16_at(data, 4) as usize;
    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let at = HEADER_LEN + index * ENTRY_LEN;
        if at + ENTRY_LEN > data.len() {
            break;
        }
        let size = u32_at(data, at + 8) as usize;
        let offset = u32_at(data, at + 12) as usize;
        let Some(bytes) = offset
            .checked_add(size)
            .and_then(|end| data.get(offset..end))
        else {
            log::debug!("skipping ICO entry {} with out-of-range payload", index);
            continue;
        };

        entries.push(IcoEntry {
            index,
            width: dimension(data[at]),
            height: dimension(data[at + 1]),
            bit_count: u16_at(data, at + 6),
            offset,
            size,
            payload: if bytes.starts_with(PNG_MAGIC) {
                IcoPayload::Png
            } else {
                IcoPayload::Bmp
            },
        });
    }

    if entries.is_empty() {
        return Err(Error::AssetError("ICO file contains no images".into()));
    }
    Ok(entries)
}

/// Pick the highest-resolution entry: largest width×height, then the higher
/// bit depth, then the later entry.
pub fn select_largest(entries: &[IcoEntry]) -> Option<&IcoEntry> {
    entries
        .iter()
        .max_by_key(|e| (e.area(), e.bit_count, e.index))
}

/// Decode a single entry to pixels.
pub fn decode_entry(data: &[u8], entry: &IcoEntry) -> Result<DynamicImage> {
    let bytes = &data[entry.offset..entry.offset + entry.size];
    match entry.payload {
        IcoPayload::Png => Ok(image::load_from_memory_with_format(
            bytes,
            ImageFormat::Png,
        )?),
        IcoPayload::Bmp => {
            // Re-wrap the entry as a one-image ICO so the DIB and its AND mask
            // are decoded by the same code path that handles whole files.
            let mut single = Vec::with_capacity(HEADER_LEN + ENTRY_LEN + bytes.len());
            single.extend_from_slice(&[0, 0, 1, 0, 1, 0]);
            let dir_at = HEADER_LEN + entry.index * ENTRY_LEN;
            single.extend_from_slice(&data[dir_at..dir_at + 12]);
            single.extend_from_slice(&((HEADER_LEN + ENTRY_LEN) as u32).to_le_bytes());
            single.extend_from_slice(bytes);
            Ok(image::load_from_memory_with_format(
                &single,
                ImageFormat::Ico,
            )?)
        }
    }
}

/// Decode the highest-resolution image embedded in an ICO file.
pub fn decode_largest(data: &[u8]) -> Result<DynamicImage> {
    let entries = read_directory(data)?;
    let entry = select_largest(&entries)
        .ok_or_else(|| Error::AssetError("ICO file contains no images".into()))?;
    log::debug!(
        "ICO has {} entries; using #{} ({}x{}, {} bpp, {:?})",
        entries.len(),
        entry.index,
        entry.width,
        entry.height,
        entry.bit_count,
        entry.payload
    );
    decode_entry(data, entry)
}

/// Assemble ICO bytes from PNG-encoded images. Test helper shared with the
/// favicon module.
#[cfg(test)]
pub(crate) fn build_ico(images: &[(u8, u8, Vec<u8>)]) -> Vec<u8> {
    let mut out = vec![0, 0, 1, 0];
    out.extend_from_slice(&(images.len() as u16).to_le_bytes());
    let mut offset = HEADER_LEN + images.len() * ENTRY_LEN;
    for (w, h, png) in images {
        out.extend_from_slice(&[*w, *h, 0, 0]);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&32u16.to_le_bytes());
        out.extend_from_slice(&(png.len() as u32).to_le_bytes());
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += png.len();
    }
    for (_, _, png) in images {
        out.extend_from_slice(png);
    }
    out
}

#[cfg(test)]
pub(crate) fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}
