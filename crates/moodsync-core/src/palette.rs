//! Color extraction: image reference in, ordered palette out.

use crate::color::Rgba;
use crate::store::BoxFuture;
use thiserror::Error;

/// Palette extraction errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Cannot read pixels from: {0}")]
    UnsupportedSource(String),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Image decode error: {0}")]
    Image(#[from] ::image::ImageError),
    #[error("Image has no opaque pixels")]
    Empty,
}

/// Result type for palette extraction.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Turns an image reference into an ordered list of colors.
#[cfg(not(target_arch = "wasm32"))]
pub trait PaletteExtractor: Send + Sync {
    fn extract<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ExtractResult<Vec<Rgba>>>;
}

/// Turns an image reference into an ordered list of colors (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait PaletteExtractor {
    fn extract<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ExtractResult<Vec<Rgba>>>;
}

/// Placeholder palettes used when no pixel data is available.
pub const PLACEHOLDER_PALETTES: [[Rgba; 4]; 5] = [
    [
        Rgba::rgb(0xFF, 0x6B, 0x6B),
        Rgba::rgb(0x4E, 0xCD, 0xC4),
        Rgba::rgb(0x45, 0xB7, 0xD1),
        Rgba::rgb(0x96, 0xCE, 0xB4),
    ],
    [
        Rgba::rgb(0x5B, 0x4C, 0xFF),
        Rgba::rgb(0xFF, 0x6B, 0x6B),
        Rgba::rgb(0x4E, 0xCD, 0xC4),
        Rgba::rgb(0xFF, 0xD9, 0x3D),
    ],
    [
        Rgba::rgb(0xE7, 0x4C, 0x3C),
        Rgba::rgb(0xF3, 0x9C, 0x12),
        Rgba::rgb(0x27, 0xAE, 0x60),
        Rgba::rgb(0x34, 0x98, 0xDB),
    ],
    [
        Rgba::rgb(0x9B, 0x59, 0xB6),
        Rgba::rgb(0xE6, 0x7E, 0x22),
        Rgba::rgb(0x1A, 0xBC, 0x9C),
        Rgba::rgb(0xF1, 0xC4, 0x0F),
    ],
    [
        Rgba::rgb(0x34, 0x49, 0x5E),
        Rgba::rgb(0xE7, 0x4C, 0x3C),
        Rgba::rgb(0xEC, 0xF0, 0xF1),
        Rgba::rgb(0x95, 0xA5, 0xA6),
    ],
];

/// Picks one of the placeholder palettes from a hash of the reference.
///
/// The same reference always yields the same palette.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPaletteExtractor;

impl FixedPaletteExtractor {
    pub fn palette_for(url: &str) -> Vec<Rgba> {
        // FNV-1a, stable across platforms and toolchains.
        let hash = url.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
        });
        let index = (hash % PLACEHOLDER_PALETTES.len() as u64) as usize;
        PLACEHOLDER_PALETTES[index].to_vec()
    }
}

impl PaletteExtractor for FixedPaletteExtractor {
    fn extract<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ExtractResult<Vec<Rgba>>> {
        Box::pin(async move { Ok(Self::palette_for(url)) })
    }
}

/// Median-cut palette from the pixels of a `data:` URL.
#[derive(Debug, Clone, Copy)]
pub struct PixelPaletteExtractor {
    /// Upper bound on the number of colors returned.
    pub max_colors: usize,
    /// Images are downsampled to fit this square before analysis.
    pub sample_size: u32,
}

impl Default for PixelPaletteExtractor {
    fn default() -> Self {
        Self {
            max_colors: 4,
            sample_size: 64,
        }
    }
}

impl PixelPaletteExtractor {
    /// Decode the base64 payload of a `data:` URL.
    pub fn decode_data_url(url: &str) -> ExtractResult<Vec<u8>> {
        use base64::{Engine, engine::general_purpose::STANDARD};

        let (header, payload) = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| ExtractError::UnsupportedSource(truncate(url)))?;
        if !header.ends_with(";base64") {
            return Err(ExtractError::UnsupportedSource(truncate(url)));
        }
        Ok(STANDARD.decode(payload.trim())?)
    }

    /// Palette of encoded image bytes (PNG, JPEG or WebP).
    pub fn analyze(&self, bytes: &[u8]) -> ExtractResult<Vec<Rgba>> {
        let mut decoded = ::image::load_from_memory(bytes)?;
        if decoded.width() > self.sample_size || decoded.height() > self.sample_size {
            decoded = decoded.thumbnail(self.sample_size, self.sample_size);
        }
        let pixels: Vec<[u8; 3]> = decoded
            .to_rgba8()
            .pixels()
            .filter(|p| p.0[3] >= 128)
            .map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();
        if pixels.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(median_cut(pixels, self.max_colors.max(1)))
    }
}

impl PaletteExtractor for PixelPaletteExtractor {
    fn extract<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ExtractResult<Vec<Rgba>>> {
        Box::pin(async move {
            let bytes = Self::decode_data_url(url)?;
            self.analyze(&bytes)
        })
    }
}

fn truncate(url: &str) -> String {
    url.chars().take(48).collect()
}

/// Split the pixel set along its widest channel until `max_colors` boxes
/// exist or no box can be split. Colors are the box averages, most
/// populous first.
fn median_cut(pixels: Vec<[u8; 3]>, max_colors: usize) -> Vec<Rgba> {
    let mut boxes = vec![pixels];

    while boxes.len() < max_colors {
        let widest = boxes
            .iter()
            .enumerate()
            .filter(|(_, pixels)| pixels.len() > 1)
            .map(|(index, pixels)| {
                let (channel, range) = widest_channel(pixels);
                (index, channel, range)
            })
            .filter(|&(_, _, range)| range > 0)
            .max_by_key(|&(_, _, range)| range);
        let Some((index, channel, _)) = widest else {
            break;
        };

        let mut pixels = boxes.swap_remove(index);
        pixels.sort_unstable_by_key(|p| p[channel]);
        let upper = pixels.split_off(pixels.len() / 2);
        boxes.push(pixels);
        boxes.push(upper);
    }

    boxes.sort_by_key(|pixels| std::cmp::Reverse(pixels.len()));
    let mut palette: Vec<Rgba> = Vec::with_capacity(boxes.len());
    for pixels in &boxes {
        let color = average(pixels);
        if !palette.contains(&color) {
            palette.push(color);
        }
    }
    palette
}

fn widest_channel(pixels: &[[u8; 3]]) -> (usize, u8) {
    (0..3)
        .map(|channel| {
            let (min, max) = pixels.iter().fold((u8::MAX, u8::MIN), |(min, max), p| {
                (min.min(p[channel]), max.max(p[channel]))
            });
            (channel, max - min)
        })
        .max_by_key(|&(_, range)| range)
        .unwrap_or((0, 0))
}

fn average(pixels: &[[u8; 3]]) -> Rgba {
    let count = pixels.len().max(1) as u64;
    let mut sums = [0u64; 3];
    for p in pixels {
        for (sum, value) in sums.iter_mut().zip(p) {
            *sum += u64::from(*value);
        }
    }
    let channel = |sum: u64| ((sum + count / 2) / count) as u8;
    Rgba::rgb(channel(sums[0]), channel(sums[1]), channel(sums[2]))
}
