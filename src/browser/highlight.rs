//! Outlines of picked elements drawn over a page screenshot.
//!
//! Boxes are in viewport CSS pixels as reported by the DOM snapshot, so the
//! screenshot must be a viewport capture at device scale 1.

use crate::dom::BoundingBox;
use crate::error::{PickerError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

/// One box to outline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub bounds: BoundingBox,
    /// Element under the pointer rather than a saved selection
    pub hovered: bool,
}

impl Highlight {
    pub fn saved(bounds: BoundingBox) -> Self {
        Self { bounds, hovered: false }
    }

    pub fn hovered(bounds: BoundingBox) -> Self {
        Self { bounds, hovered: true }
    }
}

/// Outline colors and width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightStyle {
    pub saved: Rgba<u8>,
    pub hovered: Rgba<u8>,
    pub thickness: u32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            saved: Rgba([0x4c, 0xaf, 0x50, 0xff]),
            hovered: Rgba([0x21, 0x96, 0xf3, 0xff]),
            thickness: 2,
        }
    }
}

/// Draw the outlines onto an image in place
pub fn draw_highlights(image: &mut RgbaImage, highlights: &[Highlight], style: &HighlightStyle) {
    let (max_w, max_h) = image.dimensions();

    for highlight in highlights {
        let bounds = highlight.bounds;
        if !bounds.is_visible() {
            continue;
        }
        let color = if highlight.hovered { style.hovered } else { style.saved };

        let x = bounds.x.round() as i32;
        let y = bounds.y.round() as i32;
        let width = bounds.width.round().max(1.0) as u32;
        let height = bounds.height.round().max(1.0) as u32;
        if x >= max_w as i32 || y >= max_h as i32 {
            continue;
        }

        // Outline grows outward so thin elements stay visible
        for ring in 0..style.thickness {
            let rect = Rect::at(x - ring as i32, y - ring as i32).of_size(width + 2 * ring, height + 2 * ring);
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

/// Decode a PNG screenshot, outline the boxes and re-encode it as PNG
pub fn highlight_png(png: &[u8], highlights: &[Highlight], style: &HighlightStyle) -> Result<Vec<u8>> {
    let mut image = image::load_from_memory(png)
        .map_err(|e| PickerError::ScreenshotFailed(format!("Failed to decode screenshot: {}", e)))?
        .to_rgba8();

    draw_highlights(&mut image, highlights, style);
    log::debug!("Outlined {} elements on screenshot", highlights.len());

    encode_png(image)
}

/// Encode an image as PNG
pub fn encode_png(image: RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .map_err(|e| PickerError::ScreenshotFailed(format!("Failed to encode screenshot: {}", e)))?;
    Ok(bytes)
}

/// Base64 form used to embed images in tool results
pub fn to_base64(png: &[u8]) -> String {
    STANDARD.encode(png)
}
