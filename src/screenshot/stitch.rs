use image::{imageops, DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::trace;

use crate::screenshot::error::CaptureError;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Reads the pixel size of an encoded screenshot
pub fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32), CaptureError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.dimensions())
}

/// A tile waiting to be composited, positioned in output pixels
#[derive(Debug, Clone)]
pub struct PlacedTile {
    pub x: u32,
    pub y: u32,
    pub png: Vec<u8>,
}

/// Opaque white canvas that tiles are pasted onto in order; later tiles win in overlaps
pub struct Compositor {
    canvas: RgbImage,
    placed: usize,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbImage::from_pixel(width.max(1), height.max(1), BACKGROUND),
            placed: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn placed(&self) -> usize {
        self.placed
    }

    /// Pastes one decoded tile; anything falling outside the canvas is clipped
    pub fn place(&mut self, tile: &DynamicImage, x: u32, y: u32) {
        let rgb = tile.to_rgb8();
        imageops::replace(&mut self.canvas, &rgb, i64::from(x), i64::from(y));
        self.placed += 1;
        trace!("Placed tile {} at ({}, {})", self.placed, x, y);
    }

    pub fn place_png(&mut self, tile: &PlacedTile) -> Result<(u32, u32), CaptureError> {
        let decoded = image::load_from_memory_with_format(&tile.png, ImageFormat::Png)?;
        let dimensions = decoded.dimensions();
        self.place(&decoded, tile.x, tile.y);
        Ok(dimensions)
    }

    /// Cuts the `(0, 0)`-anchored region out of the canvas and encodes it as PNG.
    ///
    /// The requested size is clamped to the canvas, so the result is never larger than
    /// what was composited.
    pub fn finish(self, width: u32, height: u32) -> Result<(Vec<u8>, u32, u32), CaptureError> {
        let width = width.clamp(1, self.canvas.width());
        let height = height.clamp(1, self.canvas.height());

        let region = if (width, height) == self.canvas.dimensions() {
            self.canvas
        } else {
            imageops::crop_imm(&self.canvas, 0, 0, width, height).to_image()
        };

        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(region).write_to(&mut buf, ImageFormat::Png)?;
        Ok((buf.into_inner(), width, height))
    }
}
