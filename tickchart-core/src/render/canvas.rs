//! Minimal RGB canvas with clipped primitive drawing.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub struct Canvas {
    img: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, background),
        }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    fn put(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        if x < self.img.width() && y < self.img.height() {
            self.img.put_pixel(x, y, color);
        }
    }

    /// Fill the inclusive rectangle spanning both corners.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        for y in y0..=y1.min(self.height().saturating_sub(1)) {
            for x in x0..=x1.min(self.width().saturating_sub(1)) {
                self.put(x, y, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
        self.hline(x0, x1, y0, color);
        self.hline(x0, x1, y1, color);
        self.vline(x0, y0, y1, color);
        self.vline(x1, y0, y1, color);
    }

    pub fn hline(&mut self, x0: u32, x1: u32, y: u32, color: Rgb<u8>) {
        self.fill_rect(x0, y, x1, y, color);
    }

    pub fn vline(&mut self, x: u32, y0: u32, y1: u32, color: Rgb<u8>) {
        self.fill_rect(x, y0, x, y1, color);
    }

    /// Horizontal line drawn as `dash` pixels on, `dash` pixels off.
    pub fn dashed_hline(&mut self, x0: u32, x1: u32, y: u32, dash: u32, color: Rgb<u8>) {
        let dash = dash.max(1);
        for x in x0.min(x1)..=x0.max(x1) {
            if (x - x0.min(x1)) / dash % 2 == 0 {
                self.put(x, y, color);
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        self.img.get_pixel_checked(x, y).copied()
    }

    /// Encode as PNG.
    pub fn into_png(self) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Vec::new();
        self.img
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}
