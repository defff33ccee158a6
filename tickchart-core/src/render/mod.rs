//! Candlestick rendering to PNG.
//!
//! Renders with direct pixel writes:
//! - Each bar gets an equal horizontal slot; the body spans ~60% of it
//! - Series wider than the plot keep their newest bars, one per pixel column
//! - Body: open/close range, up colour if close >= open, down colour otherwise
//! - Wick: one-pixel line from high to low through the slot centre
//! - Dashed horizontal grid across the price pane
//! - Optional volume pane in the lower quarter

pub mod canvas;
pub mod scale;
pub mod style;

pub use style::{ChartStyle, Palette};

use crate::domain::bar::{max_volume, price_bounds};
use crate::domain::PriceSeries;
use canvas::Canvas;
use scale::PriceScale;
use thiserror::Error;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const MIN_DIMENSION: u32 = 48;
pub const MAX_DIMENSION: u32 = 4096;

const MARGIN: u32 = 16;
const GRID_LINES: u32 = 5;
const PANE_GAP: u32 = 6;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot render an empty price series")]
    EmptySeries,

    #[error("Invalid chart dimensions {width}x{height} (allowed {MIN_DIMENSION}..={MAX_DIMENSION} per side)")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for CandleRenderer {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl CandleRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let renderer = Self { width, height };
        renderer.check_dimensions()?;
        Ok(renderer)
    }

    fn check_dimensions(&self) -> Result<(), RenderError> {
        let ok = |v: u32| (MIN_DIMENSION..=MAX_DIMENSION).contains(&v);
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Render the series as a PNG byte buffer.
    pub fn render(
        &self,
        series: &PriceSeries,
        style: ChartStyle,
        volume: bool,
    ) -> Result<Vec<u8>, RenderError> {
        self.check_dimensions()?;
        if series.is_empty() {
            return Err(RenderError::EmptySeries);
        }
        let palette = style.palette();
        let mut canvas = Canvas::new(self.width, self.height, palette.background);

        let left = MARGIN;
        let right = self.width - MARGIN - 1;
        let top = MARGIN;
        let bottom = self.height - MARGIN - 1;

        let plot_width = right - left - 1;
        let bars = series.latest(plot_width as usize);
        let (min, max) = price_bounds(bars).ok_or(RenderError::EmptySeries)?;

        // Volume only gets a pane when there is something to draw in it.
        let peak_volume = max_volume(bars).filter(|v| *v > 0.0 && volume);
        let (price_bottom, volume_pane) = match peak_volume {
            Some(_) => {
                let pane_height = (bottom - top) / 4;
                let volume_top = bottom - pane_height;
                (volume_top - PANE_GAP, Some((volume_top, bottom)))
            }
            None => (bottom, None),
        };

        let scale = PriceScale::new(min, max, top + 1, price_bottom - top - 1);
        for i in 0..=GRID_LINES {
            let y = top + (price_bottom - top) * i / GRID_LINES;
            canvas.dashed_hline(left, right, y, 4, palette.grid);
        }
        canvas.stroke_rect(left, top, right, price_bottom, palette.frame);

        let n = bars.len() as u32;
        let slot = (plot_width / n.max(1)).max(1);
        let body_half = slot * 3 / 10;

        for (i, bar) in bars.iter().enumerate() {
            let cx = left + 1 + slot * i as u32 + slot / 2;
            let (body, wick) = palette.candle(bar.is_up());

            let high_y = scale.to_y(bar.high.max(bar.low));
            let low_y = scale.to_y(bar.low.min(bar.high));
            canvas.vline(cx, high_y, low_y, wick);

            let body_top = scale.to_y(bar.open.max(bar.close));
            let body_bottom = scale.to_y(bar.open.min(bar.close));
            let (x0, x1) = (cx.saturating_sub(body_half), cx + body_half);
            canvas.fill_rect(x0, body_top, x1, body_bottom, body);
            if body_half > 0 {
                canvas.stroke_rect(x0, body_top, x1, body_bottom, wick);
            }
        }

        if let (Some(peak_volume), Some((volume_top, volume_bottom))) = (peak_volume, volume_pane) {
            canvas.stroke_rect(left, volume_top, right, volume_bottom, palette.frame);
            let usable = (volume_bottom - volume_top).saturating_sub(2) as f64;
            for (i, bar) in bars.iter().enumerate() {
                let Some(v) = bar.volume.filter(|v| *v > 0.0) else {
                    continue;
                };
                let cx = left + 1 + slot * i as u32 + slot / 2;
                let h = ((v / peak_volume) * usable).round().max(1.0) as u32;
                canvas.fill_rect(
                    cx.saturating_sub(body_half),
                    volume_bottom - h,
                    cx + body_half,
                    volume_bottom - 1,
                    palette.volume(bar.is_up()),
                );
            }
        }

        tracing::debug!(
            symbol = %series.symbol,
            bars = series.len(),
            drawn = bars.len(),
            %style,
            volume = volume_pane.is_some(),
            "Rendered candlestick chart"
        );

        Ok(canvas.into_png()?)
    }
}
