//! Chart styles and their colour palettes.
//!
//! Colours loosely follow the classic candlestick presets:
//! - **charles**: white background, green up / red down (default)
//! - **classic**: white background, hollow-looking white up bodies, black down
//! - **yahoo**: light grey background, teal up / coral down
//! - **nightclouds**: dark background, white up / steel down
//! - **binance**: near-black background, binance green / red

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartStyle {
    #[default]
    Charles,
    Classic,
    Yahoo,
    Nightclouds,
    Binance,
}

impl ChartStyle {
    pub const ALL: [ChartStyle; 5] = [
        ChartStyle::Charles,
        ChartStyle::Classic,
        ChartStyle::Yahoo,
        ChartStyle::Nightclouds,
        ChartStyle::Binance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartStyle::Charles => "charles",
            ChartStyle::Classic => "classic",
            ChartStyle::Yahoo => "yahoo",
            ChartStyle::Nightclouds => "nightclouds",
            ChartStyle::Binance => "binance",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            ChartStyle::Charles => Palette {
                background: Rgb([255, 255, 255]),
                grid: Rgb([220, 220, 220]),
                frame: Rgb([128, 128, 128]),
                up_body: Rgb([0, 150, 70]),
                up_wick: Rgb([0, 110, 50]),
                down_body: Rgb([200, 30, 30]),
                down_wick: Rgb([150, 20, 20]),
                volume_up: Rgb([140, 200, 160]),
                volume_down: Rgb([225, 150, 150]),
            },
            ChartStyle::Classic => Palette {
                background: Rgb([255, 255, 255]),
                grid: Rgb([225, 225, 225]),
                frame: Rgb([0, 0, 0]),
                up_body: Rgb([245, 245, 245]),
                up_wick: Rgb([0, 0, 0]),
                down_body: Rgb([0, 0, 0]),
                down_wick: Rgb([0, 0, 0]),
                volume_up: Rgb([190, 190, 190]),
                volume_down: Rgb([90, 90, 90]),
            },
            ChartStyle::Yahoo => Palette {
                background: Rgb([245, 246, 248]),
                grid: Rgb([214, 218, 224]),
                frame: Rgb([150, 155, 165]),
                up_body: Rgb([0, 178, 152]),
                up_wick: Rgb([0, 140, 120]),
                down_body: Rgb([255, 82, 82]),
                down_wick: Rgb([210, 60, 60]),
                volume_up: Rgb([150, 220, 208]),
                volume_down: Rgb([255, 180, 180]),
            },
            ChartStyle::Nightclouds => Palette {
                background: Rgb([10, 10, 35]),
                grid: Rgb([45, 45, 80]),
                frame: Rgb([120, 120, 160]),
                up_body: Rgb([240, 240, 240]),
                up_wick: Rgb([240, 240, 240]),
                down_body: Rgb([60, 110, 180]),
                down_wick: Rgb([60, 110, 180]),
                volume_up: Rgb([150, 150, 170]),
                volume_down: Rgb([45, 80, 130]),
            },
            ChartStyle::Binance => Palette {
                background: Rgb([22, 26, 30]),
                grid: Rgb([43, 49, 57]),
                frame: Rgb([94, 102, 115]),
                up_body: Rgb([14, 203, 129]),
                up_wick: Rgb([14, 203, 129]),
                down_body: Rgb([246, 70, 93]),
                down_wick: Rgb([246, 70, 93]),
                volume_up: Rgb([10, 110, 72]),
                volume_down: Rgb([130, 40, 52]),
            },
        }
    }
}

impl fmt::Display for ChartStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ChartStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = ChartStyle::ALL.iter().map(ChartStyle::as_str).collect();
                format!("unknown style '{s}' (valid: {})", valid.join(", "))
            })
    }
}

/// Colours used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb<u8>,
    pub grid: Rgb<u8>,
    pub frame: Rgb<u8>,
    pub up_body: Rgb<u8>,
    pub up_wick: Rgb<u8>,
    pub down_body: Rgb<u8>,
    pub down_wick: Rgb<u8>,
    pub volume_up: Rgb<u8>,
    pub volume_down: Rgb<u8>,
}

impl Palette {
    /// Body and wick colour for a bar direction.
    pub fn candle(&self, is_up: bool) -> (Rgb<u8>, Rgb<u8>) {
        if is_up {
            (self.up_body, self.up_wick)
        } else {
            (self.down_body, self.down_wick)
        }
    }

    pub fn volume(&self, is_up: bool) -> Rgb<u8> {
        if is_up {
            self.volume_up
        } else {
            self.volume_down
        }
    }
}
