//! Price → pixel mapping.

/// Linear vertical scale over a padded price range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceScale {
    lower: f64,
    upper: f64,
    /// Top pixel row of the plot area.
    top: u32,
    height: u32,
}

impl PriceScale {
    /// Scale covering `[min, max]` padded by 5% on each side. A flat range
    /// gets a padding of 1.0 so it still has height.
    pub fn new(min: f64, max: f64, top: u32, height: u32) -> Self {
        let range = max - min;
        let pad = if range > 0.0 { range * 0.05 } else { 1.0 };
        Self {
            lower: min - pad,
            upper: max + pad,
            top,
            height,
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Pixel row for a price; higher prices are nearer the top. Clamped to the plot.
    pub fn to_y(&self, price: f64) -> u32 {
        if (self.upper - self.lower).abs() < 1e-9 || self.height == 0 {
            return self.top;
        }
        let last = self.height.saturating_sub(1) as f64;
        let frac = (price - self.lower) / (self.upper - self.lower);
        let y = (last * (1.0 - frac)).round().clamp(0.0, last);
        self.top + y as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn higher_prices_map_higher_on_screen() {
        let scale = PriceScale::new(100.0, 200.0, 10, 101);
        assert!(scale.to_y(190.0) < scale.to_y(110.0));
        assert!(scale.to_y(100.0) <= 110);
        assert!(scale.to_y(200.0) >= 10);
    }

    #[test]
    fn flat_range_is_padded() {
        let scale = PriceScale::new(50.0, 50.0, 0, 100);
        assert_eq!(scale.bounds(), (49.0, 51.0));
        assert_eq!(scale.to_y(50.0), 50);
    }

    #[test]
    fn zero_height_maps_to_top() {
        let scale = PriceScale::new(1.0, 2.0, 7, 0);
        assert_eq!(scale.to_y(1.5), 7);
    }

    proptest! {
        #[test]
        fn to_y_stays_inside_plot(
            min in -1e6f64..1e6,
            span in 0.0f64..1e6,
            price in -1e7f64..1e7,
            top in 0u32..500,
            height in 1u32..2000,
        ) {
            let scale = PriceScale::new(min, min + span, top, height);
            let y = scale.to_y(price);
            prop_assert!(y >= top && y < top + height);
        }

        #[test]
        fn to_y_is_monotonic(
            min in 0.0f64..1e4,
            span in 0.01f64..1e4,
            a in 0.0f64..1.0,
            b in 0.0f64..1.0,
        ) {
            let scale = PriceScale::new(min, min + span, 0, 600);
            let (pa, pb) = (min + a * span, min + b * span);
            if pa <= pb {
                prop_assert!(scale.to_y(pa) >= scale.to_y(pb));
            }
        }
    }
}
