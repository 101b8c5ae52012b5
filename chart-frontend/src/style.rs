use serde::{Deserialize, Serialize};

use crate::surface::{Glow, LinearGradient, Paint};

/// Colors for one candle direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePalette {
    pub edge: String,
    pub center: String,
    pub glow: Glow,
}

impl CandlePalette {
    pub fn profit() -> Self {
        Self {
            edge: "#00ff88".into(),
            center: "#00ffcc".into(),
            glow: Glow {
                blur: 10.0,
                color: "#00ffcc".into(),
            },
        }
    }

    pub fn loss() -> Self {
        Self {
            edge: "#ff0066".into(),
            center: "#ff3366".into(),
            glow: Glow {
                blur: 8.0,
                color: "#ff0066".into(),
            },
        }
    }

    /// Gradient spanning one candle slot from the top of the chart to the bottom.
    pub fn gradient(&self, x: f64, body_width: f64, height: f64) -> Paint {
        LinearGradient::new(x, 0.0, x + body_width, height)
            .mirrored(&self.edge, &self.center)
            .into()
    }
}

/// Every visual constant of the candle chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub background: String,
    pub grid_color: String,
    pub grid_width: f64,
    pub grid_divisions: usize,
    /// Body width as a fraction of the candle slot.
    pub body_ratio: f64,
    pub body_alpha: f64,
    pub min_body_height: f64,
    pub wick_width: f64,
    pub profit: CandlePalette,
    pub loss: CandlePalette,
    pub shimmer_color: String,
    pub shimmer_alpha: f64,
    pub shimmer_outset: f64,
    pub label_divisions: usize,
    /// Distance of the label column from the right edge.
    pub label_inset: f64,
    pub label_font: String,
    pub label_color: String,
    pub label_precision: usize,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            background: "#050911".into(),
            grid_color: "rgba(30, 41, 59, 0.3)".into(),
            grid_width: 0.5,
            grid_divisions: 10,
            body_ratio: 0.6,
            body_alpha: 0.8,
            min_body_height: 1.0,
            wick_width: 1.0,
            profit: CandlePalette::profit(),
            loss: CandlePalette::loss(),
            shimmer_color: "#ffffff".into(),
            shimmer_alpha: 0.3,
            shimmer_outset: 2.0,
            label_divisions: 5,
            label_inset: 50.0,
            label_font: "10px JetBrains Mono".into(),
            label_color: "#64748b".into(),
            label_precision: 2,
        }
    }
}

impl ChartStyle {
    pub fn palette(&self, up: bool) -> &CandlePalette {
        if up {
            &self.profit
        } else {
            &self.loss
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let style: ChartStyle = serde_json::from_str(r##"{"background":"#000000"}"##).unwrap();
        assert_eq!(style.background, "#000000");
        assert_eq!(style.grid_divisions, 10);
        assert_eq!(style.profit.glow.blur, 10.0);
        assert_eq!(style.loss.glow.blur, 8.0);
    }

    #[test]
    fn palette_by_direction() {
        let style = ChartStyle::default();
        assert_eq!(style.palette(true).center, "#00ffcc");
        assert_eq!(style.palette(false).center, "#ff3366");
    }
}
