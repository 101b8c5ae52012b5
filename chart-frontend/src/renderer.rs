//! Candle chart painter.

use market_core::{format_value_with, Candle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mapper::{slot_width, PriceRange};
use crate::style::ChartStyle;
use crate::surface::{DrawingSurface, Paint, Rect, RenderTarget};

/// Pixel geometry of one candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotCandle {
    pub index: usize,
    /// Left edge of the slot.
    pub x: f64,
    pub center_x: f64,
    pub body_x: f64,
    pub body_w: f64,
    pub y_open: f64,
    pub y_close: f64,
    pub y_high: f64,
    pub y_low: f64,
    pub up: bool,
}

impl PlotCandle {
    pub fn body_top(&self) -> f64 {
        self.y_open.min(self.y_close)
    }

    pub fn body_height(&self, min_height: f64) -> f64 {
        (self.y_close - self.y_open).abs().max(min_height)
    }
}

pub fn layout_candles(
    candles: &[Candle],
    width: f64,
    height: f64,
    range: &PriceRange,
    body_ratio: f64,
) -> Vec<PlotCandle> {
    let slot = slot_width(candles.len(), width);
    let body_w = slot * body_ratio;
    candles
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let x = index as f64 * slot;
            PlotCandle {
                index,
                x,
                center_x: x + slot / 2.0,
                body_x: x + (slot - body_w) / 2.0,
                body_w,
                y_open: range.y(c.open, height),
                y_close: range.y(c.close, height),
                y_high: range.y(c.high, height),
                y_low: range.y(c.low, height),
                up: c.is_up(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenderOutcome {
    Drawn,
    /// No surface was available; nothing was drawn.
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct CandleChartRenderer {
    style: ChartStyle,
}

impl CandleChartRenderer {
    pub fn new(style: ChartStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    /// Draw `candles` into `target`. A missing surface skips the frame.
    pub fn render<T: RenderTarget>(&self, target: &mut T, candles: &[Candle]) -> RenderOutcome {
        match target.acquire() {
            Ok(surface) => {
                self.paint(surface, candles);
                RenderOutcome::Drawn
            }
            Err(err) => {
                debug!(%err, "skipping chart frame");
                RenderOutcome::Skipped
            }
        }
    }

    /// Full synchronous redraw at the surface's current size.
    pub fn paint<S: DrawingSurface + ?Sized>(&self, surface: &mut S, candles: &[Candle]) {
        let (width, height) = surface.size();
        let style = &self.style;
        surface.begin_frame(width, height, &style.background);
        self.draw_grid(surface, width, height);

        let Some(range) = PriceRange::from_candles(candles) else {
            return;
        };
        let plots = layout_candles(candles, width, height, &range, style.body_ratio);
        let shimmer_index = plots.len() / 2;
        for plot in &plots {
            self.draw_candle(surface, plot, height, plot.index == shimmer_index);
        }
        self.draw_labels(surface, &range, width, height);
    }

    fn draw_grid<S: DrawingSurface + ?Sized>(&self, surface: &mut S, width: f64, height: f64) {
        let style = &self.style;
        let paint = Paint::solid(style.grid_color.as_str());
        let divisions = style.grid_divisions.max(1);
        for i in 0..=divisions {
            let y = height / divisions as f64 * i as f64;
            surface.stroke_line((0.0, y), (width, y), &paint, style.grid_width);
        }
    }

    fn draw_candle<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        plot: &PlotCandle,
        height: f64,
        shimmer: bool,
    ) {
        let style = &self.style;
        let palette = style.palette(plot.up);
        let gradient = palette.gradient(plot.x, plot.body_w, height);

        surface.set_glow(Some(&palette.glow));
        surface.stroke_line(
            (plot.center_x, plot.y_high),
            (plot.center_x, plot.y_low),
            &gradient,
            style.wick_width,
        );

        let body = Rect::new(
            plot.body_x,
            plot.body_top(),
            plot.body_w,
            plot.body_height(style.min_body_height),
        );
        surface.set_alpha(style.body_alpha);
        surface.fill_rect(body, &gradient);

        if shimmer {
            surface.set_alpha(style.shimmer_alpha);
            surface.fill_rect(
                body.outset(style.shimmer_outset),
                &Paint::solid(style.shimmer_color.as_str()),
            );
        }

        surface.set_alpha(1.0);
        surface.set_glow(None);
    }

    fn draw_labels<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        range: &PriceRange,
        width: f64,
        height: f64,
    ) {
        let style = &self.style;
        let x = width - style.label_inset;
        for price in range.price_levels(style.label_divisions) {
            let text = format_value_with(price, false, style.label_precision);
            let at = (x, range.y(price, height));
            surface.fill_text(&text, at, &style.label_font, &style.label_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DisplayList, DrawCommand, RenderError};
    use data_feed::{FixedClock, MarketSimulator, SeededRandom};
    use market_core::TimeFrame;

    fn series(n: usize) -> Vec<Candle> {
        MarketSimulator::new(SeededRandom::new(17), FixedClock(1_706_227_200_000))
            .generate_candles(n)
            .unwrap()
    }

    fn flat(price: f64) -> Candle {
        Candle {
            ts: 0,
            timeframe: TimeFrame::Hours(1),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }

    #[test]
    fn layout_centers_are_16px_apart_on_800px() {
        let candles = series(50);
        let range = PriceRange::from_candles(&candles).unwrap();
        let plots = layout_candles(&candles, 800.0, 400.0, &range, 0.6);
        assert_eq!(plots.len(), 50);
        for pair in plots.windows(2) {
            assert!((pair[1].center_x - pair[0].center_x - 16.0).abs() < 1e-9);
        }
        let first = &plots[0];
        assert!((first.body_w - 9.6).abs() < 1e-9);
        assert!((first.body_x - 3.2).abs() < 1e-9);
        for p in &plots {
            assert!(p.y_high <= p.body_top());
            assert!(p.y_low >= p.body_top());
        }
    }

    #[test]
    fn frame_has_background_grid_candles_and_labels() {
        let candles = series(50);
        let mut list = DisplayList::new(800.0, 400.0);
        let outcome = CandleChartRenderer::default().render(&mut list, &candles);
        assert_eq!(outcome, RenderOutcome::Drawn);

        let cmds = list.commands();
        assert!(matches!(
            &cmds[0],
            DrawCommand::BeginFrame { background, .. } if background == "#050911"
        ));
        let grid = cmds
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokeLine { width, .. } if *width == 0.5))
            .count();
        assert_eq!(grid, 11);
        let wicks = cmds
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokeLine { width, .. } if *width == 1.0))
            .count();
        assert_eq!(wicks, 50);
        // One body per candle plus the shimmer on the middle one.
        let rects = cmds.iter().filter(|c| matches!(c, DrawCommand::FillRect { .. })).count();
        assert_eq!(rects, 51);
        assert_eq!(list.texts().len(), 6);
    }

    #[test]
    fn labels_are_two_decimal_prices_at_right_edge() {
        let candles = series(20);
        let range = PriceRange::from_candles(&candles).unwrap();
        let mut list = DisplayList::new(800.0, 400.0);
        CandleChartRenderer::default().paint(&mut list, &candles);
        let labels: Vec<_> = list
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, at, .. } => Some((text.clone(), *at)),
                _ => None,
            })
            .collect();
        assert_eq!(labels[0].0, format!("{:.2}", range.min));
        assert_eq!(labels[5].0, format!("{:.2}", range.max));
        assert!(labels.iter().all(|(_, at)| at.0 == 750.0));
        assert_eq!(labels[0].1 .1, 400.0);
        assert!(labels[5].1 .1.abs() < 1e-9);
    }

    #[test]
    fn direction_picks_palette_and_glow() {
        let up = Candle {
            open: 100.0,
            close: 101.0,
            high: 102.0,
            low: 99.0,
            ..flat(100.0)
        };
        let down = Candle {
            open: 101.0,
            close: 100.0,
            ..up
        };
        let mut list = DisplayList::new(100.0, 100.0);
        CandleChartRenderer::default().paint(&mut list, &[up, down]);
        let glows: Vec<f64> = list
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::SetGlow { glow: Some(g) } => Some(g.blur),
                _ => None,
            })
            .collect();
        assert_eq!(glows, vec![10.0, 8.0]);
    }

    #[test]
    fn flat_series_uses_min_body_height() {
        let candles = vec![flat(100.0); 3];
        let range = PriceRange::from_candles(&candles).unwrap();
        let plots = layout_candles(&candles, 300.0, 100.0, &range, 0.6);
        assert_eq!(plots[0].body_height(1.0), 1.0);
        assert!(!plots[0].up);
    }

    #[test]
    fn empty_series_draws_only_the_backdrop() {
        let mut list = DisplayList::new(800.0, 400.0);
        let outcome = CandleChartRenderer::default().render(&mut list, &[]);
        assert_eq!(outcome, RenderOutcome::Drawn);
        assert_eq!(list.len(), 1 + 11);
    }

    #[test]
    fn missing_surface_skips_frame() {
        let mut target: Option<DisplayList> = None;
        let outcome = CandleChartRenderer::default().render(&mut target, &series(5));
        assert_eq!(outcome, RenderOutcome::Skipped);
        assert!(matches!(target.acquire(), Err(RenderError::SurfaceUnavailable(_))));
    }
}
