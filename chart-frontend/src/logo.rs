//! Animated brand mark: a candlestick that dissolves into a padlock and back.

use std::f64::consts::PI;

use tracing::debug;

use crate::renderer::RenderOutcome;
use crate::surface::{DrawingSurface, Glow, LinearGradient, Paint, Rect, RenderTarget};

pub const LOGO_SIZE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LogoMorph {
    edge: String,
    center: String,
    glow: Glow,
    line_width: f64,
    keyhole: String,
}

impl Default for LogoMorph {
    fn default() -> Self {
        Self {
            edge: "#00ffcc".into(),
            center: "#9945ff".into(),
            glow: Glow {
                blur: 10.0,
                color: "#00ffcc".into(),
            },
            line_width: 2.0,
            keyhole: "#000".into(),
        }
    }
}

impl LogoMorph {
    pub fn render<T: RenderTarget>(&self, target: &mut T, progress: f64) -> RenderOutcome {
        match target.acquire() {
            Ok(surface) => {
                self.draw(surface, progress);
                RenderOutcome::Drawn
            }
            Err(err) => {
                debug!(%err, "skipping logo frame");
                RenderOutcome::Skipped
            }
        }
    }

    /// Candlestick while `progress < 0.5`, padlock from there on; each fades
    /// out towards the switch point.
    pub fn draw<S: DrawingSurface + ?Sized>(&self, surface: &mut S, progress: f64) {
        let progress = progress.clamp(0.0, 1.0);
        let paint: Paint = LinearGradient::new(0.0, 0.0, LOGO_SIZE, LOGO_SIZE)
            .mirrored(&self.edge, &self.center)
            .into();

        surface.clear();
        surface.set_glow(Some(&self.glow));

        if progress < 0.5 {
            surface.set_alpha(1.0 - progress * 2.0);
            surface.fill_rect(Rect::new(25.0, 20.0, 10.0, 20.0), &paint);
            surface.stroke_line((30.0, 15.0), (30.0, 20.0), &paint, self.line_width);
            surface.stroke_line((30.0, 40.0), (30.0, 45.0), &paint, self.line_width);
        } else {
            surface.set_alpha((progress - 0.5) * 2.0);
            surface.fill_rect(Rect::new(20.0, 30.0, 20.0, 20.0), &paint);
            // Shackle: upper half circle.
            surface.stroke_arc((30.0, 30.0), 8.0, PI, 0.0, &paint, self.line_width);
            surface.fill_circle((30.0, 38.0), 2.0, &Paint::solid(self.keyhole.as_str()));
        }

        surface.set_alpha(1.0);
    }
}
