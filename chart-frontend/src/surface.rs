//! Drawing-surface boundary.
//!
//! The renderer and the logo only ever talk to [`DrawingSurface`]. In the
//! browser that is a 2D canvas context; everywhere else it is a
//! [`DisplayList`] that records what a frame would have drawn.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Grow by `by` pixels on every side.
    pub fn outset(&self, by: f64) -> Self {
        Self::new(self.x - by, self.y - by, self.w + by * 2.0, self.h + by * 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f64,
    pub color: String,
}

/// Linear gradient from `(x0, y0)` to `(x1, y1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            stops: Vec::new(),
        }
    }

    pub fn stop(mut self, offset: f64, color: impl Into<String>) -> Self {
        self.stops.push(ColorStop {
            offset,
            color: color.into(),
        });
        self
    }

    /// `edge → center → edge`, the three-stop shape every chart gradient uses.
    pub fn mirrored(self, edge: &str, center: &str) -> Self {
        self.stop(0.0, edge).stop(0.5, center).stop(1.0, edge)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Paint {
    Solid { color: String },
    Linear(LinearGradient),
}

impl Paint {
    pub fn solid(color: impl Into<String>) -> Self {
        Paint::Solid {
            color: color.into(),
        }
    }
}

impl From<LinearGradient> for Paint {
    fn from(g: LinearGradient) -> Self {
        Paint::Linear(g)
    }
}

/// Shadow blur applied to subsequent strokes and fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    pub blur: f64,
    pub color: String,
}

pub trait DrawingSurface {
    fn size(&self) -> (f64, f64);

    /// Resize to `width` x `height` and flood it with `background`.
    fn begin_frame(&mut self, width: f64, height: f64, background: &str);

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    fn set_alpha(&mut self, alpha: f64);

    /// `None` turns the glow off.
    fn set_glow(&mut self, glow: Option<&Glow>);

    fn fill_rect(&mut self, rect: Rect, paint: &Paint);

    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), paint: &Paint, width: f64);

    /// Arc from `start` to `end` radians, clockwise.
    fn stroke_arc(
        &mut self,
        center: (f64, f64),
        radius: f64,
        start: f64,
        end: f64,
        paint: &Paint,
        width: f64,
    );

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, paint: &Paint);

    fn fill_text(&mut self, text: &str, at: (f64, f64), font: &str, color: &str);
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    BeginFrame {
        width: f64,
        height: f64,
        background: String,
    },
    Clear,
    SetAlpha {
        alpha: f64,
    },
    SetGlow {
        glow: Option<Glow>,
    },
    FillRect {
        rect: Rect,
        paint: Paint,
    },
    StrokeLine {
        from: (f64, f64),
        to: (f64, f64),
        paint: Paint,
        width: f64,
    },
    StrokeArc {
        center: (f64, f64),
        radius: f64,
        start: f64,
        end: f64,
        paint: Paint,
        width: f64,
    },
    FillCircle {
        center: (f64, f64),
        radius: f64,
        paint: Paint,
    },
    FillText {
        text: String,
        at: (f64, f64),
        font: String,
        color: String,
    },
}

/// Headless surface: records every call in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Recorded text in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, cmd: DrawCommand) {
        self.commands.push(cmd);
    }
}

impl DrawingSurface for DisplayList {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self, width: f64, height: f64, background: &str) {
        // A new frame replaces the previous one.
        self.commands.clear();
        self.width = width;
        self.height = height;
        self.push(DrawCommand::BeginFrame {
            width,
            height,
            background: background.to_string(),
        });
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.push(DrawCommand::Clear);
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.push(DrawCommand::SetAlpha { alpha });
    }

    fn set_glow(&mut self, glow: Option<&Glow>) {
        self.push(DrawCommand::SetGlow { glow: glow.cloned() });
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.push(DrawCommand::FillRect {
            rect,
            paint: paint.clone(),
        });
    }

    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), paint: &Paint, width: f64) {
        self.push(DrawCommand::StrokeLine {
            from,
            to,
            paint: paint.clone(),
            width,
        });
    }

    fn stroke_arc(
        &mut self,
        center: (f64, f64),
        radius: f64,
        start: f64,
        end: f64,
        paint: &Paint,
        width: f64,
    ) {
        self.push(DrawCommand::StrokeArc {
            center,
            radius,
            start,
            end,
            paint: paint.clone(),
            width,
        });
    }

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, paint: &Paint) {
        self.push(DrawCommand::FillCircle {
            center,
            radius,
            paint: paint.clone(),
        });
    }

    fn fill_text(&mut self, text: &str, at: (f64, f64), font: &str, color: &str) {
        self.push(DrawCommand::FillText {
            text: text.to_string(),
            at,
            font: font.to_string(),
            color: color.to_string(),
        });
    }
}

/// Something a frame can be drawn into, if it is currently available.
pub trait RenderTarget {
    type Surface: DrawingSurface;

    fn acquire(&mut self) -> Result<&mut Self::Surface, RenderError>;
}

impl RenderTarget for DisplayList {
    type Surface = DisplayList;

    fn acquire(&mut self) -> Result<&mut DisplayList, RenderError> {
        Ok(self)
    }
}

/// A surface that may not be mounted yet (or any more).
impl<S: DrawingSurface> RenderTarget for Option<S> {
    type Surface = S;

    fn acquire(&mut self) -> Result<&mut S, RenderError> {
        self.as_mut()
            .ok_or_else(|| RenderError::SurfaceUnavailable("no surface attached".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_frame_discards_previous_commands() {
        let mut list = DisplayList::new(10.0, 10.0);
        list.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), &Paint::solid("#fff"));
        list.begin_frame(800.0, 400.0, "#050911");
        assert_eq!(list.len(), 1);
        assert_eq!(list.size(), (800.0, 400.0));
    }

    #[test]
    fn missing_surface_is_unavailable() {
        let mut target: Option<DisplayList> = None;
        assert!(matches!(target.acquire(), Err(RenderError::SurfaceUnavailable(_))));
        let mut target = Some(DisplayList::new(1.0, 1.0));
        assert!(target.acquire().is_ok());
    }

    #[test]
    fn commands_serialize_with_op_tag() {
        let mut list = DisplayList::new(60.0, 60.0);
        list.fill_text("101.00", (750.0, 20.0), "10px JetBrains Mono", "#64748b");
        let json = serde_json::to_value(list.commands()).unwrap();
        assert_eq!(json[0]["op"], "fill_text");
        assert_eq!(json[0]["text"], "101.00");
        assert_eq!(list.texts(), vec!["101.00"]);
    }

    #[test]
    fn mirrored_gradient_has_three_stops() {
        let g = LinearGradient::new(0.0, 0.0, 60.0, 60.0).mirrored("#00ffcc", "#9945ff");
        let colors: Vec<&str> = g.stops.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, vec!["#00ffcc", "#9945ff", "#00ffcc"]);
        assert_eq!(Rect::new(10.0, 10.0, 4.0, 4.0).outset(2.0), Rect::new(8.0, 8.0, 8.0, 8.0));
    }
}
