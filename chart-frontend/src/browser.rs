//! Browser bindings: 2D canvas surface, `requestAnimationFrame`/`setInterval`
//! scheduler, and the handles JavaScript holds on to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use data_feed::{GeneratorConfig, MarketSimulator, SeededRandom, SystemClock};
use tracing::{warn, Level};
use tracing_wasm::WASMLayerConfigBuilder;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasGradient, CanvasRenderingContext2d, HtmlCanvasElement, Window};

use crate::animation::{
    FrameLoop, FrameScheduler, IntervalScheduler, PeriodicLoop, ScheduleError, ScheduleId,
    DEFAULT_REFRESH_MS,
};
use crate::logo::LogoMorph;
use crate::pipeline::{mount_logo, mount_periodic, ChartPipeline};
use crate::renderer::{CandleChartRenderer, RenderOutcome};
use crate::style::ChartStyle;
use crate::surface::{
    DrawingSurface, Glow, LinearGradient, Paint, Rect, RenderError, RenderTarget,
};
use crate::tables::{OptionsChainTable, OrderBookTable, TickerTape};

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self { canvas, ctx }
    }

    fn gradient(&self, g: &LinearGradient) -> CanvasGradient {
        let gradient = self.ctx.create_linear_gradient(g.x0, g.y0, g.x1, g.y1);
        for stop in &g.stops {
            let _ = gradient.add_color_stop(stop.offset as f32, &stop.color);
        }
        gradient
    }

    fn apply_fill(&self, paint: &Paint) {
        match paint {
            Paint::Solid { color } => self.ctx.set_fill_style_str(color),
            Paint::Linear(g) => self.ctx.set_fill_style_canvas_gradient(&self.gradient(g)),
        }
    }

    fn apply_stroke(&self, paint: &Paint, width: f64) {
        match paint {
            Paint::Solid { color } => self.ctx.set_stroke_style_str(color),
            Paint::Linear(g) => self.ctx.set_stroke_style_canvas_gradient(&self.gradient(g)),
        }
        self.ctx.set_line_width(width);
    }
}

impl DrawingSurface for CanvasSurface {
    fn size(&self) -> (f64, f64) {
        (self.canvas.width() as f64, self.canvas.height() as f64)
    }

    fn begin_frame(&mut self, width: f64, height: f64, background: &str) {
        if self.canvas.width() != width as u32 || self.canvas.height() != height as u32 {
            self.canvas.set_width(width as u32);
            self.canvas.set_height(height as u32);
        }
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_shadow_blur(0.0);
        self.ctx.set_fill_style_str(background);
        self.ctx.fill_rect(0.0, 0.0, width, height);
    }

    fn clear(&mut self) {
        let (w, h) = self.size();
        self.ctx.clear_rect(0.0, 0.0, w, h);
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_glow(&mut self, glow: Option<&Glow>) {
        match glow {
            Some(g) => {
                self.ctx.set_shadow_blur(g.blur);
                self.ctx.set_shadow_color(&g.color);
            }
            None => self.ctx.set_shadow_blur(0.0),
        }
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.apply_fill(paint);
        self.ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), paint: &Paint, width: f64) {
        self.apply_stroke(paint, width);
        self.ctx.begin_path();
        self.ctx.move_to(from.0, from.1);
        self.ctx.line_to(to.0, to.1);
        self.ctx.stroke();
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
        self.apply_stroke(paint, width);
        self.ctx.begin_path();
        let _ = self.ctx.arc(center.0, center.1, radius, start, end);
        self.ctx.stroke();
    }

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, paint: &Paint) {
        self.apply_fill(paint);
        self.ctx.begin_path();
        let _ = self.ctx.arc(center.0, center.1, radius, 0.0, std::f64::consts::TAU);
        self.ctx.fill();
    }

    fn fill_text(&mut self, text: &str, at: (f64, f64), font: &str, color: &str) {
        self.ctx.set_font(font);
        self.ctx.set_fill_style_str(color);
        let _ = self.ctx.fill_text(text, at.0, at.1);
    }
}

/// Canvas looked up by element id, re-resolved while it is missing.
pub struct CanvasTarget {
    canvas_id: String,
    surface: Option<CanvasSurface>,
}

impl CanvasTarget {
    pub fn new(canvas_id: impl Into<String>) -> Self {
        Self {
            canvas_id: canvas_id.into(),
            surface: None,
        }
    }

    fn resolve(&self) -> Result<CanvasSurface, RenderError> {
        let unavailable =
            |what: &str| RenderError::SurfaceUnavailable(format!("{what} ({})", self.canvas_id));
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| unavailable("no document"))?;
        let canvas = document
            .get_element_by_id(&self.canvas_id)
            .ok_or_else(|| unavailable("canvas not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| unavailable("element is not a canvas"))?;
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or_else(|| unavailable("no 2d context"))?;
        Ok(CanvasSurface::new(canvas, ctx))
    }
}

impl RenderTarget for CanvasTarget {
    type Surface = CanvasSurface;

    fn acquire(&mut self) -> Result<&mut CanvasSurface, RenderError> {
        if self.surface.is_none() {
            self.surface = Some(self.resolve()?);
        }
        self.surface
            .as_mut()
            .ok_or_else(|| RenderError::SurfaceUnavailable(self.canvas_id.clone()))
    }
}

/// `requestAnimationFrame` / `setInterval` on the global window.
pub struct BrowserScheduler {
    window: Window,
    intervals: RefCell<HashMap<i32, Closure<dyn FnMut()>>>,
}

impl BrowserScheduler {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        Ok(Self {
            window,
            intervals: RefCell::new(HashMap::new()),
        })
    }
}

fn rejected(err: JsValue) -> ScheduleError {
    ScheduleError::Rejected(format!("{err:?}"))
}

impl FrameScheduler for BrowserScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Result<ScheduleId, ScheduleError> {
        // A canceled frame never runs, so its closure stays allocated; it only holds a weak handle.
        let f = Closure::once_into_js(move |ts: f64| callback(ts));
        let handle = self
            .window
            .request_animation_frame(f.unchecked_ref())
            .map_err(rejected)?;
        Ok(ScheduleId(handle as u64))
    }

    fn cancel_frame(&self, id: ScheduleId) {
        let _ = self.window.cancel_animation_frame(id.0 as i32);
    }
}

impl IntervalScheduler for BrowserScheduler {
    fn set_interval(
        &self,
        period_ms: u32,
        callback: Box<dyn FnMut()>,
    ) -> Result<ScheduleId, ScheduleError> {
        let closure = Closure::wrap(callback);
        let handle = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                period_ms.min(i32::MAX as u32) as i32,
            )
            .map_err(rejected)?;
        self.intervals.borrow_mut().insert(handle, closure);
        Ok(ScheduleId(handle as u64))
    }

    fn clear_interval(&self, id: ScheduleId) {
        let handle = id.0 as i32;
        self.window.clear_interval_with_handle(handle);
        self.intervals.borrow_mut().remove(&handle);
    }
}

type BrowserPipeline = ChartPipeline<SeededRandom, SystemClock, CanvasTarget>;

/// Panics and `tracing` events go to the browser console. Per-frame `debug!`
/// noise stays below the console's `info` floor.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let config = WASMLayerConfigBuilder::new()
        .set_max_level(Level::INFO)
        .build();
    tracing_wasm::set_as_global_default_with_config(config);
}

/// Candle chart bound to a `<canvas>`, regenerated on an interval.
#[wasm_bindgen]
pub struct HoloChart {
    pipeline: Rc<RefCell<BrowserPipeline>>,
    periodic: Option<PeriodicLoop<BrowserScheduler>>,
}

#[wasm_bindgen]
impl HoloChart {
    /// `refresh_ms` of 0 draws once and never refreshes.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, refresh_ms: Option<u32>) -> Result<HoloChart, JsValue> {
        let config = GeneratorConfig::default();
        let count = config.candles.count;
        let simulator =
            MarketSimulator::with_config(config, SeededRandom::from_entropy(), SystemClock);
        let pipeline = ChartPipeline::new(
            simulator,
            CandleChartRenderer::new(ChartStyle::default()),
            CanvasTarget::new(canvas_id),
            count,
        )
        .map_err(to_js)?;
        let pipeline = Rc::new(RefCell::new(pipeline));

        let period = refresh_ms.unwrap_or(DEFAULT_REFRESH_MS);
        let periodic = if period == 0 {
            if let Err(err) = pipeline.borrow_mut().refresh() {
                warn!(%err, "initial chart draw failed");
            }
            None
        } else {
            let scheduler = Rc::new(BrowserScheduler::new()?);
            Some(mount_periodic(pipeline.clone(), scheduler, period))
        };

        Ok(HoloChart { pipeline, periodic })
    }

    /// Regenerate and redraw immediately.
    pub fn refresh(&self) -> Result<(), JsValue> {
        self.pipeline
            .borrow_mut()
            .refresh()
            .map(|_| ())
            .map_err(to_js)
    }

    /// Move the chart to another `<canvas>` (after the page re-mounts it) and
    /// redraw the current series there.
    pub fn rebind(&self, canvas_id: &str) {
        let outcome = self.pipeline.borrow_mut().retarget(CanvasTarget::new(canvas_id));
        if outcome == RenderOutcome::Skipped {
            warn!(canvas_id, "chart canvas unavailable after rebind");
        }
    }

    /// Price under a pointer `y` CSS pixels from the top of the canvas.
    pub fn price_at(&self, y: f64) -> Option<f64> {
        self.pipeline.borrow_mut().price_at(y)
    }

    /// Current series as JSON.
    pub fn candles_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.pipeline.borrow().candles()).map_err(to_js)
    }

    /// Stop refreshing. The canvas keeps its last frame.
    pub fn destroy(&mut self) {
        self.periodic.take();
    }
}

/// Animated logo bound to a 60x60 `<canvas>`.
#[wasm_bindgen]
pub struct HoloLogo {
    frames: Option<FrameLoop<BrowserScheduler>>,
}

#[wasm_bindgen]
impl HoloLogo {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<HoloLogo, JsValue> {
        let scheduler = Rc::new(BrowserScheduler::new()?);
        let frames = mount_logo(LogoMorph::default(), CanvasTarget::new(canvas_id), scheduler);
        Ok(HoloLogo { frames: Some(frames) })
    }

    pub fn destroy(&mut self) {
        self.frames.take();
    }
}

/// Synthetic data for the table views, as JSON strings of display-ready cells.
#[wasm_bindgen]
pub struct HoloMarket {
    simulator: MarketSimulator<SeededRandom, SystemClock>,
}

#[wasm_bindgen]
impl HoloMarket {
    #[wasm_bindgen(constructor)]
    pub fn new() -> HoloMarket {
        HoloMarket {
            simulator: MarketSimulator::new(SeededRandom::from_entropy(), SystemClock),
        }
    }

    /// Sealed cells get a new scramble suffix on every call.
    pub fn order_book(&mut self, decrypted: bool) -> Result<String, JsValue> {
        let book = &self.simulator.config().book;
        let (depth, mid) = (book.depth, book.mid);
        let book = self.simulator.generate_order_book(depth, mid).map_err(to_js)?;
        let table = OrderBookTable::new(&book, decrypted, self.simulator.rng_mut());
        serde_json::to_string(&table).map_err(to_js)
    }

    pub fn options_chain(&mut self) -> Result<String, JsValue> {
        let chain = &self.simulator.config().chain;
        let (spot, steps) = (chain.spot, chain.steps);
        let chain = self.simulator.generate_options_chain(spot, steps).map_err(to_js)?;
        serde_json::to_string(&OptionsChainTable::new(&chain)).map_err(to_js)
    }

    pub fn ticker(&mut self) -> Result<String, JsValue> {
        let count = self.simulator.config().ticker.count;
        let items = self.simulator.generate_ticker(count).map_err(to_js)?;
        serde_json::to_string(&TickerTape::new(&items)).map_err(to_js)
    }
}

impl Default for HoloMarket {
    fn default() -> Self {
        Self::new()
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
