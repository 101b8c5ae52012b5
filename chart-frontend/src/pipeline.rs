use std::cell::RefCell;
use std::rc::Rc;

use data_feed::{Clock, MarketSimulator, RandomSource};
use market_core::{ensure_len, Candle, MarketError};
use tracing::{debug, warn};

use crate::animation::{
    FrameLoop, FrameScheduler, IntervalScheduler, MorphProgress, PeriodicLoop,
};
use crate::logo::LogoMorph;
use crate::mapper::PriceRange;
use crate::renderer::{CandleChartRenderer, RenderOutcome};
use crate::surface::{DrawingSurface, RenderTarget};

/// Generator, renderer and target for one chart instance.
pub struct ChartPipeline<R, C, T> {
    simulator: MarketSimulator<R, C>,
    renderer: CandleChartRenderer,
    target: T,
    candle_count: usize,
    candles: Vec<Candle>,
    refreshes: u64,
}

impl<R: RandomSource, C: Clock, T: RenderTarget> ChartPipeline<R, C, T> {
    pub fn new(
        simulator: MarketSimulator<R, C>,
        renderer: CandleChartRenderer,
        target: T,
        candle_count: usize,
    ) -> Result<Self, MarketError> {
        ensure_len("candle_count", candle_count)?;
        Ok(Self {
            simulator,
            renderer,
            target,
            candle_count,
            candles: Vec::new(),
            refreshes: 0,
        })
    }

    /// Generate a fresh series and draw it. The previous series is discarded.
    pub fn refresh(&mut self) -> Result<RenderOutcome, MarketError> {
        let candles = self.simulator.generate_candles(self.candle_count)?;
        let outcome = self.renderer.render(&mut self.target, &candles);
        self.candles = candles;
        self.refreshes += 1;
        debug!(refresh = self.refreshes, ?outcome, "chart refreshed");
        Ok(outcome)
    }

    /// Redraw the current series without regenerating it.
    pub fn redraw(&mut self) -> RenderOutcome {
        self.renderer.render(&mut self.target, &self.candles)
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Swap in a new target and draw the current series onto it.
    pub fn retarget(&mut self, target: T) -> RenderOutcome {
        self.target = target;
        self.redraw()
    }

    /// Price under a pointer `y` pixels from the top of the current frame.
    /// `None` before the first refresh or while the target is unavailable.
    pub fn price_at(&mut self, y: f64) -> Option<f64> {
        let range = PriceRange::from_candles(&self.candles)?;
        let (_, height) = self.target.acquire().ok()?.size();
        Some(range.price_at(y, height))
    }
}

/// Refresh `pipeline` now and then every `period_ms`.
pub fn mount_periodic<S, R, C, T>(
    pipeline: Rc<RefCell<ChartPipeline<R, C, T>>>,
    scheduler: Rc<S>,
    period_ms: u32,
) -> PeriodicLoop<S>
where
    S: IntervalScheduler + 'static,
    R: RandomSource + 'static,
    C: Clock + 'static,
    T: RenderTarget + 'static,
{
    PeriodicLoop::mount(scheduler, period_ms, move || {
        if let Err(err) = pipeline.borrow_mut().refresh() {
            warn!(%err, "chart refresh failed");
        }
    })
}

/// Redraw the logo on every frame with the loop's morph progress.
pub fn mount_logo<S, T>(logo: LogoMorph, mut target: T, scheduler: Rc<S>) -> FrameLoop<S>
where
    S: FrameScheduler + 'static,
    T: RenderTarget + 'static,
{
    FrameLoop::mount(scheduler, MorphProgress::default(), move |progress| {
        logo.render(&mut target, progress);
    })
}
