pub mod animation;
pub mod logo;
pub mod mapper;
pub mod pipeline;
pub mod renderer;
pub mod style;
pub mod surface;
pub mod tables;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use animation::{
    FrameLoop, FrameScheduler, IntervalScheduler, LoopState, ManualScheduler, MorphProgress,
    PeriodicLoop, ScheduleError, ScheduleId, DEFAULT_REFRESH_MS,
};
pub use logo::LogoMorph;
pub use mapper::{candle_center_x, index_to_x, price_to_y, PriceRange};
pub use pipeline::{mount_logo, mount_periodic, ChartPipeline};
pub use renderer::{layout_candles, CandleChartRenderer, PlotCandle, RenderOutcome};
pub use style::{CandlePalette, ChartStyle};
pub use surface::{DisplayList, DrawCommand, DrawingSurface, Paint, RenderError, RenderTarget};
pub use tables::{OptionsChainTable, OrderBookTable, TickerTape};
