//! Redraw scheduling.
//!
//! [`FrameLoop`] re-runs a callback on every display frame and threads a
//! ping-pong morph progress through it. [`PeriodicLoop`] runs a callback once
//! on mount and then on a fixed interval. Both stop for good when their handle
//! is canceled or dropped: the pending frame or interval is withdrawn from the
//! scheduler, and a callback that was already queued sees the canceled state
//! and returns without running.
//!
//! Everything here is single-threaded (`Rc`, `Cell`, `RefCell`).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, warn};

/// Default period of a [`PeriodicLoop`].
pub const DEFAULT_REFRESH_MS: u32 = 10_000;
/// Progress added (or removed) per frame.
pub const MORPH_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleId(pub u64);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("scheduler rejected callback: {0}")]
    Rejected(String),
}

pub trait FrameScheduler {
    /// Run `callback` once on the next display frame with a timestamp in ms.
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Result<ScheduleId, ScheduleError>;

    fn cancel_frame(&self, id: ScheduleId);
}

pub trait IntervalScheduler {
    fn set_interval(
        &self,
        period_ms: u32,
        callback: Box<dyn FnMut()>,
    ) -> Result<ScheduleId, ScheduleError>;

    fn clear_interval(&self, id: ScheduleId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    Idle,
    Scheduled,
    Rendering,
    /// Terminal.
    Canceled,
}

/// Value bouncing between 0 and 1 by a fixed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphProgress {
    value: f64,
    direction: f64,
    step: f64,
}

impl Default for MorphProgress {
    fn default() -> Self {
        Self::new(MORPH_STEP)
    }
}

impl MorphProgress {
    pub fn new(step: f64) -> Self {
        Self {
            value: 0.0,
            direction: 1.0,
            step: step.abs(),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// `true` while moving towards 1.
    pub fn rising(&self) -> bool {
        self.direction > 0.0
    }

    /// Step once, reversing at either bound.
    pub fn advance(&mut self) -> f64 {
        self.value += self.step * self.direction;
        if self.value >= 1.0 {
            self.value = 1.0;
            self.direction = -1.0;
        } else if self.value <= 0.0 {
            self.value = 0.0;
            self.direction = 1.0;
        }
        self.value
    }
}

struct FrameLoopInner<S: FrameScheduler> {
    scheduler: Rc<S>,
    state: Cell<LoopState>,
    pending: Cell<Option<ScheduleId>>,
    progress: Cell<MorphProgress>,
    frames: Cell<u64>,
    callback: RefCell<Box<dyn FnMut(f64)>>,
}

impl<S: FrameScheduler + 'static> FrameLoopInner<S> {
    fn schedule(this: &Rc<Self>) {
        if this.state.get() == LoopState::Canceled {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(this);
        let request = this.scheduler.request_frame(Box::new(move |ts| {
            if let Some(inner) = weak.upgrade() {
                Self::on_frame(&inner, ts);
            }
        }));
        match request {
            Ok(id) => {
                this.pending.set(Some(id));
                this.state.set(LoopState::Scheduled);
            }
            Err(err) => {
                warn!(%err, "frame request rejected; stopping frame loop");
                this.pending.set(None);
                this.state.set(LoopState::Canceled);
            }
        }
    }

    fn on_frame(this: &Rc<Self>, _ts: f64) {
        if this.state.get() == LoopState::Canceled {
            return;
        }
        this.pending.set(None);
        this.state.set(LoopState::Rendering);

        let mut progress = this.progress.get();
        (this.callback.borrow_mut())(progress.value());
        progress.advance();
        this.progress.set(progress);
        this.frames.set(this.frames.get() + 1);

        Self::schedule(this);
    }

    fn cancel(&self) {
        if self.state.get() == LoopState::Canceled {
            return;
        }
        self.state.set(LoopState::Canceled);
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
        }
        debug!(frames = self.frames.get(), "frame loop canceled");
    }
}

/// Continuous per-frame loop. Dropping the handle tears it down.
pub struct FrameLoop<S: FrameScheduler + 'static> {
    inner: Rc<FrameLoopInner<S>>,
}

impl<S: FrameScheduler + 'static> FrameLoop<S> {
    /// Schedule the first frame. `callback` receives the progress before it is advanced.
    pub fn mount(
        scheduler: Rc<S>,
        progress: MorphProgress,
        callback: impl FnMut(f64) + 'static,
    ) -> Self {
        let inner = Rc::new(FrameLoopInner {
            scheduler,
            state: Cell::new(LoopState::Idle),
            pending: Cell::new(None),
            progress: Cell::new(progress),
            frames: Cell::new(0),
            callback: RefCell::new(Box::new(callback)),
        });
        FrameLoopInner::schedule(&inner);
        Self { inner }
    }

    pub fn state(&self) -> LoopState {
        self.inner.state.get()
    }

    pub fn progress(&self) -> MorphProgress {
        self.inner.progress.get()
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.inner.frames.get()
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }
}

impl<S: FrameScheduler + 'static> Drop for FrameLoop<S> {
    fn drop(&mut self) {
        self.inner.cancel();
    }
}

struct PeriodicLoopInner<S: IntervalScheduler> {
    scheduler: Rc<S>,
    state: Cell<LoopState>,
    interval: Cell<Option<ScheduleId>>,
    ticks: Cell<u64>,
    callback: RefCell<Box<dyn FnMut()>>,
}

impl<S: IntervalScheduler + 'static> PeriodicLoopInner<S> {
    fn tick(&self) {
        if self.state.get() == LoopState::Canceled {
            return;
        }
        self.state.set(LoopState::Rendering);
        (self.callback.borrow_mut())();
        self.ticks.set(self.ticks.get() + 1);
        if self.state.get() != LoopState::Canceled {
            self.state.set(LoopState::Scheduled);
        }
    }

    fn cancel(&self) {
        if self.state.get() == LoopState::Canceled {
            return;
        }
        self.state.set(LoopState::Canceled);
        if let Some(id) = self.interval.take() {
            self.scheduler.clear_interval(id);
        }
        debug!(ticks = self.ticks.get(), "periodic loop canceled");
    }
}

/// Immediate tick, then one tick per period. Dropping the handle tears it down.
pub struct PeriodicLoop<S: IntervalScheduler + 'static> {
    inner: Rc<PeriodicLoopInner<S>>,
}

impl<S: IntervalScheduler + 'static> PeriodicLoop<S> {
    pub fn mount(scheduler: Rc<S>, period_ms: u32, callback: impl FnMut() + 'static) -> Self {
        let inner = Rc::new(PeriodicLoopInner {
            scheduler,
            state: Cell::new(LoopState::Idle),
            interval: Cell::new(None),
            ticks: Cell::new(0),
            callback: RefCell::new(Box::new(callback)),
        });

        inner.tick();

        let weak = Rc::downgrade(&inner);
        let request = inner.scheduler.set_interval(
            period_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.tick();
                }
            }),
        );
        match request {
            Ok(id) => {
                inner.interval.set(Some(id));
                inner.state.set(LoopState::Scheduled);
            }
            Err(err) => {
                warn!(%err, "interval rejected; stopping periodic loop");
                inner.state.set(LoopState::Canceled);
            }
        }
        Self { inner }
    }

    pub fn state(&self) -> LoopState {
        self.inner.state.get()
    }

    pub fn ticks(&self) -> u64 {
        self.inner.ticks.get()
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }
}

impl<S: IntervalScheduler + 'static> Drop for PeriodicLoop<S> {
    fn drop(&mut self) {
        self.inner.cancel();
    }
}

/// Nominal frame spacing of [`ManualScheduler::run_frame`].
pub const MANUAL_FRAME_MS: u64 = 16;

struct ManualInterval {
    id: ScheduleId,
    period: u64,
    next_due: u64,
    callback: Rc<RefCell<Box<dyn FnMut()>>>,
}

type QueuedFrame = (ScheduleId, Box<dyn FnOnce(f64)>);

/// Deterministic scheduler driven by hand: frames run on [`run_frame`],
/// intervals fire as [`advance`] moves the fake clock.
///
/// [`run_frame`]: ManualScheduler::run_frame
/// [`advance`]: ManualScheduler::advance
#[derive(Default)]
pub struct ManualScheduler {
    now_ms: Cell<u64>,
    next_id: Cell<u64>,
    frames: RefCell<Vec<QueuedFrame>>,
    intervals: RefCell<Vec<ManualInterval>>,
    rejecting: Cell<bool>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    /// Make every later request fail.
    pub fn reject_requests(&self, reject: bool) {
        self.rejecting.set(reject);
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn active_intervals(&self) -> usize {
        self.intervals.borrow().len()
    }

    fn allocate(&self) -> Result<ScheduleId, ScheduleError> {
        if self.rejecting.get() {
            return Err(ScheduleError::Rejected("manual scheduler is rejecting requests".into()));
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        Ok(ScheduleId(id))
    }

    /// Run every frame queued before this call. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let now = self.now_ms.get() + MANUAL_FRAME_MS;
        self.now_ms.set(now);
        let queued = std::mem::take(&mut *self.frames.borrow_mut());
        let count = queued.len();
        for (_, callback) in queued {
            callback(now as f64);
        }
        count
    }

    pub fn run_frames(&self, n: usize) -> usize {
        (0..n).map(|_| self.run_frame()).sum()
    }

    /// Move the clock forward, firing intervals in due order. Returns the number of firings.
    pub fn advance(&self, ms: u64) -> usize {
        let target = self.now_ms.get() + ms;
        let mut fired = 0;
        loop {
            let due = {
                let mut intervals = self.intervals.borrow_mut();
                let next = intervals
                    .iter_mut()
                    .filter(|iv| iv.next_due <= target)
                    .min_by_key(|iv| (iv.next_due, iv.id));
                match next {
                    Some(iv) => {
                        let at = iv.next_due;
                        iv.next_due += iv.period;
                        Some((at, iv.callback.clone()))
                    }
                    None => None,
                }
            };
            let Some((at, callback)) = due else { break };
            self.now_ms.set(at);
            (callback.borrow_mut())();
            fired += 1;
        }
        self.now_ms.set(target);
        fired
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce(f64)>) -> Result<ScheduleId, ScheduleError> {
        let id = self.allocate()?;
        self.frames.borrow_mut().push((id, callback));
        Ok(id)
    }

    fn cancel_frame(&self, id: ScheduleId) {
        self.frames.borrow_mut().retain(|(queued, _)| *queued != id);
    }
}

impl IntervalScheduler for ManualScheduler {
    fn set_interval(
        &self,
        period_ms: u32,
        callback: Box<dyn FnMut()>,
    ) -> Result<ScheduleId, ScheduleError> {
        let id = self.allocate()?;
        let period = u64::from(period_ms.max(1));
        self.intervals.borrow_mut().push(ManualInterval {
            id,
            period,
            next_due: self.now_ms.get() + period,
            callback: Rc::new(RefCell::new(callback)),
        });
        Ok(id)
    }

    fn clear_interval(&self, id: ScheduleId) {
        self.intervals.borrow_mut().retain(|iv| iv.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<f64>>>, impl FnMut(f64) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |p| sink.borrow_mut().push(p))
    }

    #[test]
    fn progress_ping_pongs_within_bounds() {
        let mut p = MorphProgress::new(0.25);
        let values: Vec<f64> = (0..9).map(|_| p.advance()).collect();
        assert_eq!(values, vec![0.25, 0.5, 0.75, 1.0, 0.75, 0.5, 0.25, 0.0, 0.25]);

        let mut p = MorphProgress::default();
        for _ in 0..1_000 {
            let v = p.advance();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn frame_loop_schedules_on_mount_and_threads_progress() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (seen, cb) = recorder();
        let lp = FrameLoop::mount(scheduler.clone(), MorphProgress::new(0.25), cb);
        assert_eq!(lp.state(), LoopState::Scheduled);
        assert_eq!(scheduler.pending_frames(), 1);
        assert!(seen.borrow().is_empty());

        scheduler.run_frames(3);
        assert_eq!(*seen.borrow(), vec![0.0, 0.25, 0.5]);
        assert_eq!(lp.frames(), 3);
        assert_eq!(lp.progress().value(), 0.75);
        assert_eq!(scheduler.pending_frames(), 1);
    }

    #[test]
    fn no_frames_after_teardown() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (seen, cb) = recorder();
        let lp = FrameLoop::mount(scheduler.clone(), MorphProgress::default(), cb);
        scheduler.run_frames(2);
        drop(lp);
        assert_eq!(scheduler.pending_frames(), 0);
        assert_eq!(scheduler.run_frames(5), 0);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn cancel_is_terminal_and_idempotent() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (seen, cb) = recorder();
        let lp = FrameLoop::mount(scheduler.clone(), MorphProgress::default(), cb);
        lp.cancel();
        lp.cancel();
        assert_eq!(lp.state(), LoopState::Canceled);
        scheduler.run_frames(3);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn already_queued_frame_is_ignored_after_cancel() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (seen, cb) = recorder();
        let lp = FrameLoop::mount(scheduler.clone(), MorphProgress::default(), cb);
        // Steal the queued callback so cancel cannot withdraw it.
        let stolen = std::mem::take(&mut *scheduler.frames.borrow_mut());
        lp.cancel();
        for (_, f) in stolen {
            f(0.0);
        }
        assert!(seen.borrow().is_empty());
        assert_eq!(lp.state(), LoopState::Canceled);
    }

    #[test]
    fn rejected_frame_request_cancels_loop() {
        let scheduler = Rc::new(ManualScheduler::new());
        scheduler.reject_requests(true);
        let (_seen, cb) = recorder();
        let lp = FrameLoop::mount(scheduler.clone(), MorphProgress::default(), cb);
        assert_eq!(lp.state(), LoopState::Canceled);
    }

    #[test]
    fn periodic_loop_ticks_immediately_then_every_period() {
        let scheduler = Rc::new(ManualScheduler::new());
        let count = Rc::new(Cell::new(0u32));
        let c = count.clone();
        let lp = PeriodicLoop::mount(scheduler.clone(), DEFAULT_REFRESH_MS, move || {
            c.set(c.get() + 1)
        });
        assert_eq!(count.get(), 1);
        assert_eq!(lp.state(), LoopState::Scheduled);

        assert_eq!(scheduler.advance(9_999), 0);
        assert_eq!(scheduler.advance(1), 1);
        assert_eq!(scheduler.advance(30_000), 3);
        assert_eq!(count.get(), 5);
        assert_eq!(lp.ticks(), 5);
    }

    #[test]
    fn periodic_loop_stops_after_drop() {
        let scheduler = Rc::new(ManualScheduler::new());
        let count = Rc::new(Cell::new(0u32));
        let c = count.clone();
        let lp = PeriodicLoop::mount(scheduler.clone(), 1_000, move || c.set(c.get() + 1));
        scheduler.advance(2_000);
        drop(lp);
        assert_eq!(scheduler.active_intervals(), 0);
        assert_eq!(scheduler.advance(10_000), 0);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn rejected_interval_still_runs_initial_tick() {
        let scheduler = Rc::new(ManualScheduler::new());
        scheduler.reject_requests(true);
        let count = Rc::new(Cell::new(0u32));
        let c = count.clone();
        let lp = PeriodicLoop::mount(scheduler.clone(), 1_000, move || c.set(c.get() + 1));
        assert_eq!(count.get(), 1);
        assert_eq!(lp.state(), LoopState::Canceled);
    }
}
