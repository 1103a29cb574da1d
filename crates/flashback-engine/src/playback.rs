//! Realtime playback of a loaded action log.
//!
//! A [`Playback`] owns a [`Cursor`] and drives it from a scheduler thread.
//! The thread wakes `scheduler_hz` times per second, converts elapsed
//! wall time into whole ticks through a [`TickAccumulator`] and applies
//! them inside the host's [`WorldExecutor`].
//!
//! ```text
//! control calls ─────────────┐
//!                            v
//! scheduler thread ──> executor.execute(world) ──> Mutex<Cursor> ──> WorldAdapter
//! ```
//!
//! The world is always taken before the cursor, on every path.

use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use flashback_core::{CodecLookup, WorldAdapter, WorldExecutor};
use flashback_replay::{ActionLog, ActionRegistry, Cursor, Step};

use crate::config::{check_speed, PlaybackConfig};
use crate::error::PlaybackError;

const SCHEDULER_THREAD: &str = "flashback-playback";

// ── TickAccumulator ────────────────────────────────────────────────

/// Millionths of a tick.
const ONE: u64 = 1_000_000;

/// Converts scheduler firings into whole ticks.
///
/// Each firing adds `tick_rate / scheduler_rate * speed` ticks in fixed
/// point; the whole part is due now and the remainder carries over, so
/// no fraction is ever lost between firings.
#[derive(Clone, Debug)]
pub struct TickAccumulator {
    per_firing: f64,
    acc: u64,
}

impl TickAccumulator {
    /// Accumulator for a timer firing `scheduler_hz` times per second
    /// over a log recorded at `tick_rate_hz`.
    pub fn new(tick_rate_hz: f64, scheduler_hz: f64) -> Self {
        Self {
            per_firing: tick_rate_hz * ONE as f64 / scheduler_hz,
            acc: 0,
        }
    }

    /// Account for one firing at `speed`. Returns the whole ticks due.
    pub fn advance(&mut self, speed: f64) -> u32 {
        let step = (self.per_firing * speed).round() as u64;
        self.acc = self.acc.saturating_add(step);
        let due = self.acc / ONE;
        self.acc %= ONE;
        u32::try_from(due).unwrap_or(u32::MAX)
    }

    /// Drop any carried fraction.
    pub fn reset(&mut self) {
        self.acc = 0;
    }
}

// ── Shared ─────────────────────────────────────────────────────────

struct Shared {
    config: PlaybackConfig,
    cursor: Mutex<Cursor>,
    executor: Arc<dyn WorldExecutor>,
    lookup: Arc<dyn CodecLookup>,
    paused: AtomicBool,
    reversed: AtomicBool,
    speed_bits: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn cursor(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn speed(&self) -> f64 {
        f64::from_bits(self.speed_bits.load(Ordering::Acquire))
    }

    /// Run `f` against the cursor inside the executor.
    fn run<T>(
        &self,
        f: impl FnOnce(&mut Cursor, &mut dyn WorldAdapter, &dyn CodecLookup) -> T,
    ) -> Result<T, PlaybackError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PlaybackError::Closed);
        }
        let lookup = &*self.lookup;
        let mut f = Some(f);
        let mut out = None;
        self.executor.execute(&mut |world: &mut dyn WorldAdapter| {
            if let Some(f) = f.take() {
                let mut cursor = self.cursor();
                out = Some(f(&mut cursor, world, lookup));
            }
        });
        out.ok_or(PlaybackError::NotExecuted)
    }

    /// One scheduled tick in the current direction.
    fn tick_once(&self) -> Result<Step, PlaybackError> {
        let reversed = self.reversed.load(Ordering::Acquire);
        self.run(|cursor, world, lookup| {
            let was_ended = cursor.has_ended();
            let step = if reversed {
                cursor.reverse(world, lookup)
            } else {
                cursor.forward(world, lookup)
            };
            if step == Step::End && !was_ended {
                log::info!("playback reached the end at tick {}", cursor.tick());
            }
            step
        })
    }

    /// Ticks the cursor can still move in the current direction, counting
    /// the step that marks the end of a forward run.
    fn remaining(&self, reversed: bool) -> u32 {
        let cursor = self.cursor();
        if reversed {
            cursor.tick()
        } else if cursor.has_ended() {
            0
        } else {
            cursor.total_ticks().saturating_sub(cursor.tick()).saturating_add(1)
        }
    }

    /// Handle one timer firing. Returns the ticks applied.
    ///
    /// Never runs more executor tasks than there are ticks left, whatever
    /// the speed.
    fn fire(&self, acc: &mut TickAccumulator) -> u32 {
        let due = acc.advance(self.speed());
        if due == 0 || self.paused.load(Ordering::Acquire) {
            return 0;
        }
        let due = due.min(self.remaining(self.reversed.load(Ordering::Acquire)));
        let mut applied = 0;
        for _ in 0..due {
            match self.tick_once() {
                Ok(Step::Moved(_)) => applied += 1,
                Ok(Step::End | Step::Start) => break,
                Err(e) => {
                    log::debug!("scheduler firing cut short: {e}");
                    break;
                }
            }
        }
        if applied > 1 {
            log::trace!("applied {applied} ticks in one firing");
        }
        applied
    }
}

// ── Playback ───────────────────────────────────────────────────────

#[derive(Default)]
struct Scheduler {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    started: bool,
}

/// Realtime playback of an [`ActionLog`] into a host world.
///
/// Control calls may come from any thread. Seeking operations run inside
/// the executor and ignore pause and direction; the scheduler honours
/// both.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use flashback_core::SharedWorld;
/// use flashback_engine::{Playback, PlaybackConfig};
/// use flashback_replay::ActionLog;
/// use flashback_test_utils::{lookup, MockWorld};
///
/// let mut log = ActionLog::new();
/// log.extend_to(40);
/// let world = SharedWorld::new(MockWorld::new());
/// let playback = Playback::new(log, Arc::new(world), Arc::new(lookup()), PlaybackConfig::default()).unwrap();
/// assert_eq!(playback.duration().as_secs(), 2);
///
/// playback.seek(30).unwrap();
/// playback.rewind(5).unwrap();
/// assert_eq!(playback.tick(), 25);
/// playback.close();
/// ```
pub struct Playback {
    shared: Arc<Shared>,
    scheduler: Mutex<Scheduler>,
}

impl Playback {
    /// Playback of `log` at tick zero. The scheduler is not running until
    /// [`start`](Self::start).
    pub fn new(
        log: ActionLog,
        executor: Arc<dyn WorldExecutor>,
        lookup: Arc<dyn CodecLookup>,
        config: PlaybackConfig,
    ) -> Result<Self, PlaybackError> {
        config.validate()?;
        log::debug!(
            "playback ready: {} ticks, {} actions",
            log.total_ticks(),
            log.action_count()
        );
        Ok(Self {
            shared: Arc::new(Shared {
                paused: AtomicBool::new(config.start_paused),
                reversed: AtomicBool::new(false),
                speed_bits: AtomicU64::new(config.initial_speed.to_bits()),
                closed: AtomicBool::new(false),
                cursor: Mutex::new(Cursor::new(log)),
                executor,
                lookup,
                config,
            }),
            scheduler: Mutex::new(Scheduler::default()),
        })
    }

    /// Load a compressed log from `source` with the configured
    /// [`LoadMode`](flashback_replay::LoadMode) and wrap it.
    pub fn open<R: Read>(
        source: R,
        registry: &ActionRegistry,
        executor: Arc<dyn WorldExecutor>,
        lookup: Arc<dyn CodecLookup>,
        config: PlaybackConfig,
    ) -> Result<Self, PlaybackError> {
        let log = ActionLog::load(source, registry, config.load_mode)?;
        Self::new(log, executor, lookup, config)
    }

    /// Spawn the scheduler thread.
    pub fn start(&self) -> Result<(), PlaybackError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(PlaybackError::Closed);
        }
        let mut scheduler = self.scheduler();
        if scheduler.started {
            return Err(PlaybackError::AlreadyStarted);
        }
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(SCHEDULER_THREAD.into())
            .spawn(move || run_scheduler(&shared, &cancel_rx))
            .map_err(PlaybackError::ThreadSpawnFailed)?;
        scheduler.started = true;
        scheduler.cancel = Some(cancel_tx);
        scheduler.handle = Some(handle);
        log::info!(
            "playback started: {} Hz ticks, scheduler at {} Hz",
            self.shared.config.tick_rate_hz,
            self.shared.config.scheduler_hz
        );
        Ok(())
    }

    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one scheduled tick in the current direction. Returns `None`
    /// while paused.
    pub fn step(&self) -> Result<Option<Step>, PlaybackError> {
        if self.is_paused() {
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(PlaybackError::Closed);
            }
            return Ok(None);
        }
        self.shared.tick_once().map(Some)
    }

    /// Play up to `n` ticks forward. Returns the ticks applied.
    pub fn fast_forward(&self, n: u32) -> Result<u32, PlaybackError> {
        self.shared
            .run(|cursor, world, lookup| cursor.fast_forward(n, world, lookup))
    }

    /// Undo up to `n` ticks. Returns the ticks undone.
    pub fn rewind(&self, n: u32) -> Result<u32, PlaybackError> {
        self.shared
            .run(|cursor, world, lookup| cursor.rewind(n, world, lookup))
    }

    /// Move to `tick`, clamped to the log. Returns the tick reached.
    pub fn seek(&self, tick: u32) -> Result<u32, PlaybackError> {
        self.shared.run(|cursor, world, lookup| {
            cursor.seek(tick, world, lookup);
            cursor.tick()
        })
    }

    /// Stop the scheduler from applying ticks. Elapsed time while paused
    /// is not caught up on resume.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    /// Let the scheduler apply ticks again.
    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    /// Play backwards (`true`) or forwards.
    pub fn set_reverse(&self, reverse: bool) {
        self.shared.reversed.store(reverse, Ordering::Release);
    }

    /// Change the speed multiplier.
    pub fn set_speed(&self, speed: f64) -> Result<(), PlaybackError> {
        check_speed(speed).map_err(|_| PlaybackError::InvalidSpeed { value: speed })?;
        self.shared
            .speed_bits
            .store(speed.to_bits(), Ordering::Release);
        log::debug!("playback speed set to {speed}");
        Ok(())
    }

    /// Ticks played so far.
    pub fn tick(&self) -> u32 {
        self.shared.cursor().tick()
    }

    /// Last tick of the log.
    pub fn total_ticks(&self) -> u32 {
        self.shared.cursor().total_ticks()
    }

    /// Current speed multiplier.
    pub fn speed(&self) -> f64 {
        self.shared.speed()
    }

    /// Whether the scheduler is paused.
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Whether scheduled ticks run backwards.
    pub fn is_reversed(&self) -> bool {
        self.shared.reversed.load(Ordering::Acquire)
    }

    /// Whether a forward tick was attempted past the last tick.
    pub fn has_ended(&self) -> bool {
        self.shared.cursor().has_ended()
    }

    /// Length of the log at the configured tick rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.total_ticks()) / self.shared.config.tick_rate_hz)
    }

    /// Stop the scheduler and reject further seeking. Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut scheduler = self.scheduler();
        scheduler.cancel.take();
        if let Some(handle) = scheduler.handle.take() {
            if handle.join().is_err() {
                log::warn!("{SCHEDULER_THREAD} panicked");
            }
        }
        log::debug!("playback closed at tick {}", self.tick());
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playback")
            .field("tick", &self.tick())
            .field("total_ticks", &self.total_ticks())
            .field("speed", &self.speed())
            .field("paused", &self.is_paused())
            .field("reversed", &self.is_reversed())
            .finish()
    }
}

fn run_scheduler(shared: &Shared, cancel: &Receiver<()>) {
    let config = &shared.config;
    let ticker = crossbeam_channel::tick(Duration::from_secs_f64(1.0 / config.scheduler_hz));
    let mut acc = TickAccumulator::new(config.tick_rate_hz, config.scheduler_hz);
    loop {
        select! {
            recv(cancel) -> _ => break,
            recv(ticker) -> _ => {
                shared.fire(&mut acc);
            }
        }
    }
    log::debug!("{SCHEDULER_THREAD} stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use flashback_core::SharedWorld;
    use flashback_test_utils::{lookup, MockWorld};

    /// Counts tasks run against a shared mock world.
    struct Counting {
        world: SharedWorld<MockWorld>,
        runs: AtomicUsize,
    }

    impl WorldExecutor for Counting {
        fn execute(&self, task: &mut dyn FnMut(&mut dyn WorldAdapter)) {
            self.runs.fetch_add(1, Ordering::Relaxed);
            self.world.execute(task);
        }
    }

    fn playback(total: u32) -> (Playback, Arc<Counting>) {
        let mut log = ActionLog::new();
        log.extend_to(total);
        let counting = Arc::new(Counting {
            world: SharedWorld::new(MockWorld::new()),
            runs: AtomicUsize::new(0),
        });
        let executor: Arc<dyn WorldExecutor> = counting.clone();
        let p =
            Playback::new(log, executor, Arc::new(lookup()), PlaybackConfig::default()).unwrap();
        (p, counting)
    }

    fn fire_n(p: &Playback, acc: &mut TickAccumulator, n: usize) {
        for _ in 0..n {
            p.shared.fire(acc);
        }
    }

    #[test]
    fn accumulator_carries_fractions() {
        let mut acc = TickAccumulator::new(20.0, 100.0);
        let ticks: u32 = (0..100).map(|_| acc.advance(1.0)).sum();
        assert_eq!(ticks, 20);

        let mut acc = TickAccumulator::new(20.0, 100.0);
        let due: Vec<u32> = (0..10).map(|_| acc.advance(0.5)).collect();
        assert_eq!(due.iter().sum::<u32>(), 1);
        assert_eq!(due[9], 1);

        let mut acc = TickAccumulator::new(20.0, 100.0);
        assert_eq!(acc.advance(50.0), 10);
    }

    #[test]
    fn speed_scales_ticks_per_second() {
        let (p, counting) = playback(1000);
        let mut acc = TickAccumulator::new(20.0, 100.0);
        fire_n(&p, &mut acc, 100);
        assert_eq!(p.tick(), 20);
        assert_eq!(counting.runs.load(Ordering::Relaxed), 20);

        p.set_speed(2.0).unwrap();
        fire_n(&p, &mut acc, 100);
        assert_eq!(p.tick(), 60);

        p.set_speed(0.5).unwrap();
        fire_n(&p, &mut acc, 100);
        assert_eq!(p.tick(), 70);
    }

    #[test]
    fn paused_time_is_not_caught_up() {
        let (p, counting) = playback(1000);
        let mut acc = TickAccumulator::new(20.0, 100.0);
        p.pause();
        fire_n(&p, &mut acc, 50);
        assert_eq!(counting.runs.load(Ordering::Relaxed), 0);
        assert_eq!(p.step().unwrap(), None);
        p.resume();
        fire_n(&p, &mut acc, 50);
        assert_eq!(p.tick(), 10);
    }

    #[test]
    fn reverse_firings_walk_back_and_clear_end() {
        let (p, _) = playback(5);
        let mut acc = TickAccumulator::new(20.0, 100.0);
        fire_n(&p, &mut acc, 35);
        assert_eq!(p.tick(), 5);
        assert!(p.has_ended());

        p.set_reverse(true);
        fire_n(&p, &mut acc, 10);
        assert_eq!(p.tick(), 3);
        assert!(!p.has_ended());
        fire_n(&p, &mut acc, 100);
        assert_eq!(p.tick(), 0);
    }

    #[test]
    fn high_speed_stops_at_the_last_tick() {
        let (p, counting) = playback(5);
        let mut acc = TickAccumulator::new(20.0, 100.0);
        p.set_speed(10_000.0).unwrap();

        assert_eq!(p.shared.fire(&mut acc), 5);
        assert_eq!(p.tick(), 5);
        assert!(p.has_ended());
        // Five ticks plus the one that reports the end.
        assert_eq!(counting.runs.load(Ordering::Relaxed), 6);

        fire_n(&p, &mut acc, 10);
        assert_eq!(counting.runs.load(Ordering::Relaxed), 6);

        p.set_reverse(true);
        assert_eq!(p.shared.fire(&mut acc), 5);
        assert_eq!(p.tick(), 0);
        assert!(!p.has_ended());
        fire_n(&p, &mut acc, 10);
        assert_eq!(counting.runs.load(Ordering::Relaxed), 11);
    }

    #[test]
    fn closed_playback_does_not_fire() {
        let (p, counting) = playback(100);
        let mut acc = TickAccumulator::new(20.0, 100.0);
        p.close();
        fire_n(&p, &mut acc, 100);
        assert_eq!(counting.runs.load(Ordering::Relaxed), 0);
    }
}
