//! Single-threaded tick stepping over an [`ActionLog`].
//!
//! [`Cursor`] owns the playback position and the reverse handlers
//! collected by forward ticks. It does no scheduling of its own: the
//! caller decides when to step and supplies the world for each step.

use std::collections::HashMap;

use flashback_core::{CodecLookup, WorldAdapter};
use smallvec::SmallVec;

use crate::action_log::ActionLog;
use crate::error::PlayError;
use crate::play::{PlayContext, ReverseHandler, Roster};

/// Handlers collected while one tick was played forward.
pub type TickHandlers = SmallVec<[ReverseHandler; 4]>;

/// What a single step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The cursor moved to the given tick.
    Moved(u32),
    /// Forward step past the last tick; the cursor is now ended.
    End,
    /// Reverse step at tick zero.
    Start,
}

/// Playback position over a log.
///
/// Tick `t` means every action of ticks `1..=t` has been applied. A
/// forward step from `t` applies the actions of `t + 1` and keeps their
/// reverse handlers under `t`; a reverse step from `t` applies the
/// handlers kept under `t - 1`.
#[derive(Debug, Default)]
pub struct Cursor {
    log: ActionLog,
    tick: u32,
    ended: bool,
    handlers: HashMap<u32, TickHandlers>,
    roster: Roster,
}

impl Cursor {
    /// A cursor at tick zero.
    pub fn new(log: ActionLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Current tick.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Last tick of the log.
    pub fn total_ticks(&self) -> u32 {
        self.log.total_ticks()
    }

    /// Whether a forward step ran past the last tick.
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// The log being played.
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Number of ticks holding reverse handlers.
    pub fn pending_reverse_ticks(&self) -> usize {
        self.handlers.len()
    }

    /// Apply tick `tick + 1`.
    pub fn forward(&mut self, world: &mut dyn WorldAdapter, lookup: &dyn CodecLookup) -> Step {
        let next = self.tick + 1;
        if next > self.log.total_ticks() {
            self.ended = true;
            return Step::End;
        }

        let mut collected = TickHandlers::new();
        for action in self.log.actions_at(next) {
            let mut ctx = PlayContext::new(world, lookup, &mut self.roster);
            match action.play(&mut ctx) {
                Ok(()) => {
                    if let Some(handler) = ctx.take_reverse() {
                        collected.push(handler);
                    }
                }
                Err(e) => skip(next, &e),
            }
        }
        self.handlers.insert(self.tick, collected);
        self.tick = next;
        Step::Moved(next)
    }

    /// Undo tick `tick`, in the order its handlers were collected.
    pub fn reverse(&mut self, world: &mut dyn WorldAdapter, lookup: &dyn CodecLookup) -> Step {
        if self.tick == 0 {
            return Step::Start;
        }
        let prev = self.tick - 1;
        if let Some(handlers) = self.handlers.remove(&prev) {
            for handler in &handlers {
                let mut ctx = PlayContext::new(world, lookup, &mut self.roster);
                if let Err(e) = handler.apply(&mut ctx) {
                    skip(self.tick, &e);
                }
            }
        }
        self.tick = prev;
        self.ended = false;
        Step::Moved(prev)
    }

    /// Step forward up to `n` ticks, stopping at the last tick. Returns
    /// the number of ticks applied.
    pub fn fast_forward(
        &mut self,
        n: u32,
        world: &mut dyn WorldAdapter,
        lookup: &dyn CodecLookup,
    ) -> u32 {
        let target = self.tick.saturating_add(n).min(self.log.total_ticks());
        let mut done = 0;
        while self.tick < target {
            self.forward(world, lookup);
            done += 1;
        }
        done
    }

    /// Step back up to `n` ticks, stopping at tick zero. Returns the
    /// number of ticks undone.
    pub fn rewind(
        &mut self,
        n: u32,
        world: &mut dyn WorldAdapter,
        lookup: &dyn CodecLookup,
    ) -> u32 {
        let target = self.tick.saturating_sub(n);
        let mut done = 0;
        while self.tick > target {
            self.reverse(world, lookup);
            done += 1;
        }
        done
    }

    /// Step in whichever direction reaches `tick` (clamped to the log).
    pub fn seek(&mut self, tick: u32, world: &mut dyn WorldAdapter, lookup: &dyn CodecLookup) {
        let target = tick.min(self.log.total_ticks());
        if target > self.tick {
            self.fast_forward(target - self.tick, world, lookup);
        } else {
            self.rewind(self.tick - target, world, lookup);
        }
    }
}

fn skip(tick: u32, err: &PlayError) {
    log::trace!("tick {tick}: skipped: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, BreakBlock, MoveTo, PlayerDespawn, SetBlock};
    use flashback_core::{BlockPos, CodecLookup, SurrogateId, WorldAdapter};
    use flashback_test_utils::{lookup, pose, stone, MockWorld};

    fn block_log() -> ActionLog {
        let lookup = lookup();
        let mut log = ActionLog::new();
        log.push(
            1,
            Action::SetBlock(SetBlock {
                pos: BlockPos::new(0, 0, 0),
                code: lookup.block_code(&stone()),
                layer: 0,
            }),
        );
        log.push(
            3,
            Action::BreakBlock(BreakBlock {
                pos: BlockPos::new(0, 0, 0),
            }),
        );
        log
    }

    #[test]
    fn forward_stops_and_marks_end() {
        let lookup = lookup();
        let mut world = MockWorld::new();
        let mut cursor = Cursor::new(block_log());
        assert_eq!(cursor.forward(&mut world, &lookup), Step::Moved(1));
        assert_eq!(world.block(BlockPos::new(0, 0, 0), 0), stone());
        assert_eq!(cursor.fast_forward(10, &mut world, &lookup), 2);
        assert!(!cursor.has_ended());
        assert_eq!(cursor.forward(&mut world, &lookup), Step::End);
        assert!(cursor.has_ended());
        assert_eq!(cursor.tick(), 3);
    }

    #[test]
    fn reverse_clears_end_and_consumes_handlers() {
        let lookup = lookup();
        let mut world = MockWorld::new();
        let mut cursor = Cursor::new(block_log());
        cursor.fast_forward(3, &mut world, &lookup);
        cursor.forward(&mut world, &lookup);
        assert_eq!(cursor.pending_reverse_ticks(), 3);

        assert_eq!(cursor.reverse(&mut world, &lookup), Step::Moved(2));
        assert!(!cursor.has_ended());
        assert_eq!(world.block(BlockPos::new(0, 0, 0), 0), stone());
        assert_eq!(cursor.pending_reverse_ticks(), 2);

        assert_eq!(cursor.rewind(5, &mut world, &lookup), 2);
        assert!(world.blocks.is_empty());
        assert_eq!(cursor.reverse(&mut world, &lookup), Step::Start);
        assert_eq!(cursor.pending_reverse_ticks(), 0);
    }

    #[test]
    fn missing_targets_do_not_stop_the_tick() {
        let lookup = lookup();
        let mut world = MockWorld::new();
        let mut log = ActionLog::new();
        log.push(
            1,
            Action::PlayerMove(MoveTo {
                id: SurrogateId(9),
                pose: pose(1.0, 2.0, 3.0),
            }),
        );
        log.push(1, Action::PlayerDespawn(PlayerDespawn { id: SurrogateId(9) }));
        log.push(
            1,
            Action::SetBlock(SetBlock {
                pos: BlockPos::new(1, 1, 1),
                code: lookup.block_code(&stone()),
                layer: 0,
            }),
        );
        let mut cursor = Cursor::new(log);
        cursor.forward(&mut world, &lookup);
        assert_eq!(world.block(BlockPos::new(1, 1, 1), 0), stone());
        cursor.reverse(&mut world, &lookup);
        assert!(world.blocks.is_empty());
    }

    #[test]
    fn seek_moves_both_ways_and_clamps() {
        let lookup = lookup();
        let mut world = MockWorld::new();
        let mut cursor = Cursor::new(block_log());
        cursor.seek(99, &mut world, &lookup);
        assert_eq!(cursor.tick(), 3);
        cursor.seek(1, &mut world, &lookup);
        assert_eq!(cursor.tick(), 1);
        assert_eq!(world.block(BlockPos::new(0, 0, 0), 0), stone());
    }
}
