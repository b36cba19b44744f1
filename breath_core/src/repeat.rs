//! Repeat-block cursor.
//!
//! Exercises stay a flat list of steps; a `repeat` step replays the
//! `lookback` steps before it. The cursor holds the jump bookkeeping for
//! the one block that may be active at a time. A `repeat` step met while a
//! block is active is skipped, not nested.

use crate::RepeatProgress;

/// Bookkeeping for an active repeat block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepeatCursor {
    /// Index of the `repeat` step that declared the block
    pub repeat_step_index: usize,
    pub block_start: usize,
    /// Inclusive
    pub block_end: usize,
    /// Replays still to run, including the one in progress
    pub remaining: u32,
    /// Total passes over the block, the in-line pass included
    pub total: u32,
}

impl RepeatCursor {
    /// Cursor for the `repeat` step at `repeat_step_index`
    ///
    /// `None` when there is nothing to replay: the in-line pass already
    /// satisfies `total <= 1`, or the lookback window is empty.
    pub fn install(repeat_step_index: usize, lookback: usize, total: u32) -> Option<Self> {
        if total <= 1 || lookback == 0 || repeat_step_index == 0 {
            return None;
        }
        let block_start = repeat_step_index.saturating_sub(lookback);
        let block_end = repeat_step_index - 1;

        Some(Self {
            repeat_step_index,
            block_start,
            block_end,
            remaining: total - 1,
            total,
        })
    }

    /// Sequence index to resume from so that the next advance lands on
    /// `block_start`; `None` when the block starts the sequence
    pub fn entry_index(&self) -> Option<usize> {
        self.block_start.checked_sub(1)
    }

    pub fn is_block_end(&self, index: Option<usize>) -> bool {
        index == Some(self.block_end)
    }

    /// Record that a pass over the block finished
    ///
    /// Returns `true` when another replay should run.
    pub fn finish_pass(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining > 0
    }

    /// Round of the pass currently running
    pub fn progress(&self) -> RepeatProgress {
        RepeatProgress {
            round: self.total - self.remaining + 1,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_bounds() {
        let cursor = RepeatCursor::install(4, 2, 3).unwrap();
        assert_eq!(cursor.block_start, 2);
        assert_eq!(cursor.block_end, 3);
        assert_eq!(cursor.remaining, 2);
        assert_eq!(cursor.entry_index(), Some(1));
    }

    #[test]
    fn test_lookback_clamped_to_sequence_start() {
        let cursor = RepeatCursor::install(2, 10, 2).unwrap();
        assert_eq!(cursor.block_start, 0);
        assert_eq!(cursor.block_end, 1);
        assert_eq!(cursor.entry_index(), None);
    }

    #[test]
    fn test_degenerate_repeats_skipped() {
        assert!(RepeatCursor::install(3, 2, 1).is_none());
        assert!(RepeatCursor::install(3, 2, 0).is_none());
        assert!(RepeatCursor::install(3, 0, 4).is_none());
        assert!(RepeatCursor::install(0, 2, 4).is_none());
    }

    #[test]
    fn test_replays_total_minus_one() {
        let mut cursor = RepeatCursor::install(2, 2, 3).unwrap();
        assert_eq!(cursor.progress(), RepeatProgress { round: 2, total: 3 });

        assert!(cursor.finish_pass());
        assert_eq!(cursor.progress(), RepeatProgress { round: 3, total: 3 });

        assert!(!cursor.finish_pass());
    }
}
