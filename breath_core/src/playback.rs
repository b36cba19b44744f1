//! Offline schedule and duration builder.
//!
//! Walks an exercise without a clock and lists every sound cue with its
//! offset from the start of the track. The walk follows the engine's rules
//! (ramps, zero-length phase skips, repeat blocks) so a track rendered from
//! this schedule matches a live run of the same exercise.

use serde::Serialize;

use crate::repeat::RepeatCursor;
use crate::{Cue, Exercise, Step, BREATH_PHASE_CUES};

/// One sound cue in an offline schedule
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CueEvent {
    /// Seconds from the start of the track
    pub time: f64,
    pub cue: Cue,
    /// Seconds until the next phase begins
    pub duration: f64,
}

/// Cue list for `loops` passes over an exercise
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct PlaybackSchedule {
    pub events: Vec<CueEvent>,
    /// Seconds, including the leading delay
    pub total_duration: f64,
}

/// Running cursor; records cues only when built with `events`
struct Timeline {
    cursor: f64,
    events: Option<Vec<CueEvent>>,
}

impl Timeline {
    fn cue(&mut self, cue: Cue, duration: f64) {
        if duration <= 0.0 {
            return;
        }
        if let Some(events) = self.events.as_mut() {
            events.push(CueEvent {
                time: self.cursor,
                cue,
                duration,
            });
        }
        self.cursor += duration;
    }

    fn silence(&mut self, duration: f64) {
        if duration > 0.0 {
            self.cursor += duration;
        }
    }

    fn walk(&mut self, exercise: &Exercise, loops: u32) {
        for loop_index in 0..loops {
            for (index, step) in exercise.seq.iter().enumerate() {
                match step {
                    Step::Repeat {
                        value: [lookback], ..
                    } => {
                        let total = step.effective_count(loop_index).unwrap_or(0);
                        let Some(block) = RepeatCursor::install(index, *lookback, total) else {
                            continue;
                        };
                        for _ in 1..block.total {
                            for replayed in &exercise.seq[block.block_start..=block.block_end] {
                                // Repeats inside an active block are skipped
                                if !replayed.is_repeat() {
                                    self.step(replayed, loop_index);
                                }
                            }
                        }
                    }
                    _ => self.step(step, loop_index),
                }
            }
        }
    }

    fn step(&mut self, step: &Step, loop_index: u32) {
        let count = step.effective_count(loop_index).unwrap_or(0);
        match step {
            Step::Breath { value, .. } => {
                // Open-ended breathing renders as a single cycle
                for _ in 0..count.max(1) {
                    for (cue, duration) in BREATH_PHASE_CUES.iter().zip(value) {
                        self.cue(*cue, *duration);
                    }
                }
            }
            Step::Inhale { .. } => self.cue(Cue::Inhale, f64::from(count)),
            Step::Exhale { .. } => self.cue(Cue::Exhale, f64::from(count)),
            Step::Hold { .. } => self.cue(Cue::Hold, f64::from(count)),
            Step::Text { .. } => self.silence(f64::from(count)),
            Step::DoubleInhale {
                value: [first, pause, second],
            } => {
                self.cue(Cue::Inhale, *first);
                self.silence(*pause);
                self.cue(Cue::Inhale, *second);
            }
            Step::Repeat { .. } => {}
        }
    }
}

/// Every cue of `loops` passes over `exercise`, offset by `delay_secs`
pub fn build_playback_schedule(
    exercise: &Exercise,
    loops: u32,
    delay_secs: f64,
) -> PlaybackSchedule {
    let mut timeline = Timeline {
        cursor: delay_secs.max(0.0),
        events: Some(Vec::new()),
    };
    timeline.walk(exercise, loops);
    tracing::debug!(
        "Built schedule for {:?}: {} cues over {:.1}s",
        exercise.id,
        timeline.events.as_ref().map_or(0, Vec::len),
        timeline.cursor
    );

    PlaybackSchedule {
        total_duration: timeline.cursor,
        events: timeline.events.unwrap_or_default(),
    }
}

/// Length in seconds of `loops` passes over `exercise`
pub fn calculate_exercise_duration(exercise: &Exercise, loops: u32) -> f64 {
    let mut timeline = Timeline {
        cursor: 0.0,
        events: None,
    };
    timeline.walk(exercise, loops);
    timeline.cursor
}

/// Whether every step has a fixed length, so the exercise can be rendered
pub fn is_offline_eligible(exercise: &Exercise) -> bool {
    exercise.seq.iter().all(|step| match step {
        Step::Breath { .. } | Step::DoubleInhale { .. } | Step::Repeat { .. } => true,
        Step::Inhale { count, .. }
        | Step::Exhale { count, .. }
        | Step::Hold { count, .. }
        | Step::Text { count, .. } => *count > 0,
    })
}
