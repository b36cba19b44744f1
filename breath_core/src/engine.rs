//! Exercise engine: the live step interpreter.
//!
//! The engine walks an exercise one step at a time on top of a
//! [`JobQueue`]. Every wait is a scheduled job; the host drives time by
//! calling [`Engine::tick`]. Observable state and side effects leave the
//! engine through an [`EnginePort`].
//!
//! ## Stepping rules
//!
//! 1. At the end of an active repeat block: replay it while passes remain,
//!    otherwise continue after the `repeat` step.
//! 2. Inside a repeat block: advance by one.
//! 3. Otherwise advance modulo the sequence length. Wrapping to step 0
//!    bumps the sequence loop; a non-loopable exercise restarts instead
//!    (keeping the loop count, which drives ramps).
//! 4. A `repeat` step installs a block unless one is active, the ramped
//!    count is `<= 1`, or the block is empty; it is never dispatched.

use crate::repeat::RepeatCursor;
use crate::scheduler::{JobOptions, JobQueue, Scheduler};
use crate::timed_step::{TimedStep, TimedStepEvent, TimedStepJob};
use crate::{
    Cue, EnginePort, EngineState, Error, Exercise, Result, Step, VibratePattern,
    BREATH_PHASE_CUES,
};

/// Upper bound on steps resolved without scheduling anything
const MAX_IMMEDIATE_ADVANCES: usize = 1024;

/// Ring position at the end of the first half of a double inhale
const DOUBLE_INHALE_PEAK: f64 = 0.7;

/// Work the engine schedules on its job queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineJob {
    Timed(TimedStepJob),
    /// Enter breath phase `step % 4` of cycle `step / 4`
    BreathPhase(u32),
    DoubleInhale(DoubleInhaleStage),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoubleInhaleStage {
    Pause,
    SecondInhale,
    Done,
}

impl From<TimedStepJob> for EngineJob {
    fn from(job: TimedStepJob) -> Self {
        EngineJob::Timed(job)
    }
}

/// Outcome of starting a step or phase
enum Dispatch {
    /// Jobs were scheduled; the step continues later
    Scheduled,
    /// Nothing to wait for; move on immediately
    Finished,
}

enum Resolved {
    Step(usize),
    /// Non-loopable exercise wrapped around
    Restart,
    Stalled,
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

/// Live exercise interpreter
pub struct Engine<P, S = Scheduler<EngineJob>> {
    exercises: Vec<Exercise>,
    scheduler: S,
    port: P,
    exercise_index: usize,
    seq_index: Option<usize>,
    sequence_loop: u32,
    breath_pattern: Option<[f64; 4]>,
    repeat: Option<RepeatCursor>,
    timed: Option<TimedStep>,
    state: EngineState,
    destroyed: bool,
}

impl<P: EnginePort> Engine<P> {
    pub fn new(exercises: Vec<Exercise>, port: P) -> Self {
        Self::with_scheduler(exercises, Scheduler::new(), port)
    }
}

impl<P: EnginePort, S: JobQueue<EngineJob>> Engine<P, S> {
    /// Build an engine over a caller-supplied scheduler
    pub fn with_scheduler(exercises: Vec<Exercise>, scheduler: S, port: P) -> Self {
        let requested = port.initial_exercise_index();
        let exercise_index = if requested < exercises.len() {
            requested
        } else {
            if !exercises.is_empty() {
                tracing::warn!(
                    "Initial exercise index {} out of range ({} exercises), using 0",
                    requested,
                    exercises.len()
                );
            }
            0
        };

        Self {
            exercises,
            scheduler,
            port,
            exercise_index,
            seq_index: None,
            sequence_loop: 0,
            breath_pattern: None,
            repeat: None,
            timed: None,
            state: EngineState::default(),
            destroyed: false,
        }
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Start the current exercise, or resume it if already started
    pub fn start(&mut self) {
        if self.destroyed {
            return;
        }
        if self.is_started() {
            if !self.scheduler.is_active() {
                self.scheduler.start();
                self.port.on_pause_change(false);
            }
            return;
        }
        tracing::debug!("Starting exercise {:?}", self.exercise_name());
        self.scheduler.start();
        self.port.on_pause_change(false);
        self.next_step();
    }

    /// Flip between running and paused
    pub fn toggle(&mut self) {
        if self.destroyed {
            return;
        }
        self.scheduler.toggle();
        self.haptic();
        self.port.on_pause_change(!self.scheduler.is_active());
    }

    /// Same as [`Engine::toggle`]
    pub fn pause(&mut self) {
        self.toggle();
    }

    /// Drop the step in flight and either restart at step 0 or, with
    /// `and_stop`, stop with a blank state and the loop count zeroed
    pub fn reset(&mut self, and_stop: bool) {
        if self.destroyed {
            return;
        }
        self.clear_step_state();
        if and_stop {
            self.sequence_loop = 0;
            self.emit_state(EngineState::default());
            self.scheduler.stop();
            self.port.on_pause_change(true);
        } else {
            self.start();
        }
    }

    /// User tap: start, resume, or skip an open-ended step
    ///
    /// Steps with a finite count ignore the tap and run to completion.
    pub fn advance(&mut self) {
        if self.destroyed {
            return;
        }
        if !self.is_started() {
            self.start();
        } else if !self.scheduler.is_active() {
            self.toggle();
        } else if self.current_effective_count() == Some(0) {
            tracing::debug!("User advanced past open-ended step {:?}", self.seq_index);
            self.scheduler.clear_jobs();
            self.timed = None;
            self.port.on_animate_breath(0.0, 0.0);
            self.next_step();
        }
    }

    /// Move the selection by `delta`, wrapping around the exercise list
    pub fn next_exercise(&mut self, delta: i32) {
        if self.destroyed || self.exercises.is_empty() {
            return;
        }
        let len = self.exercises.len() as i64;
        let next = (self.exercise_index as i64 + i64::from(delta)).rem_euclid(len) as usize;
        if self.is_started() {
            self.reset(true);
        }
        self.exercise_index = next;
        tracing::debug!("Selected exercise {} ({:?})", next, self.exercise_name());
        self.port.save_exercise_index(next);
    }

    /// Jump to the exercise at `index` and start it from scratch
    pub fn set_exercise(&mut self, index: usize) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        if index >= self.exercises.len() {
            return Err(Error::UnknownExercise(format!(
                "index {} (have {} exercises)",
                index,
                self.exercises.len()
            )));
        }
        self.reset(true);
        self.exercise_index = index;
        self.start();
        Ok(())
    }

    /// Tear down; every later control call is ignored
    pub fn destroy(&mut self) {
        self.scheduler.reset();
        self.timed = None;
        self.destroyed = true;
    }

    /// Advance logical time and run every job that became due
    pub fn tick(&mut self, delta_ms: u64) {
        if self.destroyed {
            return;
        }
        self.scheduler.advance_clock(delta_ms);
        while let Some(job) = self.scheduler.pop_due() {
            self.run_job(job);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Whether a tap would do something other than resume
    pub fn can_advance(&self) -> bool {
        !self.is_started() || self.current_effective_count() == Some(0)
    }

    pub fn exercise_name(&self) -> &str {
        self.exercise().map_or("", |e| e.name.as_str())
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.exercise_index)
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn is_started(&self) -> bool {
        self.seq_index.is_some()
    }

    pub fn sequence_loop(&self) -> u32 {
        self.sequence_loop
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Logical time in milliseconds
    pub fn clock_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// Last emitted state
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn current_step(&self) -> Option<&Step> {
        let index = self.seq_index?;
        self.exercise()?.seq.get(index)
    }

    fn current_effective_count(&self) -> Option<u32> {
        self.current_step()?.effective_count(self.sequence_loop)
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    fn run_job(&mut self, job: EngineJob) {
        match job {
            EngineJob::Timed(job) => {
                let Some(timed) = self.timed.as_mut() else {
                    return;
                };
                match timed.on_job(job) {
                    Some(TimedStepEvent::Sublabel(sublabel)) => {
                        let mut state = self.state.clone();
                        state.sublabel = sublabel;
                        self.emit_state(state);
                    }
                    Some(TimedStepEvent::Complete) => {
                        self.timed = None;
                        self.haptic();
                        self.next_step();
                    }
                    None => {}
                }
            }
            EngineJob::BreathPhase(step) => {
                if let Dispatch::Finished = self.step_breath_phase(step, false) {
                    self.next_step();
                }
            }
            EngineJob::DoubleInhale(stage) => self.double_inhale_stage(stage),
        }
    }

    fn next_step(&mut self) {
        let mut budget = MAX_IMMEDIATE_ADVANCES;
        let loop_before = self.sequence_loop;
        loop {
            if self.exercise().map_or(true, |e| e.seq.is_empty()) {
                tracing::debug!("Exercise has no steps, nothing to run");
                return;
            }
            let previous = self.seq_index;
            let index = match self.resolve_next(&mut budget) {
                Resolved::Step(index) => index,
                Resolved::Restart => {
                    tracing::debug!(
                        "Non-loopable exercise finished loop {}, restarting",
                        self.sequence_loop
                    );
                    self.clear_step_state();
                    self.scheduler.start();
                    self.port.on_pause_change(false);
                    continue;
                }
                Resolved::Stalled => break,
            };
            match self.dispatch(index, previous) {
                Dispatch::Scheduled => return,
                Dispatch::Finished => {
                    budget = budget.saturating_sub(1);
                    if budget == 0 {
                        break;
                    }
                }
            }
        }

        tracing::warn!(
            "Exercise {:?} has no timed steps, stopping",
            self.exercise_name()
        );
        // Wraps taken while stalled are not real loops
        self.sequence_loop = loop_before;
        self.clear_step_state();
        self.scheduler.stop();
        self.port.on_pause_change(true);
    }

    /// Pick the next step to dispatch, applying repeat and wrap rules
    fn resolve_next(&mut self, budget: &mut usize) -> Resolved {
        let len = self.exercise().map_or(0, |e| e.seq.len());
        loop {
            if *budget == 0 {
                return Resolved::Stalled;
            }
            *budget -= 1;

            let next = match self.repeat.as_mut() {
                Some(cursor) if cursor.is_block_end(self.seq_index) => {
                    if cursor.finish_pass() {
                        let progress = cursor.progress();
                        let start = cursor.block_start;
                        tracing::debug!(
                            "Repeat round {}/{} from step {}",
                            progress.round,
                            progress.total,
                            start
                        );
                        self.port.on_repeat_change(Some(progress));
                        start
                    } else {
                        let after = cursor.repeat_step_index;
                        self.repeat = None;
                        self.port.on_repeat_change(None);
                        self.seq_index = Some(after);
                        match self.wrap_forward(len) {
                            Some(next) => next,
                            None => return Resolved::Restart,
                        }
                    }
                }
                Some(_) => self.seq_index.map_or(0, |i| i + 1),
                None => match self.wrap_forward(len) {
                    Some(next) => next,
                    None => return Resolved::Restart,
                },
            };
            self.seq_index = Some(next);

            let Some(step) = self.exercise().and_then(|e| e.seq.get(next)) else {
                return Resolved::Stalled;
            };
            let Step::Repeat {
                value: [lookback], ..
            } = step
            else {
                return Resolved::Step(next);
            };
            let lookback = *lookback;
            let total = step.effective_count(self.sequence_loop).unwrap_or(0);

            if self.repeat.is_some() {
                tracing::debug!("Skipping nested repeat at step {}", next);
                continue;
            }
            match RepeatCursor::install(next, lookback, total) {
                Some(cursor) => {
                    tracing::debug!(
                        "Repeating steps {}..={} for {} passes",
                        cursor.block_start,
                        cursor.block_end,
                        cursor.total
                    );
                    self.port.on_repeat_change(Some(cursor.progress()));
                    self.seq_index = cursor.entry_index();
                    self.repeat = Some(cursor);
                }
                None => tracing::debug!("Skipping repeat at step {} (count {})", next, total),
            }
        }
    }

    /// Advance past the current index modulo `len`
    ///
    /// `None` when a non-loopable exercise wrapped and must restart.
    fn wrap_forward(&mut self, len: usize) -> Option<usize> {
        let previous = self.seq_index;
        let next = previous.map_or(0, |i| (i + 1) % len);
        if next == 0 && previous.is_some() {
            self.sequence_loop += 1;
            tracing::debug!("Sequence loop {}", self.sequence_loop);
        }
        let loopable = self.exercise().is_some_and(|e| e.loopable);
        if !loopable && previous.is_some_and(|p| next < p) {
            return None;
        }
        Some(next)
    }

    fn dispatch(&mut self, index: usize, previous: Option<usize>) -> Dispatch {
        let Some(step) = self.exercise().and_then(|e| e.seq.get(index)).cloned() else {
            return Dispatch::Finished;
        };
        let count = step.effective_count(self.sequence_loop).unwrap_or(0);
        tracing::debug!("Step {}: {} (count {})", index, step.kind(), count);

        match step {
            Step::Breath { value, .. } => {
                self.breath_pattern = Some(value);
                self.step_breath_phase(0, previous.is_none())
            }
            Step::Inhale { .. } => self.run_hie(Cue::Inhale, Some(1.0), count),
            Step::Exhale { .. } => self.run_hie(Cue::Exhale, Some(0.0), count),
            Step::Hold { .. } => self.run_hie(Cue::Hold, None, count),
            Step::Text { text, .. } => {
                let (timed, initial) =
                    TimedStep::begin::<EngineJob, _>(count, &mut self.scheduler);
                self.timed = Some(timed);
                self.emit_state(EngineState::text(text, initial));
                Dispatch::Scheduled
            }
            Step::DoubleInhale { value } => self.run_double_inhale(value),
            Step::Repeat { .. } => Dispatch::Finished,
        }
    }

    // ========================================================================
    // Phase executors
    // ========================================================================

    /// Enter breath phase `step`, skipping zero-length phases
    fn step_breath_phase(&mut self, mut step: u32, first_of_run: bool) -> Dispatch {
        let Some(pattern) = self.breath_pattern else {
            return Dispatch::Finished;
        };
        if pattern.iter().all(|d| *d <= 0.0) {
            tracing::warn!("Breath step without any timed phase, skipping");
            return Dispatch::Finished;
        }
        let count = self.current_effective_count().unwrap_or(0);

        loop {
            let phase = (step % 4) as usize;
            let cycle = step / 4;
            if count > 0 && cycle >= count {
                return Dispatch::Finished;
            }
            let last_phase_of_step = phase == 3 && count > 0 && cycle + 1 == count;
            let duration = pattern[phase];

            if duration <= 0.0 {
                if last_phase_of_step {
                    self.vibrate(self.step_end_pattern());
                    return Dispatch::Finished;
                }
                step += 1;
                continue;
            }

            if last_phase_of_step {
                self.vibrate(self.step_end_pattern());
            } else if !first_of_run {
                self.vibrate(VibratePattern::PhaseChange);
            }
            match phase {
                0 => self.port.on_animate_breath(1.0, duration),
                2 => self.port.on_animate_breath(0.0, duration),
                _ => {}
            }

            let cue = BREATH_PHASE_CUES[phase];
            self.play(cue);
            let shown = if count > 0 { count - cycle } else { cycle + 1 };
            self.emit_state(EngineState::breathing(cue.as_str(), format!("n° {}", shown)));

            self.scheduler.add_job(
                secs_to_ms(duration),
                EngineJob::BreathPhase(step + 1),
                JobOptions::default().label("breath-phase"),
            );
            return Dispatch::Scheduled;
        }
    }

    /// Vibration marking the end of a breath step
    fn step_end_pattern(&self) -> VibratePattern {
        if self.upcoming_step().is_some_and(Step::is_breath) {
            VibratePattern::SameStepType
        } else {
            VibratePattern::StepTypeChange
        }
    }

    /// Step that will run after the current one, following the same repeat
    /// and wrap rules as `resolve_next` without side effects
    fn upcoming_step(&self) -> Option<&Step> {
        let exercise = self.exercise()?;
        let len = exercise.seq.len();
        let mut index = self.seq_index?;
        let mut cursor = self.repeat.clone();
        let mut loop_index = self.sequence_loop;

        for _ in 0..2 * len {
            let next = match cursor.as_mut() {
                Some(c) if c.is_block_end(Some(index)) => {
                    if c.finish_pass() {
                        c.block_start
                    } else {
                        let after = c.repeat_step_index;
                        cursor = None;
                        (after + 1) % len
                    }
                }
                Some(_) => index + 1,
                None => (index + 1) % len,
            };
            if next == 0 && cursor.is_none() {
                loop_index += 1;
            }
            index = next;

            let step = exercise.seq.get(index)?;
            let Step::Repeat {
                value: [lookback], ..
            } = step
            else {
                return Some(step);
            };
            if cursor.is_some() {
                continue;
            }
            let total = step.effective_count(loop_index).unwrap_or(0);
            if let Some(c) = RepeatCursor::install(index, *lookback, total) {
                let start = c.block_start;
                cursor = Some(c);
                let first = exercise.seq.get(start)?;
                if !first.is_repeat() {
                    return Some(first);
                }
                index = start;
            }
        }
        None
    }

    /// Standalone hold, inhale or exhale
    fn run_hie(&mut self, cue: Cue, ring_target: Option<f64>, count: u32) -> Dispatch {
        let (timed, initial) = TimedStep::begin::<EngineJob, _>(count, &mut self.scheduler);
        self.timed = Some(timed);
        self.emit_state(EngineState::hie(cue.as_str(), initial));
        self.play(cue);
        if let Some(target) = ring_target {
            self.port.on_animate_breath(target, f64::from(count));
        }
        Dispatch::Scheduled
    }

    fn run_double_inhale(&mut self, [first, pause, second]: [f64; 3]) -> Dispatch {
        self.port.on_animate_breath(0.0, 0.0);
        self.port.on_animate_breath(DOUBLE_INHALE_PEAK, first);
        if first > 0.0 {
            self.play(Cue::Inhale);
        }
        self.emit_state(EngineState::breathing(Cue::Inhale.as_str(), ""));

        let stages = [
            (first, DoubleInhaleStage::Pause),
            (first + pause, DoubleInhaleStage::SecondInhale),
            (first + pause + second, DoubleInhaleStage::Done),
        ];
        for (at, stage) in stages {
            self.scheduler.add_job(
                secs_to_ms(at),
                EngineJob::DoubleInhale(stage),
                JobOptions::default().label("double-inhale"),
            );
        }
        Dispatch::Scheduled
    }

    fn double_inhale_stage(&mut self, stage: DoubleInhaleStage) {
        let second = match self.current_step() {
            Some(Step::DoubleInhale {
                value: [_, _, second],
            }) => *second,
            _ => return,
        };
        match stage {
            DoubleInhaleStage::Pause => {
                self.vibrate(VibratePattern::Light);
                self.emit_state(EngineState::breathing(Cue::Hold.as_str(), ""));
            }
            DoubleInhaleStage::SecondInhale => {
                self.port.on_animate_breath(1.0, second);
                if second > 0.0 {
                    self.play(Cue::Inhale);
                }
                self.emit_state(EngineState::breathing(Cue::Inhale.as_str(), ""));
            }
            DoubleInhaleStage::Done => {
                self.haptic();
                self.next_step();
            }
        }
    }

    // ========================================================================
    // Side effects
    // ========================================================================

    /// Drop jobs and per-step state; the selection and loop count survive
    fn clear_step_state(&mut self) {
        self.scheduler.clear_jobs();
        self.breath_pattern = None;
        self.timed = None;
        if self.repeat.take().is_some() {
            self.port.on_repeat_change(None);
        }
        self.port.on_animate_breath(0.0, 0.0);
        self.seq_index = None;
    }

    fn emit_state(&mut self, state: EngineState) {
        self.state = state;
        self.port.on_state_change(&self.state);
    }

    fn play(&mut self, cue: Cue) {
        if self.port.is_sound_enabled() {
            self.port.on_play_sound(cue);
        }
    }

    fn vibrate(&mut self, pattern: VibratePattern) {
        if self.port.is_haptics_enabled() {
            self.port.on_vibrate(pattern);
        }
    }

    fn haptic(&mut self) {
        if self.port.is_haptics_enabled() {
            self.port.on_haptic();
        }
    }
}
