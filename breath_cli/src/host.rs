//! Terminal host for the live engine.
//!
//! Collects engine notifications as printable lines; the run loop stamps
//! them with the logical clock and prints them. The exercise selection is
//! persisted through [`SelectionState`].

use breath_core::{
    Config, Cue, EnginePort, EngineState, RepeatProgress, SelectionState, VibratePattern,
};
use std::path::PathBuf;

pub struct TerminalHost {
    selection_path: PathBuf,
    initial_index: usize,
    sound_enabled: bool,
    haptics_enabled: bool,
    last_state: EngineState,
    lines: Vec<String>,
}

impl TerminalHost {
    pub fn new(selection_path: PathBuf, config: &Config) -> breath_core::Result<Self> {
        let selection = SelectionState::load(&selection_path)?;
        Ok(Self {
            selection_path,
            initial_index: selection.exercise_index,
            sound_enabled: config.playback.sound_enabled,
            haptics_enabled: config.playback.haptics_enabled,
            last_state: EngineState::default(),
            lines: Vec::new(),
        })
    }

    /// Lines produced since the last call
    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    fn describe(state: &EngineState) -> String {
        if state.is_text {
            format!("\"{}\" ({})", state.label, state.sublabel)
        } else if state.is_breathing && !state.sublabel.is_empty() {
            format!("{} {}", state.label, state.sublabel)
        } else if state.is_hie {
            format!("{} ({})", state.label, state.sublabel)
        } else {
            state.label.clone()
        }
    }
}

impl EnginePort for TerminalHost {
    fn on_state_change(&mut self, state: &EngineState) {
        // Countdown ticks only change the sublabel of timed steps
        let tick_only = !state.is_breathing
            && state.label == self.last_state.label
            && state.is_text == self.last_state.is_text
            && state.is_hie == self.last_state.is_hie;
        if !state.label.is_empty() && !tick_only {
            self.lines.push(Self::describe(state));
        }
        self.last_state = state.clone();
    }

    fn on_play_sound(&mut self, cue: Cue) {
        self.lines.push(format!("  cue: {}", cue));
    }

    fn on_vibrate(&mut self, pattern: VibratePattern) {
        tracing::trace!("vibrate {:?} {:?}", pattern, pattern.timings());
    }

    fn on_animate_breath(&mut self, target: f64, duration_secs: f64) {
        tracing::trace!("ring -> {} over {}s", target, duration_secs);
    }

    fn on_haptic(&mut self) {
        tracing::trace!("haptic");
    }

    fn on_pause_change(&mut self, paused: bool) {
        tracing::debug!("paused: {}", paused);
    }

    fn on_repeat_change(&mut self, progress: Option<RepeatProgress>) {
        match progress {
            Some(p) => self.lines.push(format!("  repeat {}/{}", p.round, p.total)),
            None => self.lines.push("  repeat done".to_string()),
        }
    }

    fn initial_exercise_index(&self) -> usize {
        self.initial_index
    }

    fn save_exercise_index(&mut self, index: usize) {
        if let Err(e) = SelectionState::record(&self.selection_path, index) {
            tracing::warn!("Failed to save selection {}: {}", index, e);
        }
    }

    fn is_sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    fn is_haptics_enabled(&self) -> bool {
        self.haptics_enabled
    }
}
